use tokio::task::JoinError;

/// Message carried by a panicked task, or `None` if the task was cancelled.
pub(crate) fn join_error_panic_message(err: JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	let message = match payload.downcast::<String>() {
		Ok(owned) => *owned,
		Err(payload) => payload
			.downcast_ref::<&'static str>()
			.map_or_else(|| "non-string panic payload".to_string(), |msg| (*msg).to_string()),
	};
	Some(message)
}
