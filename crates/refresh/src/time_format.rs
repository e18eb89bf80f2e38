//! Compact duration notation used for voting windows and countdowns,
//! e.g. `1w2d3h4m5s`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TimeParseError;

const MS_PER_SECOND: u64 = 1000;

fn prepend_if_nonzero(current: String, value: u64, suffix: &str) -> String {
	if value == 0 { current } else { format!("{value}{suffix}{current}") }
}

fn signed(result: String, negative: bool) -> String {
	if negative { format!("-{result}") } else { result }
}

/// Renders a millisecond amount as compact week/day/hour/minute/second text.
///
/// Zero components are omitted. Amounts under a second render as `0s`
/// unless `show_ms` is set, in which case milliseconds are included and a
/// zero amount renders as `0ms`.
pub fn humanize_ms(amount_ms: i64, show_ms: bool) -> String {
	let negative = amount_ms < 0;
	let mut amount = amount_ms.unsigned_abs();
	let mut result = String::new();

	if show_ms {
		if amount == 0 {
			return "0ms".to_string();
		}
		result = prepend_if_nonzero(result, amount % MS_PER_SECOND, "ms");
	} else if amount < MS_PER_SECOND {
		return "0s".to_string();
	}

	amount /= MS_PER_SECOND;
	for (radix, suffix) in [(60, "s"), (60, "m"), (24, "h"), (7, "d")] {
		if amount == 0 {
			return signed(result, negative);
		}
		result = prepend_if_nonzero(result, amount % radix, suffix);
		amount /= radix;
	}
	if amount == 0 {
		return signed(result, negative);
	}
	signed(prepend_if_nonzero(result, amount, "w"), negative)
}

static TIME_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*([-+])?\s*(?:(\d+)w)?\s*(?:(\d+)d)?\s*(?:(\d+)h)?\s*(?:(\d+)m)?\s*(?:(\d+)s)?\s*(?:(\d+)ms)?\s*$")
		.expect("time amount pattern is valid")
});

/// Parses the notation produced by [`humanize_ms`] back into milliseconds.
///
/// Accepts an optional sign and any subset of `w d h m s ms` components in
/// that order, with optional whitespace between them. An empty component
/// list parses as zero.
pub fn parse_time_amount(input: &str) -> Result<i64, TimeParseError> {
	let caps = TIME_AMOUNT
		.captures(input)
		.ok_or_else(|| TimeParseError::Malformed(input.to_string()))?;
	let overflow = || TimeParseError::Overflow(input.to_string());

	let component = |idx: usize| -> Result<i64, TimeParseError> {
		match caps.get(idx) {
			Some(m) => m.as_str().parse::<i64>().map_err(|_| overflow()),
			None => Ok(0),
		}
	};

	let mut total: i64 = 0;
	for (idx, scale) in [(2, 7), (3, 24), (4, 60), (5, 60), (6, 1000)] {
		total = total.checked_add(component(idx)?).ok_or_else(overflow)?;
		total = total.checked_mul(scale).ok_or_else(overflow)?;
	}
	total = total.checked_add(component(7)?).ok_or_else(overflow)?;

	if caps.get(1).is_some_and(|m| m.as_str() == "-") {
		total = -total;
	}
	Ok(total)
}
