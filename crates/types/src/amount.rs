//! Amount conversions
//!
//! Quotes from different venues report output amounts in different units and
//! decimals. For cross-provider comparison every expected output is normalized
//! to a fixed 8-fractional-digit integer scale. This is a comparison
//! heuristic, not a dimensionally sound conversion when target decimals differ
//! wildly between assets; it is preserved as-is for compatibility with the
//! quote records external collaborators persist.

use alloy::primitives::U256;

/// Fractional digits of the common comparison scale.
pub const RAW_SCALE_DECIMALS: usize = 8;

/// USDC smallest-unit decimals on every supported source chain.
pub const USDC_DECIMALS: u32 = 6;

/// Parses a human-readable decimal amount (`"0.00123456"`, `"5"`) into the
/// common 8-decimal raw scale. Fractional digits beyond the eighth are
/// truncated, never rounded. Returns `None` for non-numeric input.
pub fn to_raw_scale(s: &str) -> Option<U256> {
	let s = s.trim();
	if s.is_empty() {
		return None;
	}

	let (whole, frac) = match s.split_once('.') {
		Some((whole, frac)) => (whole, frac),
		None => (s, ""),
	};

	let mut frac: String = frac.chars().take(RAW_SCALE_DECIMALS).collect();
	while frac.len() < RAW_SCALE_DECIMALS {
		frac.push('0');
	}

	let combined = format!("{whole}{frac}");
	if combined.is_empty() || !combined.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}

	U256::from_str_radix(&combined, 10).ok()
}

/// Converts a USD amount into USDC smallest units (6 decimals), truncating.
pub fn usd_to_usdc_units(usd: f64) -> U256 {
	U256::from((usd * 1e6) as u64)
}

/// Converts a USD amount into 8-decimal router units, truncating.
pub fn usd_to_router_units(usd: f64) -> u64 {
	(usd * 1e8) as u64
}

/// Formats USDC smallest units as a human-readable `whole.frac` string.
pub fn format_usdc(units: U256) -> String {
	let scale = U256::from(1_000_000u64);
	let whole = units / scale;
	let frac: u64 = (units % scale).to::<u64>();
	format!("{whole}.{frac:06}")
}

/// Formats a token amount in smallest units as a decimal string with the
/// given number of decimals, trimming trailing zeros.
pub fn format_units(amount: U256, decimals: u32) -> String {
	if decimals == 0 {
		return amount.to_string();
	}
	let scale = U256::from(10u64).pow(U256::from(decimals));
	let whole = amount / scale;
	let frac = (amount % scale).to_string();
	let frac = format!("{frac:0>width$}", width = decimals as usize);
	let frac = frac.trim_end_matches('0');
	if frac.is_empty() {
		whole.to_string()
	} else {
		format!("{whole}.{frac}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_scale_pads_and_truncates() {
		assert_eq!(to_raw_scale("0.00123456"), Some(U256::from(123_456u64)));
		assert_eq!(to_raw_scale("5"), Some(U256::from(500_000_000u64)));
		// digits beyond the eighth are dropped, not rounded
		assert_eq!(
			to_raw_scale("1.999999999"),
			Some(U256::from(199_999_999u64))
		);
		assert_eq!(to_raw_scale("garbage"), None);
		assert_eq!(to_raw_scale(""), None);
	}

	#[test]
	fn usd_conversions_truncate() {
		assert_eq!(usd_to_usdc_units(5.0), U256::from(5_000_000u64));
		assert_eq!(usd_to_usdc_units(0.1234567), U256::from(123_456u64));
		assert_eq!(usd_to_router_units(5.0), 500_000_000);
	}

	#[test]
	fn formats_usdc_with_six_digit_fraction() {
		assert_eq!(format_usdc(U256::from(12_000_000u64)), "12.000000");
		assert_eq!(format_usdc(U256::from(1_500u64)), "0.001500");
	}

	#[test]
	fn formats_units_trimming_zeros() {
		assert_eq!(
			format_units(U256::from(1_500_000_000_000_000_000u64), 18),
			"1.5"
		);
		assert_eq!(format_units(U256::from(42u64), 0), "42");
		assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
	}
}
