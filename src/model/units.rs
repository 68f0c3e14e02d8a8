use alloy::primitives::U256;

/// Serde adapter rendering a `U256` as a decimal string.
///
/// Every chain-denominated quantity crosses the wire as a decimal string;
/// hex would be ambiguous for consumers that treat amounts as opaque numerics.
pub mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<U256>()
            .map_err(|e| D::Error::custom(format!("invalid decimal amount `{raw}`: {e}")))
    }
}

/// Convert a display amount (e.g. `1.5` ETH) into base units.
/// Truncates toward zero; the simulator's USD estimates never round up.
pub fn to_base_units(amount: f64, decimals: u8) -> U256 {
    if amount <= 0.0 || !amount.is_finite() {
        return U256::ZERO;
    }
    let scaled = amount * 10f64.powi(decimals as i32);
    U256::from(scaled as u128)
}

/// Convert base units back to a display amount.
pub fn from_base_units(raw: U256, decimals: u8) -> f64 {
    let digits = raw.to_string();
    let value: f64 = digits.parse().unwrap_or(0.0);
    value / 10f64.powi(decimals as i32)
}

/// Scale `raw` by a basis-point factor using integer arithmetic, truncating.
pub fn apply_bps(raw: U256, bps: u64) -> U256 {
    raw * U256::from(bps) / U256::from(10_000u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether_is_exact() {
        assert_eq!(
            to_base_units(1.0, 18),
            U256::from(10u128.pow(18)),
        );
    }

    #[test]
    fn truncates_toward_zero() {
        // 0.1 USDC with 6 decimals: 100_000 exactly, no rounding up
        assert_eq!(to_base_units(0.1, 6), U256::from(100_000u64));
        assert_eq!(to_base_units(0.0000019, 6), U256::from(1u64));
    }

    #[test]
    fn bps_scaling_is_integer_floor() {
        let one_eth = U256::from(10u128.pow(18));
        assert_eq!(
            apply_bps(one_eth, 8_400),
            U256::from(840_000_000_000_000_000u128),
        );
    }

    #[test]
    fn round_trips_display_amounts() {
        let raw = to_base_units(2.5, 18);
        assert!((from_base_units(raw, 18) - 2.5).abs() < 1e-9);
    }
}
