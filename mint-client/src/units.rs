//! Display helpers for wei amounts and supply figures.

use alloy_primitives::U256;

const WEI_DECIMALS: usize = 18;

fn wei_per_ether() -> U256 {
    U256::from(10u64).pow(U256::from(WEI_DECIMALS))
}

/// `1500000000000000000` -> `"1.5"`, `1000000000000000000` -> `"1.0"`.
pub fn format_ether(wei: U256) -> String {
    let unit = wei_per_ether();
    let whole = wei / unit;
    let fraction = wei % unit;

    let digits = format!("{:0>width$}", fraction.to_string(), width = WEI_DECIMALS);
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// `unit_price × quantity` in ether, rounded half-up to four decimals.
pub fn total_cost(unit_price: U256, quantity: u32) -> String {
    let total = unit_price.saturating_mul(U256::from(quantity));
    let step = U256::from(10u64).pow(U256::from(WEI_DECIMALS - 4));
    let rounded = total.saturating_add(step / U256::from(2u64)) / step;

    let scale = U256::from(10_000u64);
    format!("{}.{:0>4}", rounded / scale, (rounded % scale).to_string())
}

/// Share of the collection already minted, in percent. Zero when the cap is unknown.
pub fn progress_percent(total_supply: U256, max_supply: U256) -> f64 {
    if max_supply.is_zero() {
        return 0.0;
    }
    let total = u64::try_from(total_supply).unwrap_or(u64::MAX) as f64;
    let max = u64::try_from(max_supply).unwrap_or(u64::MAX) as f64;
    total / max * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(milli: u64) -> U256 {
        U256::from(milli) * U256::from(1_000_000_000_000_000u64)
    }

    #[test]
    fn formats_whole_and_fractional_ether() {
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(format_ether(ether(1000)), "1.0");
        assert_eq!(format_ether(ether(1500)), "1.5");
        assert_eq!(format_ether(ether(50)), "0.05");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn total_cost_has_four_decimals() {
        assert_eq!(total_cost(ether(50), 3), "0.1500");
        assert_eq!(total_cost(ether(1000), 10), "10.0000");
        assert_eq!(total_cost(U256::ZERO, 5), "0.0000");
        assert_eq!(total_cost(U256::from(123_450_000_000_000u64), 1), "0.0001");
        assert_eq!(total_cost(U256::from(150_000_000_000_000u64), 1), "0.0002");
    }

    #[test]
    fn progress_handles_unknown_cap() {
        assert_eq!(progress_percent(U256::from(5u64), U256::ZERO), 0.0);
        assert_eq!(progress_percent(U256::from(25u64), U256::from(100u64)), 25.0);
        assert_eq!(progress_percent(U256::from(100u64), U256::from(100u64)), 100.0);
    }
}
