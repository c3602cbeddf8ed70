//! Copy order sizing.

use model::SizingMode;
use rust_decimal::Decimal;
use storage::CopyTradingSettings;

/// Venue minimum order size in shares; smaller copies are clamped up.
pub const MIN_SHARES: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Balance assumed for percentage sizing when the balance endpoint is
/// unavailable.
pub const FALLBACK_BALANCE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Size of the copy in shares.
///
/// The dollar amount follows the sizing mode; the share count is derived
/// from the (already tick-clamped) price and floored at the venue minimum
/// of five shares.
pub fn copy_size(
    settings: &CopyTradingSettings,
    original_shares: Decimal,
    price: Decimal,
    balance: Option<Decimal>,
) -> Decimal {
    let dollars = match settings.sizing_mode {
        SizingMode::Fixed => settings.fixed_amount,
        SizingMode::Proportional => original_shares * price * settings.proportional_factor,
        SizingMode::Percentage => {
            balance.unwrap_or(FALLBACK_BALANCE) * settings.percentage / Decimal::ONE_HUNDRED
        }
    };
    (dollars / price).max(MIN_SHARES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settings(mode: SizingMode) -> CopyTradingSettings {
        CopyTradingSettings {
            sizing_mode: mode,
            fixed_amount: dec!(10),
            proportional_factor: dec!(0.5),
            percentage: dec!(2),
            enabled: true,
        }
    }

    #[test]
    fn fixed_mode_divides_amount_by_price() {
        let shares = copy_size(&settings(SizingMode::Fixed), dec!(100), dec!(0.9), None);
        // 10 / 0.9 = 11.111…, above the venue minimum.
        assert!(shares > dec!(11.11) && shares < dec!(11.12));
    }

    #[test]
    fn proportional_mode_scales_source_notional() {
        // 100 shares * 0.40 * 0.5 = $20 -> 50 shares
        let shares = copy_size(&settings(SizingMode::Proportional), dec!(100), dec!(0.40), None);
        assert_eq!(shares, dec!(50));
    }

    #[test]
    fn percentage_mode_uses_balance() {
        // 2% of $1000 = $20 -> 40 shares at 0.50
        let shares = copy_size(
            &settings(SizingMode::Percentage),
            dec!(1),
            dec!(0.50),
            Some(dec!(1000)),
        );
        assert_eq!(shares, dec!(40));
    }

    #[test]
    fn percentage_mode_falls_back_without_balance() {
        // 2% of the $100 fallback = $2 -> 4 shares at 0.50, clamped to 5.
        let shares = copy_size(&settings(SizingMode::Percentage), dec!(1), dec!(0.50), None);
        assert_eq!(shares, MIN_SHARES);
    }

    #[test]
    fn minimum_shares_clamp() {
        // $10 at 0.999 would be ~10 shares; $1 fixed at 0.5 would be 2.
        let mut s = settings(SizingMode::Fixed);
        s.fixed_amount = dec!(1);
        assert_eq!(copy_size(&s, dec!(1), dec!(0.5), None), MIN_SHARES);
    }
}
