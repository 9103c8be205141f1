//! Pure monetary calculations.
//!
//! All arithmetic is `rust_decimal`; totals are rounded half-up to two
//! decimal places. These functions are re-run on every persist of an invoice
//! or line item, so a stored total is never trusted once inputs change.

use rust_decimal::{Decimal, RoundingStrategy};

const MONEY_SCALE: u32 = 2;

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity * unit_price`, rounded to 2 decimal places.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_money(quantity * unit_price)
}

/// Sum of line totals for an invoice.
pub fn subtotal_of(line_totals: impl IntoIterator<Item = Decimal>) -> Decimal {
    line_totals.into_iter().sum()
}

/// Derive `(tax_amount, total_amount)` from the invoice inputs.
///
/// `tax_amount = round(subtotal * tax_rate / 100, 2)` and
/// `total_amount = subtotal - discount + tax_amount`. A discount larger than
/// `subtotal + tax` yields a negative total; that is intentional and not
/// clamped.
pub fn invoice_totals(
    subtotal: Decimal,
    tax_rate_percent: Decimal,
    discount_amount: Decimal,
) -> (Decimal, Decimal) {
    let tax_amount = round_money(subtotal * tax_rate_percent / Decimal::ONE_HUNDRED);
    let total_amount = round_money(subtotal - discount_amount + tax_amount);
    (tax_amount, total_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_multiplies_and_rounds() {
        assert_eq!(line_total(dec!(2), dec!(9.99)), dec!(19.98));
        assert_eq!(line_total(dec!(3), dec!(0.333)), dec!(1.00));
        assert_eq!(line_total(dec!(0), dec!(50)), dec!(0));
    }

    #[test]
    fn line_total_rounds_half_up() {
        // 1.5 * 0.07 = 0.105 -> 0.11 under half-up
        assert_eq!(line_total(dec!(1.5), dec!(0.07)), dec!(0.11));
    }

    #[test]
    fn totals_for_plain_invoice() {
        let (tax, total) = invoice_totals(dec!(100.00), dec!(10), dec!(5.00));
        assert_eq!(tax, dec!(10.00));
        assert_eq!(total, dec!(105.00));
    }

    #[test]
    fn totals_with_zero_tax_and_discount() {
        let (tax, total) = invoice_totals(dec!(250.00), dec!(0), dec!(0));
        assert_eq!(tax, dec!(0.00));
        assert_eq!(total, dec!(250.00));
    }

    #[test]
    fn tax_rounds_to_two_places() {
        // 33.33 * 7.25% = 2.416425 -> 2.42
        let (tax, total) = invoice_totals(dec!(33.33), dec!(7.25), dec!(0));
        assert_eq!(tax, dec!(2.42));
        assert_eq!(total, dec!(35.75));
    }

    #[test]
    fn discount_exceeding_subtotal_goes_negative() {
        // Documented current behavior: the total is not clamped at zero.
        let (tax, total) = invoice_totals(dec!(10.00), dec!(0), dec!(25.00));
        assert_eq!(tax, dec!(0.00));
        assert_eq!(total, dec!(-15.00));
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let lines = vec![dec!(19.98), dec!(1.00), dec!(0.11)];
        assert_eq!(subtotal_of(lines), dec!(21.09));
    }
}
