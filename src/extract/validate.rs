//! Post-parse result validation: the numeric sanity check and the expected
//! currency cross-check.

use tracing::{debug, warn};

use crate::models::ParsedPrice;
use crate::parsers::currency;

/// Reject numerically implausible results. Values at or above the ceiling
/// are treated as digit-concatenation artifacts. Also normalizes the
/// `regular_price`/`is_on_sale` pair: a "was" price that does not exceed
/// the active amount (or is itself implausible) is detached.
///
/// A failed check means "try the next strategy", never a hard error.
pub fn sanity_check(price: &mut ParsedPrice, ceiling: f64) -> bool {
    if !price.amount.is_finite() || price.amount < 0.0 {
        debug!("Rejecting non-finite or negative amount {}", price.amount);
        return false;
    }
    if price.amount >= ceiling {
        debug!(
            "Rejecting implausible amount {} (ceiling {})",
            price.amount, ceiling
        );
        return false;
    }

    match price.regular_price {
        Some(regular) if regular <= price.amount || regular >= ceiling => {
            price.regular_price = None;
            price.is_on_sale = false;
        }
        Some(_) => price.is_on_sale = true,
        None => price.is_on_sale = false,
    }

    true
}

/// Compare the parsed currency against the site's expected one. On mismatch
/// the confidence is multiplied by `factor`; the amount and currency are
/// left untouched since currency inference from symbols is itself a
/// heuristic. A no-op when either side is missing or unrecognized.
pub fn validate_currency(price: &mut ParsedPrice, expected: Option<&str>, factor: f64) {
    let Some(expected) = expected else {
        return;
    };
    if !currency::is_known_code(expected) || !currency::is_known_code(&price.currency) {
        return;
    }

    if !price.currency.eq_ignore_ascii_case(expected) {
        warn!(
            "Parsed currency {} does not match expected {}, degrading confidence",
            price.currency, expected
        );
        price.scale_confidence(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CEILING: f64 = 100_000.0;

    #[test]
    fn concatenated_digits_rejected_separated_accepted() {
        let mut huge = ParsedPrice::new(799_999.0, "USD", 0.9);
        assert!(!sanity_check(&mut huge, CEILING));

        let mut fine = ParsedPrice::new(799.99, "USD", 0.9);
        assert!(sanity_check(&mut fine, CEILING));
    }

    #[test]
    fn negative_and_non_finite_rejected() {
        let mut price = ParsedPrice::new(9.99, "USD", 0.9);
        price.amount = -1.0;
        assert!(!sanity_check(&mut price, CEILING));
        price.amount = f64::NAN;
        assert!(!sanity_check(&mut price, CEILING));
    }

    #[test]
    fn bogus_regular_price_is_detached() {
        let mut price = ParsedPrice::new(27.99, "EUR", 0.9);
        price.regular_price = Some(19.99);
        price.is_on_sale = true;
        assert!(sanity_check(&mut price, CEILING));
        assert_eq!(price.regular_price, None);
        assert!(!price.is_on_sale);

        let mut price = ParsedPrice::new(27.99, "EUR", 0.9);
        price.regular_price = Some(250_000.0);
        assert!(sanity_check(&mut price, CEILING));
        assert_eq!(price.regular_price, None);
    }

    #[test]
    fn mismatch_multiplies_confidence_exactly() {
        let mut price = ParsedPrice::new(49.0, "GBP", 0.95);
        validate_currency(&mut price, Some("USD"), 0.8);
        assert_eq!(price.confidence, 0.95 * 0.8);
        assert_eq!(price.amount, 49.0);
        assert_eq!(price.currency, "GBP");
    }

    #[test]
    fn match_and_missing_expected_are_noops() {
        let mut price = ParsedPrice::new(49.0, "GBP", 0.95);
        validate_currency(&mut price, Some("gbp"), 0.8);
        assert_eq!(price.confidence, 0.95);

        validate_currency(&mut price, None, 0.8);
        assert_eq!(price.confidence, 0.95);

        validate_currency(&mut price, Some("??"), 0.8);
        assert_eq!(price.confidence, 0.95);
    }
}
