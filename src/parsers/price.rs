use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::models::ParsedPrice;
use crate::parsers::clean_text;
use crate::parsers::currency::{self, CurrencyEvidence, DecimalStyle};

/// Context hints handed to the parser alongside the raw price text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceHints<'a> {
    pub domain: Option<&'a str>,
    pub locale: Option<&'a str>,
    pub expected_currency: Option<&'a str>,
    /// Assumed when the text carries no marker and no expected currency is
    /// declared.
    pub fallback_currency: Option<&'a str>,
}

const DEFAULT_FALLBACK_CURRENCY: &str = "USD";

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[.,\u{202f}\u{a0} ]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d+)?")
        .expect("Invalid price regex")
});

// Discount badges read as numbers ("-20%"); drop them before scanning.
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-−–]?\s*\d+(?:[.,]\d+)?\s*%").expect("Invalid percent regex")
});

struct NumericParse {
    value: f64,
    ambiguous: bool,
}

/// Parse raw price text into an amount, a currency code and a confidence
/// score. Returns `None` when no numeric price can be isolated; never
/// errors on page content.
pub fn parse_price(raw: &str, hints: &PriceHints) -> Option<ParsedPrice> {
    let text = clean_text(raw);
    if text.is_empty() {
        return None;
    }

    let scannable = PERCENT_RE.replace_all(&text, " ");
    let token = NUMBER_RE.find(&scannable)?.as_str();

    let style = currency::decimal_style(hints.locale, hints.domain);
    let number = parse_number(token, style)?;

    let (code, evidence) = resolve_currency(&text, hints);
    if !currency::is_known_code(&code) {
        trace!("Unrecognized currency code {}, dropping parse", code);
        return None;
    }

    let base = match evidence {
        CurrencyEvidence::ExplicitCode => 0.95,
        CurrencyEvidence::UnambiguousSymbol => 0.92,
        CurrencyEvidence::SymbolResolvedByHint => 0.85,
        CurrencyEvidence::SymbolDefaulted => 0.75,
        CurrencyEvidence::HintOnly => 0.60,
        CurrencyEvidence::FallbackOnly => 0.50,
    };
    let confidence = if number.ambiguous { base * 0.85 } else { base };

    Some(ParsedPrice::new(number.value, code, confidence))
}

fn resolve_currency(text: &str, hints: &PriceHints) -> (String, CurrencyEvidence) {
    if let Some(marker) = currency::find_marker(text) {
        return marker.resolve(hints.expected_currency);
    }
    if let Some(expected) = hints.expected_currency {
        if currency::is_known_code(expected) {
            return (expected.to_ascii_uppercase(), CurrencyEvidence::HintOnly);
        }
    }
    let fallback = hints
        .fallback_currency
        .filter(|c| currency::is_known_code(c))
        .unwrap_or(DEFAULT_FALLBACK_CURRENCY);
    (fallback.to_ascii_uppercase(), CurrencyEvidence::FallbackOnly)
}

/// Turn a separator-bearing token into a number, deciding which separator is
/// the decimal one. `ambiguous` is set when the hints did not settle a
/// `1.234`-style token.
fn parse_number(token: &str, style: DecimalStyle) -> Option<NumericParse> {
    let token = token.replace(['\u{a0}', '\u{202f}', ' '], "");
    let dots = token.matches('.').count();
    let commas = token.matches(',').count();

    let (normalized, ambiguous) = match (dots, commas) {
        (0, 0) => (token, false),
        // Both present: the later separator is the decimal one.
        (_, _) if dots >= 1 && commas >= 1 => {
            let (decimal, thousands) = if token.rfind('.') > token.rfind(',') {
                ('.', ',')
            } else {
                (',', '.')
            };
            let stripped = token.replace(thousands, "");
            (stripped.replace(decimal, "."), false)
        }
        // Repeated separator can only group thousands.
        (d, 0) if d > 1 => (token.replace('.', ""), false),
        (0, c) if c > 1 => (token.replace(',', ""), false),
        // Single separator: the digit count after it decides, with a
        // locale tie-break for the 3-digit case.
        _ => {
            let sep = if dots == 1 { '.' } else { ',' };
            let idx = token.rfind(sep)?;
            let fraction_len = token.len() - idx - 1;
            if fraction_len == 3 {
                let agrees_with_style = matches!(
                    (style, sep),
                    (DecimalStyle::Dot, ',') | (DecimalStyle::Comma, '.')
                );
                (token.replace(sep, ""), !agrees_with_style)
            } else {
                (token.replace(sep, "."), false)
            }
        }
    };

    let value = normalized.parse::<f64>().ok()?;
    Some(NumericParse { value, ambiguous })
}

/// Quick screen used by the generic markup scan: a short run of text that
/// carries both a currency marker and a digit.
pub fn looks_like_price(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text.len() <= 48
        && text.chars().any(|c| c.is_ascii_digit())
        && currency::find_marker(text).is_some()
}
