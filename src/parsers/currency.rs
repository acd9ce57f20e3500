use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Currency codes the engine recognizes. A parse only ever reports one of
/// these; anything else is treated as "no currency evidence".
pub const KNOWN_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "CHF", "CAD", "AUD", "NZD", "SEK", "NOK", "DKK", "ISK",
    "PLN", "CZK", "HUF", "RON", "BGN", "RUB", "UAH", "TRY", "BRL", "MXN", "ARS", "CLP", "COP",
    "INR", "KRW", "SGD", "HKD", "TWD", "THB", "VND", "IDR", "MYR", "PHP", "ILS", "ZAR", "AED",
    "SAR",
];

pub fn is_known_code(code: &str) -> bool {
    KNOWN_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
}

/// How the currency of a parse was established. Ordering mirrors trust:
/// an explicit code beats a symbol, a symbol beats a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyEvidence {
    ExplicitCode,
    UnambiguousSymbol,
    SymbolResolvedByHint,
    SymbolDefaulted,
    HintOnly,
    FallbackOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurrencyMarker {
    /// ISO code spelled out in the text.
    Code(String),
    /// Symbol used by exactly one currency we track.
    Symbol(&'static str),
    /// Symbol shared by a family of currencies.
    Ambiguous {
        family: &'static [&'static str],
        default: &'static str,
    },
}

const DOLLAR_FAMILY: &[&str] = &["USD", "CAD", "AUD", "NZD", "MXN", "SGD", "HKD", "ARS", "CLP"];
const YEN_FAMILY: &[&str] = &["JPY", "CNY"];
const KRONE_FAMILY: &[&str] = &["SEK", "NOK", "DKK", "ISK"];

// Multi-character markers are checked before bare symbols so "US$" never
// reads as an ambiguous "$".
const PREFIXED_SYMBOLS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("C$", "CAD"),
    ("AU$", "AUD"),
    ("A$", "AUD"),
    ("NZ$", "NZD"),
    ("HK$", "HKD"),
    ("S$", "SGD"),
    ("MX$", "MXN"),
    ("R$", "BRL"),
    ("zł", "PLN"),
    ("Kč", "CZK"),
    ("Fr.", "CHF"),
];

const SINGLE_SYMBOLS: &[(char, &str)] = &[
    ('€', "EUR"),
    ('£', "GBP"),
    ('₹', "INR"),
    ('₩', "KRW"),
    ('₺', "TRY"),
    ('₪', "ILS"),
    ('฿', "THB"),
    ('₫', "VND"),
    ('₽', "RUB"),
    ('₴', "UAH"),
];

static ISO_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{3})\b").expect("Invalid ISO code regex"));

static KRONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bkr\b").expect("Invalid krone regex"));

/// Locate the strongest currency marker in a price string.
pub fn find_marker(text: &str) -> Option<CurrencyMarker> {
    for cap in ISO_CODE_RE.captures_iter(text) {
        let code = &cap[1];
        if is_known_code(code) {
            return Some(CurrencyMarker::Code(code.to_ascii_uppercase()));
        }
    }

    for (marker, code) in PREFIXED_SYMBOLS {
        if text.contains(marker) {
            return Some(CurrencyMarker::Symbol(code));
        }
    }

    for (symbol, code) in SINGLE_SYMBOLS {
        if text.contains(*symbol) {
            return Some(CurrencyMarker::Symbol(code));
        }
    }

    if text.contains('$') {
        return Some(CurrencyMarker::Ambiguous {
            family: DOLLAR_FAMILY,
            default: "USD",
        });
    }
    if text.contains('¥') || text.contains('円') {
        return Some(CurrencyMarker::Ambiguous {
            family: YEN_FAMILY,
            default: "JPY",
        });
    }
    if KRONE_RE.is_match(text) {
        return Some(CurrencyMarker::Ambiguous {
            family: KRONE_FAMILY,
            default: "SEK",
        });
    }

    None
}

impl CurrencyMarker {
    /// Resolve the marker to a concrete code, consulting the expected
    /// currency only to pick within an ambiguous family - never to override
    /// an explicit code or an unambiguous symbol.
    pub fn resolve(&self, expected: Option<&str>) -> (String, CurrencyEvidence) {
        match self {
            CurrencyMarker::Code(code) => (code.clone(), CurrencyEvidence::ExplicitCode),
            CurrencyMarker::Symbol(code) => {
                (code.to_string(), CurrencyEvidence::UnambiguousSymbol)
            }
            CurrencyMarker::Ambiguous { family, default } => {
                if let Some(expected) = expected {
                    if family.iter().any(|c| c.eq_ignore_ascii_case(expected)) {
                        return (
                            expected.to_ascii_uppercase(),
                            CurrencyEvidence::SymbolResolvedByHint,
                        );
                    }
                }
                (default.to_string(), CurrencyEvidence::SymbolDefaulted)
            }
        }
    }
}

/// Decimal separator convention suggested by locale or domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalStyle {
    Dot,
    Comma,
    Unknown,
}

const COMMA_DECIMAL_LANGS: &[&str] = &[
    "de", "fr", "es", "it", "pt", "nl", "pl", "sv", "da", "fi", "nb", "no", "ru", "cs", "sk",
    "hu", "tr", "el", "ro", "bg", "hr", "sl", "lt", "lv", "et", "uk", "id", "vi",
];

const DOT_DECIMAL_LANGS: &[&str] = &["en", "ja", "zh", "ko", "th", "he", "hi", "ms"];

// Regions that use the dot regardless of language (de-CH, es-MX).
const DOT_DECIMAL_REGIONS: &[&str] = &[
    "us", "gb", "ie", "au", "nz", "ca", "mx", "ch", "jp", "cn", "kr", "th", "hk", "sg", "in",
    "my", "ph", "za",
];

static COUNTRY_CURRENCY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("de", "EUR"),
        ("at", "EUR"),
        ("fr", "EUR"),
        ("it", "EUR"),
        ("es", "EUR"),
        ("nl", "EUR"),
        ("be", "EUR"),
        ("fi", "EUR"),
        ("ie", "EUR"),
        ("pt", "EUR"),
        ("gr", "EUR"),
        ("si", "EUR"),
        ("sk", "EUR"),
        ("lv", "EUR"),
        ("lt", "EUR"),
        ("ee", "EUR"),
        ("gb", "GBP"),
        ("uk", "GBP"),
        ("us", "USD"),
        ("ca", "CAD"),
        ("au", "AUD"),
        ("nz", "NZD"),
        ("jp", "JPY"),
        ("cn", "CNY"),
        ("kr", "KRW"),
        ("ch", "CHF"),
        ("se", "SEK"),
        ("no", "NOK"),
        ("dk", "DKK"),
        ("is", "ISK"),
        ("pl", "PLN"),
        ("cz", "CZK"),
        ("hu", "HUF"),
        ("ro", "RON"),
        ("bg", "BGN"),
        ("ru", "RUB"),
        ("ua", "UAH"),
        ("tr", "TRY"),
        ("br", "BRL"),
        ("mx", "MXN"),
        ("ar", "ARS"),
        ("cl", "CLP"),
        ("co", "COP"),
        ("in", "INR"),
        ("sg", "SGD"),
        ("hk", "HKD"),
        ("tw", "TWD"),
        ("th", "THB"),
        ("vn", "VND"),
        ("id", "IDR"),
        ("my", "MYR"),
        ("ph", "PHP"),
        ("il", "ILS"),
        ("za", "ZAR"),
        ("ae", "AED"),
        ("sa", "SAR"),
    ])
});

fn locale_parts(locale: &str) -> (Option<String>, Option<String>) {
    let mut parts = locale.split(['-', '_']);
    let lang = parts
        .next()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_ascii_lowercase());
    let region = parts
        .find(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|p| p.to_ascii_lowercase());
    (lang, region)
}

fn domain_tld(domain: &str) -> Option<String> {
    domain
        .rsplit('.')
        .next()
        .filter(|tld| tld.len() == 2)
        .map(|tld| tld.to_ascii_lowercase())
}

/// Infer the decimal separator convention from the page locale, falling back
/// to the shop's country-code TLD.
pub fn decimal_style(locale: Option<&str>, domain: Option<&str>) -> DecimalStyle {
    if let Some(locale) = locale {
        let (lang, region) = locale_parts(locale);
        if let Some(region) = &region {
            if DOT_DECIMAL_REGIONS.contains(&region.as_str()) {
                return DecimalStyle::Dot;
            }
        }
        if let Some(lang) = &lang {
            if COMMA_DECIMAL_LANGS.contains(&lang.as_str()) {
                return DecimalStyle::Comma;
            }
            if DOT_DECIMAL_LANGS.contains(&lang.as_str()) {
                return DecimalStyle::Dot;
            }
        }
    }

    if let Some(tld) = domain.and_then(domain_tld) {
        if DOT_DECIMAL_REGIONS.contains(&tld.as_str()) || tld == "uk" {
            return DecimalStyle::Dot;
        }
        if COUNTRY_CURRENCY.contains_key(tld.as_str()) {
            // Country shops outside the dot list overwhelmingly print
            // comma decimals.
            return DecimalStyle::Comma;
        }
    }

    DecimalStyle::Unknown
}

/// Currency a site is expected to quote, from its TLD or the page locale.
/// Used only to sanity-check a parse, never to override it.
pub fn resolve_expected_currency(domain: Option<&str>, locale: Option<&str>) -> Option<String> {
    if let Some(tld) = domain.and_then(domain_tld) {
        if let Some(code) = COUNTRY_CURRENCY.get(tld.as_str()) {
            return Some((*code).to_string());
        }
    }
    if let Some(locale) = locale {
        let (_, region) = locale_parts(locale);
        if let Some(region) = region {
            if let Some(code) = COUNTRY_CURRENCY.get(region.as_str()) {
                return Some((*code).to_string());
            }
        }
    }
    None
}
