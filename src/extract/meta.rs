//! Machine-readable meta tag strategy.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

use crate::context::AdapterContext;
use crate::models::ParsedPrice;
use crate::parsers::clean_text;
use crate::parsers::price::{parse_price, PriceHints};

// Amount/currency selector pairs, most specific vocabulary first.
static META_PAIRS: Lazy<Vec<(Selector, Selector)>> = Lazy::new(|| {
    [
        (
            r#"meta[itemprop="price"]"#,
            r#"meta[itemprop="priceCurrency"]"#,
        ),
        (
            r#"meta[property="product:price:amount"]"#,
            r#"meta[property="product:price:currency"]"#,
        ),
        (
            r#"meta[property="og:price:amount"]"#,
            r#"meta[property="og:price:currency"]"#,
        ),
    ]
    .iter()
    .map(|(amount, currency)| {
        (
            Selector::parse(amount).expect("Invalid meta amount selector"),
            Selector::parse(currency).expect("Invalid meta currency selector"),
        )
    })
    .collect()
});

fn content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|content| !content.is_empty())
}

/// Read a price out of the page's meta tags. Amount and currency of one
/// vocabulary are combined into a single parse so they always travel
/// together.
pub fn price_from_meta(ctx: &AdapterContext, hints: &PriceHints) -> Option<ParsedPrice> {
    for (amount_selector, currency_selector) in META_PAIRS.iter() {
        let Some(amount) = content(ctx.document(), amount_selector) else {
            continue;
        };
        let text = match content(ctx.document(), currency_selector) {
            Some(code) => format!("{} {}", amount, code),
            None => amount,
        };
        if let Some(price) = parse_price(&text, hints) {
            debug!("Meta tags yielded {}", price);
            return Some(price);
        }
    }
    None
}

/// First non-empty `content` attribute for an ad-hoc selector; used by the
/// adapters for `og:title`/`og:image` fallbacks.
pub fn first_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    content(document, &selector)
}
