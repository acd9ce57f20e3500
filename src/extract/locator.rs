//! Noise-filtered price text location.
//!
//! Reads text out of candidate elements while excluding struck-through old
//! prices and discount badges, using both structural markers (`del`/`s`
//! wrappers, well-known class names) and rendered-style inspection (inline
//! `text-decoration: line-through`). Crossed-out text is kept aside as the
//! "was" price so the pipeline can flag discounts.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::context::AdapterContext;
use crate::models::ParsedPrice;
use crate::parsers::price::{looks_like_price, parse_price, PriceHints};
use crate::parsers::clean_text;

// Class/id patterns that mark a superseded price.
static STRIKE_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)(old[-_]?price|price[-_]?old|was[-_]?price|price[-_]?was|prev[-_]?price|
          compare[-_]?at|original[-_]?price|list[-_]?price|uvp|msrp|strike|struck|crossed|
          line[-_]?through)",
    )
    .expect("Invalid strike class regex")
});

// Class/id patterns for discount badges and percentage labels; their text is
// never a price.
static BADGE_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ix)(discount|badge|percent|saving|reduction|price[-_]?off|you[-_]?save|sale[-_]?(flag|label|tag))")
        .expect("Invalid badge class regex")
});

// Container regions that hold other products' prices.
static EXCLUDED_CONTAINER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)(cart|basket|minicart|checkout|breadcrumb|footer|navbar|nav[-_]?menu|
          related|recommend|upsell|cross[-_]?sell|carousel|slider|recently[-_]?viewed|
          also[-_]?bought|similar[-_]?products|wishlist)",
    )
    .expect("Invalid container regex")
});

static GENERIC_PRICE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="price"], [id*="price"], [itemprop="price"], [data-price]"#)
        .expect("Invalid generic price selector")
});

enum NoiseKind {
    Strike,
    Badge,
    Hidden,
}

#[derive(Default)]
struct CandidateText {
    active: String,
    crossed: String,
}

fn classify_element(el: &ElementRef) -> Option<NoiseKind> {
    match el.value().name() {
        "del" | "s" | "strike" => return Some(NoiseKind::Strike),
        _ => {}
    }

    if let Some(style) = el.value().attr("style") {
        let style = style.replace(' ', "").to_ascii_lowercase();
        if style.contains("line-through") {
            return Some(NoiseKind::Strike);
        }
        if style.contains("display:none") || style.contains("visibility:hidden") {
            return Some(NoiseKind::Hidden);
        }
    }

    let mut names = String::new();
    if let Some(class) = el.value().attr("class") {
        names.push_str(class);
    }
    if let Some(id) = el.value().attr("id") {
        names.push(' ');
        names.push_str(id);
    }
    if !names.is_empty() {
        if STRIKE_CLASS_RE.is_match(&names) {
            return Some(NoiseKind::Strike);
        }
        if BADGE_CLASS_RE.is_match(&names) {
            return Some(NoiseKind::Badge);
        }
    }

    None
}

/// Collect the element's text with noise routed out: struck-through content
/// goes to the `crossed` bucket, badge/hidden content is dropped.
fn filtered_text(root: ElementRef) -> CandidateText {
    let mut out = CandidateText::default();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        // Walk the chain from the text node up to the candidate root; the
        // nearest noise marker decides where the text goes.
        let mut bucket = Some(&mut out.active);
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(el) = ElementRef::wrap(n) {
                match classify_element(&el) {
                    Some(NoiseKind::Strike) => {
                        bucket = Some(&mut out.crossed);
                        break;
                    }
                    Some(NoiseKind::Badge) | Some(NoiseKind::Hidden) => {
                        bucket = None;
                        break;
                    }
                    None => {}
                }
            }
            if n.id() == root.id() {
                break;
            }
            current = n.parent();
        }

        if let Some(bucket) = bucket {
            bucket.push_str(text);
            bucket.push(' ');
        }
    }

    out
}

/// True when the element sits inside a region that quotes other products'
/// prices (carts, navigation, related-product rails).
fn in_excluded_region(el: ElementRef) -> bool {
    let mut current = el.parent();
    while let Some(node) = current {
        if let Some(ancestor) = ElementRef::wrap(node) {
            if matches!(ancestor.value().name(), "nav" | "footer") {
                return true;
            }
            let mut names = String::new();
            if let Some(class) = ancestor.value().attr("class") {
                names.push_str(class);
            }
            if let Some(id) = ancestor.value().attr("id") {
                names.push(' ');
                names.push_str(id);
            }
            if !names.is_empty() && EXCLUDED_CONTAINER_RE.is_match(&names) {
                return true;
            }
        }
        current = node.parent();
    }
    false
}

fn price_from_element(el: ElementRef, hints: &PriceHints) -> Option<ParsedPrice> {
    let text = filtered_text(el);
    let active = clean_text(&text.active);
    if active.is_empty() {
        return None;
    }

    let mut price = parse_price(&active, hints)?;

    let crossed = clean_text(&text.crossed);
    if !crossed.is_empty() {
        if let Some(was) = parse_price(&crossed, hints) {
            price.set_regular_price(was.amount);
        }
    }

    Some(price)
}

/// Try the configured selectors in priority order; the first element whose
/// noise-filtered text parses wins.
pub fn locate_price(
    ctx: &AdapterContext,
    selectors: &[String],
    hints: &PriceHints,
) -> Option<ParsedPrice> {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            warn!("Skipping unparseable price selector '{}'", selector_str);
            continue;
        };

        for el in ctx.document().select(&selector) {
            if in_excluded_region(el) {
                continue;
            }
            if let Some(price) = price_from_element(el, hints) {
                debug!("Selector '{}' yielded {}", selector_str, price);
                return Some(price);
            }
        }
    }
    None
}

/// Last-resort scan: anything price-named whose text carries a currency
/// marker, scoped away from listing and navigation regions.
pub fn generic_scan(ctx: &AdapterContext, hints: &PriceHints) -> Option<ParsedPrice> {
    for el in ctx.document().select(&GENERIC_PRICE_SELECTOR) {
        if in_excluded_region(el) || classify_element(&el).is_some() {
            continue;
        }

        let active = clean_text(&filtered_text(el).active);
        if !looks_like_price(&active) {
            continue;
        }

        if let Some(price) = price_from_element(el, hints) {
            debug!("Generic scan yielded {}", price);
            return Some(price);
        }
    }
    None
}

/// Cheap presence check used by the mutation-wait: does any configured
/// location currently hold price-shaped text?
pub fn has_price_candidate(document: &Html, selectors: &[String]) -> bool {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in document.select(&selector) {
            if in_excluded_region(el) {
                continue;
            }
            let active = clean_text(&filtered_text(el).active);
            if active.chars().any(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx(body: &str) -> AdapterContext {
        let html = format!("<html><body>{}</body></html>", body);
        AdapterContext::new(&html, "https://shop.example.com/p/1")
    }

    fn sel(s: &str) -> Vec<String> {
        vec![s.to_string()]
    }

    #[test]
    fn crossed_out_price_becomes_regular_price() {
        let ctx = ctx(r#"<div class="price"><span class="old-price">€34,99</span><span>€27,99</span></div>"#);
        let price = locate_price(&ctx, &sel("div.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
        assert_eq!(price.currency, "EUR");
        assert_eq!(price.regular_price, Some(34.99));
        assert!(price.is_on_sale);
    }

    #[test]
    fn del_wrapper_and_inline_line_through() {
        let ctx = ctx(r#"<p class="price"><del>$39.00</del> <ins>$29.00</ins></p>"#);
        let price = locate_price(&ctx, &sel("p.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 29.00);
        assert_eq!(price.regular_price, Some(39.00));

        let ctx = self::ctx(
            r#"<div class="price"><span style="text-decoration: line-through">€34,99</span> €27,99</div>"#,
        );
        let price = locate_price(&ctx, &sel("div.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
        assert_eq!(price.regular_price, Some(34.99));
    }

    #[test]
    fn crossed_out_only_is_not_an_active_price() {
        let ctx = ctx(r#"<div class="price"><del>€34,99</del></div>"#);
        assert_eq!(locate_price(&ctx, &sel("div.price"), &PriceHints::default()), None);
    }

    #[test]
    fn discount_badge_is_dropped_entirely() {
        let ctx = ctx(r#"<div class="price"><span class="discount-badge">-20%</span> €27,99</div>"#);
        let price = locate_price(&ctx, &sel("div.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
        assert_eq!(price.regular_price, None);
    }

    #[test]
    fn smaller_crossed_value_is_ignored() {
        let ctx = ctx(r#"<div class="price"><del>€19,99</del> €27,99</div>"#);
        let price = locate_price(&ctx, &sel("div.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
        assert_eq!(price.regular_price, None);
        assert!(!price.is_on_sale);
    }

    #[test]
    fn cart_and_related_regions_are_skipped() {
        let ctx = ctx(concat!(
            r#"<div id="mini-cart"><span class="price">€9,99</span></div>"#,
            r#"<section class="related-products"><span class="price">€5,00</span></section>"#,
            r#"<div class="product-info"><span class="price">€27,99</span></div>"#,
        ));
        let price = locate_price(&ctx, &sel("span.price"), &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
    }

    #[test]
    fn generic_scan_needs_a_currency_marker() {
        let ctx = ctx(r#"<span class="product-price">4711</span>"#);
        assert_eq!(generic_scan(&ctx, &PriceHints::default()), None);

        let ctx = self::ctx(r#"<span class="product-price">$47.11</span>"#);
        let price = generic_scan(&ctx, &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 47.11);
    }

    #[test]
    fn bad_selector_is_skipped_not_fatal() {
        let ctx = ctx(r#"<span class="price">€27,99</span>"#);
        let selectors = vec!["p..".to_string(), "span.price".to_string()];
        let price = locate_price(&ctx, &selectors, &PriceHints::default()).unwrap();
        assert_eq!(price.amount, 27.99);
    }

    #[test]
    fn candidate_presence_check() {
        let ctx = ctx(r#"<div class="price">loading…</div>"#);
        assert!(!has_price_candidate(ctx.document(), &sel("div.price")));
        let ctx = self::ctx(r#"<div class="price">€27,99</div>"#);
        assert!(has_price_candidate(ctx.document(), &sel("div.price")));
    }
}
