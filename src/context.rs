use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use scraper::{Html, Selector};
use url::Url;

use crate::extract::structured;
use crate::models::StructuredProduct;
use crate::parsers::PriceHints;

static HTML_TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("html").expect("Invalid html selector"));

/// Everything one extraction invocation works on: the materialized page,
/// where it came from, and the memoized structured-data scan. Owned by a
/// single extraction call, never shared across pages.
pub struct AdapterContext {
    document: Html,
    pub url: String,
    pub domain: String,
    pub locale: Option<String>,
    pub expected_currency: Option<String>,
    structured: OnceCell<Option<StructuredProduct>>,
}

impl AdapterContext {
    pub fn new(html: &str, url: &str) -> Self {
        let document = Html::parse_document(html);
        let domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let locale = document
            .select(&HTML_TAG_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("lang"))
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty());

        Self {
            document,
            url: url.to_string(),
            domain,
            locale,
            expected_currency: None,
            structured: OnceCell::new(),
        }
    }

    pub fn with_expected_currency(mut self, code: impl Into<String>) -> Self {
        self.expected_currency = Some(code.into().to_ascii_uppercase());
        self
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// The page's product schema block, scanned once per context. Negative
    /// results are cached too so repeated field lookups never re-parse.
    pub fn structured_product(&self) -> Option<&StructuredProduct> {
        self.structured
            .get_or_init(|| structured::scan(&self.document))
            .as_ref()
    }

    pub fn price_hints<'a>(&'a self, fallback_currency: Option<&'a str>) -> PriceHints<'a> {
        PriceHints {
            domain: (!self.domain.is_empty()).then_some(self.domain.as_str()),
            locale: self.locale.as_deref(),
            expected_currency: self.expected_currency.as_deref(),
            fallback_currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_domain_and_locale() {
        let html = r#"<html lang="de-DE"><body><p>hi</p></body></html>"#;
        let ctx = AdapterContext::new(html, "https://www.shop.de/produkt/123?x=1");
        assert_eq!(ctx.domain, "www.shop.de");
        assert_eq!(ctx.locale.as_deref(), Some("de-DE"));
    }

    #[test]
    fn tolerates_unparseable_url() {
        let ctx = AdapterContext::new("<html></html>", "not a url");
        assert_eq!(ctx.domain, "");
        assert_eq!(ctx.price_hints(None).domain, None);
    }
}
