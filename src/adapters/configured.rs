use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::adapters::SiteAdapter;
use crate::config::EngineConfig;
use crate::context::AdapterContext;
use crate::extract::{meta, ExtractionPipeline};
use crate::models::ParsedPrice;
use crate::parsers::{clean_text, currency};

/// Configuration record behind a site adapter: selector lists, URL
/// patterns, currency rules. One shared implementation interprets these; a
/// new site is a new record, not a new type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterProfile {
    pub key: String,
    pub name: String,
    /// Domain substrings this profile claims.
    pub domains: Vec<String>,
    /// Regexes matched against the page URL; capture group 1, when present,
    /// is the product id.
    pub url_patterns: Vec<String>,
    /// Markers probed during platform self-detection.
    pub detect_selectors: Vec<String>,
    /// Priority price markup, most specific first.
    pub price_selectors: Vec<String>,
    pub title_selectors: Vec<String>,
    pub image_selectors: Vec<String>,
    pub id_selectors: Vec<String>,
    /// Currency the site is known to quote; otherwise resolved from
    /// domain/locale.
    pub expected_currency: Option<String>,
    /// Markup known to vary; extraction accepts at the relaxed threshold.
    pub relaxed_markup: bool,
}

/// A profile that cannot satisfy the capability contract. Raised when the
/// adapter is built: a configuration defect, not a page condition.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("adapter profile is missing a key")]
    MissingKey,
    #[error("profile '{key}' has neither domain rules nor detection markers")]
    NoDispatchRule { key: String },
    #[error("profile '{key}' has an unparseable selector '{selector}'")]
    BadSelector { key: String, selector: String },
    #[error("profile '{key}' has an invalid url pattern '{pattern}'")]
    BadUrlPattern {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("profile '{key}' declares unknown currency '{currency}'")]
    UnknownCurrency { key: String, currency: String },
}

pub struct ConfiguredAdapter {
    profile: AdapterProfile,
    config: EngineConfig,
    url_patterns: Vec<Regex>,
}

const IMAGE_ATTRS: &[&str] = &["data-src", "src", "content", "href"];
const ID_ATTRS: &[&str] = &["content", "value", "data-product-id", "data-sku"];

impl ConfiguredAdapter {
    pub fn new(profile: AdapterProfile, config: EngineConfig) -> Result<Self, ProfileError> {
        if profile.key.trim().is_empty() {
            return Err(ProfileError::MissingKey);
        }
        if profile.domains.is_empty()
            && profile.detect_selectors.is_empty()
            && profile.url_patterns.is_empty()
        {
            return Err(ProfileError::NoDispatchRule {
                key: profile.key.clone(),
            });
        }

        for selector in profile
            .detect_selectors
            .iter()
            .chain(&profile.price_selectors)
            .chain(&profile.title_selectors)
            .chain(&profile.image_selectors)
            .chain(&profile.id_selectors)
        {
            if Selector::parse(selector).is_err() {
                return Err(ProfileError::BadSelector {
                    key: profile.key.clone(),
                    selector: selector.clone(),
                });
            }
        }

        let url_patterns = profile
            .url_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ProfileError::BadUrlPattern {
                    key: profile.key.clone(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(code) = &profile.expected_currency {
            if !currency::is_known_code(code) {
                return Err(ProfileError::UnknownCurrency {
                    key: profile.key.clone(),
                    currency: code.clone(),
                });
            }
        }

        Ok(Self {
            profile,
            config,
            url_patterns,
        })
    }

    pub fn profile(&self) -> &AdapterProfile {
        &self.profile
    }

    pub fn matches_domain(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }
        let domain = domain.to_ascii_lowercase();
        self.profile
            .domains
            .iter()
            .any(|d| domain.contains(&d.to_ascii_lowercase()))
    }

    pub fn is_self_detecting(&self) -> bool {
        !self.profile.detect_selectors.is_empty()
    }

    fn first_text(&self, ctx: &AdapterContext, selectors: &[String]) -> Option<String> {
        for selector_str in selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            for el in ctx.document().select(&selector) {
                let text = clean_text(&el.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    fn first_attr(
        &self,
        ctx: &AdapterContext,
        selectors: &[String],
        attrs: &[&str],
    ) -> Option<String> {
        for selector_str in selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            for el in ctx.document().select(&selector) {
                for attr in attrs {
                    if let Some(value) = el.value().attr(attr) {
                        let value = value.trim();
                        if !value.is_empty() {
                            return Some(value.to_string());
                        }
                    }
                }
            }
        }
        None
    }

    fn absolutize(&self, ctx: &AdapterContext, href: &str) -> String {
        Url::parse(&ctx.url)
            .ok()
            .and_then(|base| base.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string())
    }
}

impl SiteAdapter for ConfiguredAdapter {
    fn detect_product(&self, ctx: &AdapterContext) -> bool {
        if self.url_patterns.iter().any(|re| re.is_match(&ctx.url)) {
            return true;
        }
        for selector_str in &self.profile.detect_selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if ctx.document().select(&selector).next().is_some() {
                    return true;
                }
            }
        }
        // Domain-matched profiles: a product schema block or live price
        // markup marks the page as a product. Self-detecting platform
        // profiles must not use this fallback or they would claim any
        // shop's page during dispatch.
        if !self.is_self_detecting() {
            if ctx.structured_product().is_some() {
                return true;
            }
            for selector_str in &self.profile.price_selectors {
                if let Ok(selector) = Selector::parse(selector_str) {
                    if ctx.document().select(&selector).next().is_some() {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn extract_product_id(&self, ctx: &AdapterContext) -> Option<String> {
        if let Some(id) = ctx
            .structured_product()
            .and_then(|product| product.identifier())
        {
            return Some(id.to_string());
        }

        for selector_str in &self.profile.id_selectors {
            let one = std::slice::from_ref(selector_str);
            if let Some(id) = self.first_attr(ctx, one, ID_ATTRS) {
                return Some(id);
            }
            if let Some(id) = self.first_text(ctx, one) {
                return Some(id);
            }
        }

        for re in &self.url_patterns {
            if let Some(m) = re.captures(&ctx.url).and_then(|cap| cap.get(1)) {
                return Some(m.as_str().to_string());
            }
        }

        None
    }

    fn extract_title(&self, ctx: &AdapterContext) -> Option<String> {
        if let Some(name) = ctx.structured_product().and_then(|p| p.name.clone()) {
            return Some(name);
        }
        if let Some(title) = self.first_text(ctx, &self.profile.title_selectors) {
            return Some(title);
        }
        meta::first_content(ctx.document(), r#"meta[property="og:title"]"#)
    }

    fn extract_price(&self, ctx: &AdapterContext) -> Option<ParsedPrice> {
        ExtractionPipeline::new(&self.config)
            .with_priority_selectors(&self.profile.price_selectors)
            .with_relaxed_threshold(self.profile.relaxed_markup)
            .extract_price(ctx)
    }

    fn extract_image(&self, ctx: &AdapterContext) -> Option<String> {
        if let Some(image) = ctx.structured_product().and_then(|p| p.image.clone()) {
            return Some(self.absolutize(ctx, &image));
        }
        if let Some(src) = self.first_attr(ctx, &self.profile.image_selectors, IMAGE_ATTRS) {
            return Some(self.absolutize(ctx, &src));
        }
        meta::first_content(ctx.document(), r#"meta[property="og:image"]"#)
            .map(|src| self.absolutize(ctx, &src))
    }

    fn expected_currency(&self, ctx: &AdapterContext) -> Option<String> {
        self.profile.expected_currency.clone().or_else(|| {
            currency::resolve_expected_currency(
                (!ctx.domain.is_empty()).then_some(ctx.domain.as_str()),
                ctx.locale.as_deref(),
            )
        })
    }

    fn site_key(&self) -> &str {
        &self.profile.key
    }

    fn site_name(&self) -> &str {
        &self.profile.name
    }
}

/// The shipped profile table. Domain-specific entries first, then the
/// platform profiles probed via self-detection.
pub fn builtin_profiles() -> Vec<AdapterProfile> {
    let s = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    vec![
        AdapterProfile {
            key: "amazon".to_string(),
            name: "Amazon".to_string(),
            domains: s(&["amazon."]),
            url_patterns: s(&[r"/dp/([A-Z0-9]{10})", r"/gp/product/([A-Z0-9]{10})"]),
            price_selectors: s(&[
                "#corePrice_feature_div span.a-offscreen",
                "span.priceToPay span.a-offscreen",
                "#priceblock_ourprice",
                "#priceblock_dealprice",
            ]),
            title_selectors: s(&["#productTitle"]),
            image_selectors: s(&["#landingImage", "#imgTagWrapperId img"]),
            relaxed_markup: true,
            ..Default::default()
        },
        AdapterProfile {
            key: "ebay".to_string(),
            name: "eBay".to_string(),
            domains: s(&["ebay."]),
            url_patterns: s(&[r"/itm/(\d+)"]),
            price_selectors: s(&[".x-price-primary span.ux-textspans", "#prcIsum"]),
            title_selectors: s(&["h1.x-item-title__mainTitle span", "#itemTitle"]),
            image_selectors: s(&["#icImg", "div.ux-image-carousel-item img"]),
            relaxed_markup: true,
            ..Default::default()
        },
        AdapterProfile {
            key: "etsy".to_string(),
            name: "Etsy".to_string(),
            domains: s(&["etsy.com"]),
            url_patterns: s(&[r"/listing/(\d+)"]),
            price_selectors: s(&[
                r#"[data-selector="price-only"] p"#,
                "p.wt-text-title-larger",
            ]),
            title_selectors: s(&["h1[data-buy-box-listing-title]"]),
            image_selectors: s(&["img[data-carousel-first-image]"]),
            ..Default::default()
        },
        AdapterProfile {
            key: "bol".to_string(),
            name: "Bol.com".to_string(),
            domains: s(&["bol.com"]),
            url_patterns: s(&[r"/p/[^/]+/(\d+)"]),
            price_selectors: s(&[r#"span[data-test="price"]"#]),
            title_selectors: s(&[r#"h1[data-test="title"]"#, "h1.page-heading"]),
            image_selectors: s(&["div.product-image img"]),
            // Dutch shop on a generic TLD.
            expected_currency: Some("EUR".to_string()),
            ..Default::default()
        },
        AdapterProfile {
            key: "shopify".to_string(),
            name: "Shopify storefront".to_string(),
            url_patterns: s(&[r"/products/([A-Za-z0-9_-]+)"]),
            detect_selectors: s(&[
                r#"script[src*="cdn.shopify.com"]"#,
                r#"meta[name="shopify-checkout-api-token"]"#,
                "[data-shopify]",
            ]),
            price_selectors: s(&[
                ".price__current",
                ".price-item--sale",
                ".price-item--regular",
                "span.money",
            ]),
            title_selectors: s(&["h1.product__title", ".product-single__title", "h1"]),
            image_selectors: s(&[".product__media img", "img.product-featured-media"]),
            ..Default::default()
        },
        AdapterProfile {
            key: "woocommerce".to_string(),
            name: "WooCommerce storefront".to_string(),
            url_patterns: s(&[r"/product/([\w-]+)"]),
            detect_selectors: s(&["body.woocommerce", ".woocommerce-page", "div.woocommerce"]),
            price_selectors: s(&[
                "p.price ins .woocommerce-Price-amount",
                "p.price .woocommerce-Price-amount",
                ".summary .woocommerce-Price-amount",
            ]),
            title_selectors: s(&["h1.product_title"]),
            image_selectors: s(&[".woocommerce-product-gallery__image img"]),
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_profile() -> AdapterProfile {
        AdapterProfile {
            key: "shop".to_string(),
            name: "Shop".to_string(),
            domains: vec!["shop.example".to_string()],
            price_selectors: vec!["span.price".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn builtin_profiles_all_validate() {
        for profile in builtin_profiles() {
            let key = profile.key.clone();
            assert!(
                ConfiguredAdapter::new(profile, EngineConfig::default()).is_ok(),
                "profile {} failed validation",
                key
            );
        }
    }

    #[test]
    fn misconfigured_profiles_are_rejected_at_build() {
        let mut profile = minimal_profile();
        profile.key = String::new();
        assert!(matches!(
            ConfiguredAdapter::new(profile, EngineConfig::default()),
            Err(ProfileError::MissingKey)
        ));

        let mut profile = minimal_profile();
        profile.domains.clear();
        assert!(matches!(
            ConfiguredAdapter::new(profile, EngineConfig::default()),
            Err(ProfileError::NoDispatchRule { .. })
        ));

        let mut profile = minimal_profile();
        profile.price_selectors = vec!["p..".to_string()];
        assert!(matches!(
            ConfiguredAdapter::new(profile, EngineConfig::default()),
            Err(ProfileError::BadSelector { .. })
        ));

        let mut profile = minimal_profile();
        profile.url_patterns = vec!["(".to_string()];
        assert!(matches!(
            ConfiguredAdapter::new(profile, EngineConfig::default()),
            Err(ProfileError::BadUrlPattern { .. })
        ));

        let mut profile = minimal_profile();
        profile.expected_currency = Some("ZZZ".to_string());
        assert!(matches!(
            ConfiguredAdapter::new(profile, EngineConfig::default()),
            Err(ProfileError::UnknownCurrency { .. })
        ));
    }

    #[test]
    fn product_id_prefers_structured_then_url() {
        let adapter = ConfiguredAdapter::new(
            AdapterProfile {
                url_patterns: vec![r"/p/(\d+)".to_string()],
                ..minimal_profile()
            },
            EngineConfig::default(),
        )
        .unwrap();

        let html = concat!(
            "<html><body>",
            r#"<script type="application/ld+json">
               {"@type": "Product", "name": "W", "sku": "SKU-9"}</script>"#,
            "</body></html>",
        );
        let ctx = AdapterContext::new(html, "https://shop.example.com/p/4711");
        assert_eq!(adapter.extract_product_id(&ctx).as_deref(), Some("SKU-9"));

        let ctx = AdapterContext::new("<html></html>", "https://shop.example.com/p/4711");
        assert_eq!(adapter.extract_product_id(&ctx).as_deref(), Some("4711"));
    }

    #[test]
    fn image_urls_are_absolutized() {
        let adapter = ConfiguredAdapter::new(
            AdapterProfile {
                image_selectors: vec!["img.hero".to_string()],
                ..minimal_profile()
            },
            EngineConfig::default(),
        )
        .unwrap();

        let html = r#"<html><body><img class="hero" data-src="/img/p.jpg"></body></html>"#;
        let ctx = AdapterContext::new(html, "https://shop.example.com/p/1");
        assert_eq!(
            adapter.extract_image(&ctx).as_deref(),
            Some("https://shop.example.com/img/p.jpg")
        );
    }

    #[test]
    fn title_falls_back_to_og_meta() {
        let adapter =
            ConfiguredAdapter::new(minimal_profile(), EngineConfig::default()).unwrap();
        let html = r#"<html><head><meta property="og:title" content="Fallback Widget"></head><body></body></html>"#;
        let ctx = AdapterContext::new(html, "https://shop.example.com/p/1");
        assert_eq!(
            adapter.extract_title(&ctx).as_deref(),
            Some("Fallback Widget")
        );
    }

    #[test]
    fn expected_currency_profile_overrides_domain() {
        let mut profile = minimal_profile();
        profile.expected_currency = Some("EUR".to_string());
        let adapter = ConfiguredAdapter::new(profile, EngineConfig::default()).unwrap();
        let ctx = AdapterContext::new("<html></html>", "https://shop.example.co.uk/p/1");
        assert_eq!(adapter.expected_currency(&ctx).as_deref(), Some("EUR"));

        let adapter =
            ConfiguredAdapter::new(minimal_profile(), EngineConfig::default()).unwrap();
        assert_eq!(adapter.expected_currency(&ctx).as_deref(), Some("GBP"));
    }
}
