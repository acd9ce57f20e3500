use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParsedPrice, ProductId};

/// Canonical product node normalized out of an embedded schema block.
///
/// Immutable once extracted; memoized on the context for the lifetime of one
/// extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub mpn: Option<String>,
    pub gtin: Option<String>,
    pub image: Option<String>,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub price: Option<String>,
    pub price_currency: Option<String>,
}

impl StructuredProduct {
    /// First declared identifier, in declaration-strength order.
    pub fn identifier(&self) -> Option<&str> {
        self.sku
            .as_deref()
            .or(self.mpn.as_deref())
            .or(self.gtin.as_deref())
    }

    /// Offers may be a single object or a list; the first entry is canonical.
    pub fn primary_offer(&self) -> Option<&Offer> {
        self.offers.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Option<ProductId>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<ParsedPrice>,
    pub url: String,
    pub site_name: String,
    pub extracted_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Stable identifier for dedup: the explicit product id when one was
    /// extracted, otherwise an md5 hash over the stable fields.
    pub fn composite_id(&self) -> ProductId {
        use md5::Context;

        if let Some(id) = &self.id {
            if !id.0.trim().is_empty() {
                return id.clone();
            }
        }

        let title_norm = self
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .trim()
            .to_string();
        let price_norm = self
            .price
            .as_ref()
            .map(|p| format!("{:.2}|{}", p.amount, p.currency))
            .unwrap_or_default();

        let components = [title_norm, price_norm, self.url.to_lowercase()];

        let hash_string = components
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("|");

        let mut hasher = Context::new();
        hasher.consume(hash_string.as_bytes());
        let result = hasher.compute();

        ProductId(format!("{:x}", result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: Option<&str>, title: Option<&str>, url: &str) -> ProductRecord {
        ProductRecord {
            id: id.map(|s| ProductId(s.to_string())),
            title: title.map(String::from),
            image_url: None,
            price: Some(ParsedPrice::new(19.99, "USD", 0.9)),
            url: url.to_string(),
            site_name: "test".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn explicit_id_wins_over_hash() {
        let rec = record(Some("B01ABCDEF"), Some("Widget"), "https://x.test/p/1");
        assert_eq!(rec.composite_id(), ProductId("B01ABCDEF".to_string()));
    }

    #[test]
    fn hash_is_stable_for_equal_fields() {
        let a = record(None, Some("Widget"), "https://x.test/p/1");
        let b = record(None, Some("Widget"), "https://x.test/p/1");
        assert_eq!(a.composite_id(), b.composite_id());
        assert_ne!(
            a.composite_id(),
            record(None, Some("Gadget"), "https://x.test/p/1").composite_id()
        );
    }

    #[test]
    fn identifier_prefers_sku() {
        let product = StructuredProduct {
            sku: Some("SKU-1".to_string()),
            mpn: Some("MPN-1".to_string()),
            ..Default::default()
        };
        assert_eq!(product.identifier(), Some("SKU-1"));

        let product = StructuredProduct {
            gtin: Some("4006381333931".to_string()),
            ..Default::default()
        };
        assert_eq!(product.identifier(), Some("4006381333931"));
    }
}
