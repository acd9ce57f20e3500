//! Structured-data (JSON-LD) product extraction.
//!
//! Scans every `application/ld+json` block on the page, tolerating malformed
//! blocks, and normalizes the three envelope shapes seen in the wild (a
//! bare object, a top-level array, an `@graph` wrapper) into one canonical
//! [`StructuredProduct`].

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::models::{Offer, StructuredProduct};

static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("Invalid ld+json selector")
});

/// Find the first Product node on the page. One malformed block never
/// aborts the scan.
pub fn scan(document: &Html) -> Option<StructuredProduct> {
    for script in document.select(&LD_JSON_SELECTOR) {
        let raw = script.inner_html();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Skipping malformed ld+json block: {}", e);
                continue;
            }
        };

        if let Some(node) = find_product(&value) {
            return Some(normalize(node));
        }
    }
    None
}

/// Flatten the envelope: a direct object is itself the item list, an array
/// contributes its elements, an `@graph` wrapper contributes the graph.
fn envelope_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            if let Some(Value::Array(graph)) = map.get("@graph") {
                graph.iter().collect()
            } else {
                vec![value]
            }
        }
        _ => Vec::new(),
    }
}

fn find_product(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    envelope_items(value)
        .into_iter()
        .find(|item| is_product(item))
        .and_then(Value::as_object)
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    }
}

fn normalize(map: &serde_json::Map<String, Value>) -> StructuredProduct {
    StructuredProduct {
        name: string_field(map.get("name")),
        sku: string_field(map.get("sku")),
        mpn: string_field(map.get("mpn")),
        gtin: ["gtin", "gtin13", "gtin12", "gtin8", "gtin14"]
            .iter()
            .find_map(|key| string_field(map.get(*key))),
        image: image_field(map.get("image")),
        offers: collect_offers(map.get("offers")),
    }
}

/// Strings and numbers both count; schema publishers use either freely.
fn string_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Image may be a string, an array of strings/objects, or an object with a
/// `url` field.
fn image_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(Value::Array(items)) => items.iter().find_map(|item| image_field(Some(item))),
        Some(Value::Object(map)) => string_field(map.get("url")),
        _ => None,
    }
}

fn collect_offers(value: Option<&Value>) -> Vec<Offer> {
    match value {
        Some(Value::Object(map)) => {
            // AggregateOffer nests concrete offers one level down.
            if let Some(nested @ Value::Array(_)) = map.get("offers") {
                let nested = collect_offers(Some(nested));
                if !nested.is_empty() {
                    return nested;
                }
            }
            vec![offer_from(map)]
        }
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(offer_from)
            .collect(),
        _ => Vec::new(),
    }
}

fn offer_from(map: &serde_json::Map<String, Value>) -> Offer {
    let price = ["price", "lowPrice", "highPrice"]
        .iter()
        .find_map(|key| string_field(map.get(*key)));
    Offer {
        price,
        price_currency: string_field(map.get("priceCurrency")),
    }
}
