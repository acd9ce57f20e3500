use serde::{Deserialize, Serialize};
use std::fmt;

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed price with its inferred currency and a [0,1] confidence score.
///
/// Built fresh for every extraction attempt. The sanity checker may attach
/// `regular_price`/`is_on_sale`, the currency validator may lower
/// `confidence`; after the pipeline returns it the value is final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPrice {
    pub amount: f64,
    /// 3-letter uppercase currency code.
    pub currency: String,
    pub confidence: f64,
    /// Pre-discount price taken from a co-located crossed-out element.
    pub regular_price: Option<f64>,
    pub is_on_sale: bool,
}

impl ParsedPrice {
    pub fn new(amount: f64, currency: impl Into<String>, confidence: f64) -> Self {
        Self {
            amount,
            currency: currency.into().to_ascii_uppercase(),
            confidence: confidence.clamp(0.0, 1.0),
            regular_price: None,
            is_on_sale: false,
        }
    }

    /// Attach a "was" price. Ignored unless it exceeds the active amount.
    pub fn set_regular_price(&mut self, regular: f64) {
        if regular > self.amount {
            self.regular_price = Some(regular);
            self.is_on_sale = true;
        }
    }

    pub fn scale_confidence(&mut self, factor: f64) {
        self.confidence = (self.confidence * factor).clamp(0.0, 1.0);
    }
}

impl fmt::Display for ParsedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)?;
        if let Some(regular) = self.regular_price {
            write!(f, " (was {:.2})", regular)?;
        }
        Ok(())
    }
}
