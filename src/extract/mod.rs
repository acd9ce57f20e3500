//! The extraction waterfall: ordered strategies tried until one clears the
//! confidence threshold.

pub mod locator;
pub mod meta;
pub mod structured;
pub mod validate;
pub mod wait;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::context::AdapterContext;
use crate::models::ParsedPrice;
use crate::parsers::price::{parse_price, PriceHints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    StructuredData,
    MetaTags,
    PriorityMarkup,
    GenericMarkup,
}

// Most to least reliable.
const STRATEGY_ORDER: [Strategy; 4] = [
    Strategy::StructuredData,
    Strategy::MetaTags,
    Strategy::PriorityMarkup,
    Strategy::GenericMarkup,
];

pub struct ExtractionPipeline<'a> {
    config: &'a EngineConfig,
    priority_selectors: &'a [String],
    relaxed: bool,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            priority_selectors: &[],
            relaxed: false,
        }
    }

    /// Site-specific markup locations, tried after the machine-readable
    /// strategies.
    pub fn with_priority_selectors(mut self, selectors: &'a [String]) -> Self {
        self.priority_selectors = selectors;
        self
    }

    /// Accept at the relaxed threshold; for pages with known highly
    /// variable markup.
    pub fn with_relaxed_threshold(mut self, relaxed: bool) -> Self {
        self.relaxed = relaxed;
        self
    }

    /// Run the waterfall. Each strategy is independent and side-effect
    /// free; a failed sanity check or a below-threshold confidence moves on
    /// to the next strategy instead of aborting.
    pub fn extract_price(&self, ctx: &AdapterContext) -> Option<ParsedPrice> {
        let threshold = if self.relaxed {
            self.config.relaxed_threshold
        } else {
            self.config.accept_threshold
        };
        let hints = ctx.price_hints(Some(&self.config.fallback_currency));

        for strategy in STRATEGY_ORDER {
            let Some(mut price) = self.run_strategy(strategy, ctx, &hints) else {
                debug!("Strategy {:?} found nothing", strategy);
                continue;
            };

            if !validate::sanity_check(&mut price, self.config.max_plausible_price) {
                continue;
            }
            validate::validate_currency(
                &mut price,
                ctx.expected_currency.as_deref(),
                self.config.currency_mismatch_factor,
            );

            if price.confidence >= threshold {
                info!(
                    "Strategy {:?} accepted {} (confidence {:.2})",
                    strategy, price, price.confidence
                );
                return Some(price);
            }
            debug!(
                "Strategy {:?} result {} below threshold {:.2}",
                strategy, price.confidence, threshold
            );
        }

        None
    }

    fn run_strategy(
        &self,
        strategy: Strategy,
        ctx: &AdapterContext,
        hints: &PriceHints,
    ) -> Option<ParsedPrice> {
        match strategy {
            Strategy::StructuredData => self.from_structured(ctx, hints),
            Strategy::MetaTags => meta::price_from_meta(ctx, hints),
            Strategy::PriorityMarkup => {
                if self.priority_selectors.is_empty() {
                    return None;
                }
                locator::locate_price(ctx, self.priority_selectors, hints)
            }
            Strategy::GenericMarkup => locator::generic_scan(ctx, hints),
        }
    }

    fn from_structured(&self, ctx: &AdapterContext, hints: &PriceHints) -> Option<ParsedPrice> {
        let product = ctx.structured_product()?;
        let offer = product.primary_offer()?;
        let raw = offer.price.as_deref()?;

        match offer.price_currency.as_deref() {
            Some(code) => parse_price(&format!("{} {}", raw, code), hints),
            None => {
                // The block is trusted for the amount; the defaulted
                // currency less so.
                let assumed = ctx
                    .expected_currency
                    .as_deref()
                    .unwrap_or(&self.config.fallback_currency);
                let mut price = parse_price(&format!("{} {}", raw, assumed), hints)?;
                price.scale_confidence(0.85);
                Some(price)
            }
        }
    }
}
