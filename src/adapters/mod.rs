//! The adapter capability contract and the dispatcher that picks an
//! implementation for a page.

use chrono::Utc;
use tracing::{debug, info};

mod configured;

pub use configured::{builtin_profiles, AdapterProfile, ConfiguredAdapter, ProfileError};

use crate::config::EngineConfig;
use crate::context::AdapterContext;
use crate::models::{ParsedPrice, ProductId, ProductRecord};

/// Capability contract every site adapter satisfies. All operations report
/// page conditions as `None`/`false`; they never panic on page content. A
/// profile that cannot satisfy the contract is rejected when the adapter is
/// built, not at extraction time.
pub trait SiteAdapter: Send + Sync {
    fn detect_product(&self, ctx: &AdapterContext) -> bool;
    fn extract_product_id(&self, ctx: &AdapterContext) -> Option<String>;
    fn extract_title(&self, ctx: &AdapterContext) -> Option<String>;
    fn extract_price(&self, ctx: &AdapterContext) -> Option<ParsedPrice>;
    fn extract_image(&self, ctx: &AdapterContext) -> Option<String>;
    fn expected_currency(&self, ctx: &AdapterContext) -> Option<String>;
    fn site_key(&self) -> &str;
    fn site_name(&self) -> &str;
}

/// Selects the adapter for a page: domain substring match against the
/// profile table first (first match wins), then platform self-detection in
/// registration order.
pub struct Dispatcher {
    adapters: Vec<ConfiguredAdapter>,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Result<Self, ProfileError> {
        Self::with_profiles(config, builtin_profiles())
    }

    pub fn with_profiles(
        config: EngineConfig,
        profiles: Vec<AdapterProfile>,
    ) -> Result<Self, ProfileError> {
        let adapters = profiles
            .into_iter()
            .map(|profile| ConfiguredAdapter::new(profile, config.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { adapters })
    }

    pub fn select(&self, ctx: &AdapterContext) -> Option<&ConfiguredAdapter> {
        for adapter in &self.adapters {
            if adapter.matches_domain(&ctx.domain) {
                debug!("Domain {} matched adapter {}", ctx.domain, adapter.site_key());
                return Some(adapter);
            }
        }
        for adapter in &self.adapters {
            if adapter.is_self_detecting() && adapter.detect_product(ctx) {
                debug!("Adapter {} self-detected the page", adapter.site_key());
                return Some(adapter);
            }
        }
        None
    }

    /// Run the full contract against a page and assemble the record, or
    /// learn that the page is not a recognized product page.
    pub fn extract_record(&self, ctx: &mut AdapterContext) -> Option<ProductRecord> {
        let adapter = self.select(ctx)?;
        if !adapter.detect_product(ctx) {
            debug!("Adapter {} found no product on {}", adapter.site_key(), ctx.url);
            return None;
        }

        if ctx.expected_currency.is_none() {
            ctx.expected_currency = adapter.expected_currency(ctx);
        }

        let record = ProductRecord {
            id: adapter.extract_product_id(ctx).map(ProductId),
            title: adapter.extract_title(ctx),
            image_url: adapter.extract_image(ctx),
            price: adapter.extract_price(ctx),
            url: ctx.url.clone(),
            site_name: adapter.site_name().to_string(),
            extracted_at: Utc::now(),
        };
        info!(
            "Extracted record from {} via {}: price {}",
            ctx.domain,
            adapter.site_key(),
            record
                .price
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string())
        );
        Some(record)
    }
}
