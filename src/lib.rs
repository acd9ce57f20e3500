//! Product price extraction engine.
//!
//! Operates on already-materialized page snapshots (HTML plus the page URL):
//! a dispatcher picks a site adapter, the adapter runs a waterfall of
//! extraction strategies (structured data, meta tags, priority markup,
//! generic scan), and every candidate passes through the number/currency
//! parser, the sanity checker and the currency validator before it is
//! surfaced with a confidence score.

pub mod adapters;
pub mod config;
pub mod context;
pub mod extract;
pub mod models;
pub mod parsers;

pub use adapters::{Dispatcher, SiteAdapter};
pub use config::EngineConfig;
pub use context::AdapterContext;
pub use models::{ParsedPrice, ProductId, ProductRecord};
