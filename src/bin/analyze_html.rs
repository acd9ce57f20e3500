use anyhow::{Context, Result};
use std::fs;

use price_scout::{AdapterContext, Dispatcher, EngineConfig, SiteAdapter};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("price_scout=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let usage = "usage: analyze_html <snapshot.html> <page-url>";
    let path = args.next().context(usage)?;
    let url = args.next().context(usage)?;

    let html = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let config = EngineConfig::load().unwrap_or_else(|e| {
        eprintln!("Falling back to default config: {}", e);
        EngineConfig::default()
    });
    let dispatcher = Dispatcher::new(config)?;

    let mut ctx = AdapterContext::new(&html, &url);
    println!("Domain: {}", ctx.domain);
    println!("Locale: {}", ctx.locale.as_deref().unwrap_or("-"));

    match dispatcher.select(&ctx) {
        Some(adapter) => {
            println!("Adapter: {} ({})", adapter.site_name(), adapter.site_key());

            // Show which of the profile's price locations exist on this page
            for selector_str in &adapter.profile().price_selectors {
                if let Ok(selector) = scraper::Selector::parse(selector_str) {
                    let count = ctx.document().select(&selector).count();
                    if count > 0 {
                        println!("Selector '{}' matched {} elements", selector_str, count);
                    }
                }
            }
        }
        None => {
            println!("No adapter matched; page needs generic detection");
            return Ok(());
        }
    }

    match dispatcher.extract_record(&mut ctx) {
        Some(record) => {
            println!("Product id: {}", record.composite_id());
            println!("Title:      {}", record.title.as_deref().unwrap_or("-"));
            println!("Image:      {}", record.image_url.as_deref().unwrap_or("-"));
            match &record.price {
                Some(price) => println!(
                    "Price:      {} (confidence {:.2})",
                    price, price.confidence
                ),
                None => println!("Price:      not detected"),
            }
        }
        None => println!("No product detected on this page"),
    }

    Ok(())
}
