// src/bin/cache_compact.rs
//! Open the configured cache, then close it so young is compacted and,
//! once it has outgrown its limit, rotated into old.

use anyhow::{Context, Result};
use crypt_memo::{load_config, Generation, TieredCache};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config();
    let options = config.cache.options();

    let cache = TieredCache::open_with(&config.cache.dir, &options).with_context(|| {
        format!("failed to open cache at {}", config.cache.dir.display())
    })?;

    info!("compacting cache at {}", cache.root().display());
    for generation in [Generation::Young, Generation::Old] {
        let store = &cache[generation];
        let records = store
            .len()
            .with_context(|| format!("failed to count {generation} records"))?;
        info!("{generation}: {records} record(s) in {}", store.path().display());
    }

    let report = cache.close().context("failed to close cache")?;
    info!(
        young_size = report.young_size,
        limit = options.young_size_limit,
        rotated = report.rotated,
        "cache compacted"
    );

    Ok(())
}
