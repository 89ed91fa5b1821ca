use async_trait::async_trait;
use domains::{GeoResolver, GeolocationInfo, RssGenerator};

/// For deployments without a feed; only logs the trigger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRssGenerator;

#[async_trait]
impl RssGenerator for NoopRssGenerator {
    async fn regenerate(&self, board: &str) -> anyhow::Result<()> {
        tracing::trace!(board, "rss regeneration skipped");
        Ok(())
    }
}

/// Resolves every address to an empty location.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownLocation;

impl GeoResolver for UnknownLocation {
    fn resolve(&self, _ip: &str) -> GeolocationInfo {
        GeolocationInfo::default()
    }
}
