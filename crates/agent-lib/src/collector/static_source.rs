//! Direct provider reads

use super::{MetricSource, MetricsProvider};
use crate::error::CollectionError;
use crate::models::MetricSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Source returning the provider's reading unchanged
pub struct StaticSource {
    provider: Arc<dyn MetricsProvider>,
}

impl StaticSource {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl MetricSource for StaticSource {
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
        match self.provider.collect().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                debug!(error = %e, "Provider read failed");
                Err(CollectionError::SourceUnavailable(format!("{:#}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
