//! Response envelope returned to the API layer

use crate::error::Result;
use crate::insights::MetricInsights;
use crate::metrics::{MetricsEngine, PerformanceMetrics};
use crate::platform::PlatformData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub const NO_PLATFORM_DATA: &str = "No platform data available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub metrics: Option<PerformanceMetrics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<MetricInsights>,

    /// Copied from the stored payload; never produced by the engine
    pub last_sync: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MetricsResponse {
    pub fn empty() -> Self {
        MetricsResponse {
            metrics: None,
            insights: None,
            last_sync: None,
            message: Some(NO_PLATFORM_DATA.to_string()),
        }
    }

    /// Build the response for a stored platform document
    ///
    /// A missing, non-object or empty document yields no metrics and a
    /// message instead of an error.
    pub fn from_platform_json(
        engine: &MetricsEngine,
        document: &Value,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let object = match document.as_object() {
            Some(object) if !object.is_empty() => object,
            _ => {
                info!("{}", NO_PLATFORM_DATA);
                return Ok(Self::empty());
            }
        };

        let last_sync = object
            .get("lastSync")
            .and_then(Value::as_str)
            .map(str::to_string);

        let data = PlatformData::from_value(document.clone())?;
        let metrics = engine.compute_at(&data, now);
        let insights = MetricInsights::from_metrics(&metrics);

        Ok(MetricsResponse {
            metrics: Some(metrics),
            insights: Some(insights),
            last_sync,
            message: None,
        })
    }
}
