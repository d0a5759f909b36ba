// Library interface for Blister's training-load core
// The binary and integration tests go through these modules

pub mod config;
pub mod dedup;
pub mod error;
pub mod insights;
pub mod load;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod platform;
pub mod readiness;
pub mod report;
pub mod trend;
pub mod whoop_analysis;

// Re-export commonly used types for convenience
pub use models::*;
pub use dedup::{deduplicate, DedupKey};
pub use metrics::{compute_metrics, MetricsConfig, MetricsEngine, PerformanceMetrics};
pub use platform::{Platform, PlatformData};
pub use report::MetricsResponse;
pub use trend::{average, trend, DataPoint, Trend};
pub use whoop_analysis::{analyze_whoop, WhoopAnalysis};
pub use error::{BlisterError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
