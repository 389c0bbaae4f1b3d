// Token Radar Core Library
// Fetch, classify and shape pump.fun tokens by bonding-curve progress

pub mod models;
pub mod error;
pub mod settings;
pub mod classifier;
pub mod dedup;
pub mod transform;
pub mod cache;
pub mod limiter;
pub mod source;
pub mod storage_trait;
pub mod snapshot;
pub mod store;
pub mod metrics;
pub mod pipeline;

#[cfg(feature = "native")]
pub mod native;

// Re-exports
pub use error::CoreError;
pub use models::*;
pub use settings::Settings;
pub use classifier::{bonding_percentage, classify, classify_all, classify_record};
pub use dedup::{merge_and_sort, merge_unique, sort_tokens, SortKey};
pub use transform::{format_date, format_market_cap, to_display, to_display_all};
pub use limiter::{CircuitBreaker, CircuitState, GateStatus, RequestGate};
pub use source::*;
pub use storage_trait::*;
pub use snapshot::BondedSnapshot;
pub use store::{StoredToken, TokenStore};
pub use metrics::{MonitorMetrics, MonitorMetricsSnapshot};
pub use pipeline::{BondedQuery, TokenDetail, TokenPipeline};
