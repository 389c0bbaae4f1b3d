use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use token_radar_core::{BondingEvent, MonitorMetricsSnapshot};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorRunningState {
    Stopped,
    Running,
    Stopping,
}

impl MonitorRunningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorRunningState::Stopped => "stopped",
            MonitorRunningState::Running => "running",
            MonitorRunningState::Stopping => "stopping",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub state: MonitorRunningState,
    pub started_at: Option<DateTime<Utc>>,
    pub interval_secs: u64,
    pub metrics: MonitorMetricsSnapshot,
    pub failure_rate_percent: f64,
    /// Mints currently in the bonded snapshot
    pub known_bonded: usize,
    /// Tokens kept in the bonded token store
    pub stored_bonded: usize,
    /// Newest first
    pub recent_events: Vec<BondingEvent>,
}
