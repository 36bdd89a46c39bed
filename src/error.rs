use thiserror::Error;

use crate::drilldown::Stage;

/// Recoverable errors raised by the dashboard core
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no snapshot loaded yet")]
    NoSnapshot,

    #[error("unknown KPI '{0}'")]
    UnknownKpi(String),

    #[error("unknown organizational unit '{0}'")]
    UnknownUnit(String),

    #[error("no drill-down is open")]
    DrilldownClosed,

    #[error("cannot {action} while in {stage:?}")]
    InvalidTransition { action: &'static str, stage: Stage },

    #[error("failed to load dashboard data: {0}")]
    Fetch(String),

    #[error("recent searches store error: {0}")]
    Store(String),
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
