//! Last-mile operations dashboard core
//!
//! KPI ranking, region/branch scoping, live update simulation, search and
//! drill-down navigation over an in-memory metrics snapshot.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod demo_data;
pub mod display;
pub mod drilldown;
pub mod error;
pub mod kpi_catalog;
pub mod models;
pub mod ranking;
pub mod scope;
pub mod search;
pub mod simulator;
pub mod source;
pub mod store;
