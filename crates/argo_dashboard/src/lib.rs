//! Argo Dashboard
//!
//! Driver earnings dashboard built on `argo_core`: per-platform gross
//! earnings and a fuel calculator feed a net-earnings summary.
//!
//! - [`config`]: `argo.toml` loading
//! - [`state`]: state tree shape and the results calculation
//! - [`widgets`]: stat cards and numeric input fields
//! - [`app`]: assembles the widgets into a dashboard

pub mod app;
pub mod config;
pub mod state;
pub mod widgets;

pub use app::Dashboard;
pub use config::DashboardConfig;
pub use state::{FuelInput, Results};
