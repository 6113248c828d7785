//! Filter, aggregate and shape a country-level cardiovascular health dataset
//! for an interactive dashboard.

pub mod chart;
pub mod color;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod pipeline;

pub use chart::{ChartKind, RenderStatus, Renderable};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, Interaction, ViewState};
pub use error::{DashError, Result};
pub use pipeline::ChartRequest;
