//! Decode, filter and aggregate a coded healthcare survey dataset.
//!
//! The crate is the data layer behind a survey dashboard: it loads the raw
//! survey file once, exposes the values that populate the dashboard's
//! filter controls, and turns a filter selection into the grouped tables
//! the charts are drawn from. Rendering is left to the caller.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::Settings;
pub use data::aggregate::{aggregate, AggregateRequest, AggregatedView};
pub use data::filter::{apply, FilterSpec};
pub use data::loader::load;
pub use data::model::{CellValue, Dataset, Record};
pub use data::options::{discover, FilterOptions};
pub use error::{ConfigError, DataLoadError, EngineError};
pub use state::{ChartKind, ChartResponse, ChartSelection, DashboardState};
