pub mod alignment;
pub mod bucket;
pub mod change;
pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod lookup;
pub mod period;

pub use engine::{ChartComparison, ChartRequest, ChartResponse, ComparisonRequest, Engine};
pub use errors::ChartEngineError;
