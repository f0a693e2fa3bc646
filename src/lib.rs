//! Aggregation, ranking and curve alignment of the quality metrics of
//! multi-objective solver runs.

pub mod aggregate;
pub mod bounds;
pub mod config_file;
pub mod evaluator;
pub mod experiment;
pub mod metric;
pub mod rank;
pub mod record_source;
pub mod sample;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod tables;
pub mod utillib;
