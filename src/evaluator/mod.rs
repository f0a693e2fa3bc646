//! The core mobench-evaluator functionality (i.e. excl. the more
//! general library files, and excl. the main driver program at
//! src/bin/mobench-evaluator.rs)

pub mod options;
pub mod pipeline;
