//! Various utilities

pub mod get_terminal_width;
pub mod logging;
pub mod tempfile_utils;
