//! Leveled logging to stderr. Each line is prefixed with a local
//! timestamp and the source location of the log statement.

use std::{
    io::{stderr, StderrLock, Write},
    sync::atomic::{AtomicU8, Ordering},
};

use anyhow::{bail, Result};
use chrono::{Local, SecondsFormat};

pub fn write_prefix(file: &str, line: u32) -> StderrLock<'static> {
    let t_str = Local::now().to_rfc3339_opts(SecondsFormat::Millis, false);
    let mut lock = stderr().lock();
    write!(&mut lock, "{t_str}\t{file}:{line}\t").expect("stderr must not fail");
    lock
}

#[macro_export]
macro_rules! info_if {
    { $verbose:expr, $($arg:tt)* } => {
        if $verbose {
            use std::io::Write;
            let mut lock = $crate::utillib::logging::write_prefix(file!(), line!());
            writeln!(&mut lock, $($arg)*).expect("stderr must not fail");
        }
    }
}

// Fields are private to force going through `TryFrom`.
#[derive(Debug, clap::Args)]
pub struct LogLevelOpt {
    /// Show what is being done
    #[clap(short, long)]
    verbose: bool,

    /// Show information that helps debug this program (implies
    /// `--verbose`)
    #[clap(short, long)]
    debug: bool,

    /// Do not even show warnings (e.g. about skipped records or
    /// outputs that could not be computed). Conflicts with
    /// `--verbose` and `--debug`.
    #[clap(short, long)]
    quiet: bool,
}

impl TryFrom<LogLevelOpt> for LogLevel {
    type Error = anyhow::Error;

    fn try_from(value: LogLevelOpt) -> Result<Self> {
        let LogLevelOpt {
            verbose,
            debug,
            quiet,
        } = value;
        match (verbose, debug, quiet) {
            (false, false, false) => Ok(LogLevel::Warn),
            (true, false, false) => Ok(LogLevel::Info),
            (_, true, false) => Ok(LogLevel::Debug),
            (false, false, true) => Ok(LogLevel::Quiet),
            (_, _, true) => {
                bail!("option `--quiet` conflicts with the options `--verbose` and `--debug`")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Do not log anything
    Quiet,
    /// The default: rejected records and failed outputs are reported
    Warn,
    /// What is being read and written
    Info,
    /// Details for debugging this program, e.g. every skipped file
    Debug,
}

impl LogLevel {
    fn level(self) -> u8 {
        self as u8
    }

    fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(LogLevel::Quiet),
            1 => Some(LogLevel::Warn),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

static LOGLEVEL: AtomicU8 = AtomicU8::new(1);

pub fn set_log_level(val: LogLevel) {
    LOGLEVEL.store(val.level(), Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    let level = LOGLEVEL.load(Ordering::Relaxed);
    LogLevel::from_level(level).expect("only valid levels are ever stored")
}

#[macro_export]
macro_rules! warn {
    { $($arg:tt)* } => {
        $crate::info_if!(
            $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Warn,
            $($arg)*
        )
    }
}

#[macro_export]
macro_rules! info {
    { $($arg:tt)* } => {
        $crate::info_if!(
            $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Info,
            $($arg)*
        )
    }
}

#[macro_export]
macro_rules! debug {
    { $($arg:tt)* } => {
        $crate::info_if!(
            $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Debug,
            $($arg)*
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_levels_round_trip() {
        for level in [
            LogLevel::Quiet,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
        ] {
            assert_eq!(LogLevel::from_level(level.level()), Some(level));
        }
        assert_eq!(LogLevel::from_level(4), None);
        assert!(LogLevel::Debug > LogLevel::Warn);
    }

    #[test]
    fn t_quiet_conflicts() {
        let opt = LogLevelOpt {
            verbose: true,
            debug: false,
            quiet: true,
        };
        assert!(LogLevel::try_from(opt).is_err());
        let opt = LogLevelOpt {
            verbose: true,
            debug: true,
            quiet: false,
        };
        assert_eq!(LogLevel::try_from(opt).unwrap(), LogLevel::Debug);
    }
}
