//! # options
//! The process-wide configuration string, read once from the environment
//! at initialization. The format is `:`-separated `key=value` pairs, e.g.
//! `SHADOWTRACK_OPTIONS=verbosity=2:mode=coverage`. Unrecognized or
//! malformed options are collected and reported when verbosity asks for
//! it; they never abort the process.
use std::path::PathBuf;

use crate::tracker::write::{DEFAULT_COUNTER_BITS, MAX_COUNTER_BITS};

pub const OPTIONS_ENV: &str = "SHADOWTRACK_OPTIONS";

/// Which access processor the runtime drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    WriteAfterWrite,
    Coverage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub verbosity: u8,
    pub help: bool,
    pub report_path: Option<PathBuf>,
    pub mode: Mode,
    pub counter_bits: u32,
    /// Options we did not understand, kept for reporting.
    pub unrecognized: Vec<String>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            verbosity: 0,
            help: false,
            report_path: None,
            mode: Mode::default(),
            counter_bits: DEFAULT_COUNTER_BITS,
            unrecognized: Vec::new(),
        }
    }
}

impl Options {
    pub fn parse(s: &str) -> Options {
        let mut options = Options::default();
        for part in s.split(':').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, "1"));
            match key {
                "verbosity" => match value.parse() {
                    Ok(v) => options.verbosity = v,
                    Err(_) => options.unrecognized.push(part.to_string()),
                },
                "help" => options.help = value == "1" || value == "true",
                "report_path" => options.report_path = Some(PathBuf::from(value)),
                "mode" => match value {
                    "waw" => options.mode = Mode::WriteAfterWrite,
                    "coverage" => options.mode = Mode::Coverage,
                    _ => options.unrecognized.push(part.to_string()),
                },
                "counter_bits" => match value.parse::<u32>() {
                    Ok(v) => options.counter_bits = v.clamp(1, MAX_COUNTER_BITS),
                    Err(_) => options.unrecognized.push(part.to_string()),
                },
                _ => options.unrecognized.push(part.to_string()),
            }
        }
        options
    }

    pub fn from_env() -> Options {
        match std::env::var(OPTIONS_ENV) {
            Ok(s) => Options::parse(&s),
            Err(_) => Options::default(),
        }
    }

    /// Verbosity mapped onto the log facade.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn usage() -> &'static str {
        "SHADOWTRACK_OPTIONS (colon-separated key=value pairs):\n\
         \tverbosity=N      diagnostic verbosity, 0 (default) to 3\n\
         \thelp=1           print this summary\n\
         \treport_path=F    write the shutdown report to F (default: stderr)\n\
         \tmode=M           waw (default) or coverage\n\
         \tcounter_bits=N   in-cell sampling counter width, 1 to 5\n"
    }
}
