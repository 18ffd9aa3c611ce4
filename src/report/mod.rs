//! # report
//! Shutdown report emitter. Walks the finding table once and writes a
//! human-readable line per entry to the configured destination. Free-text
//! output, not a wire format; the order is the table's iteration order and
//! is stable only within one run.
use core::fmt::Write as _;
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
};

use log::info;

use crate::findings::FindingMap;

#[derive(Debug, Default)]
pub struct Reporter {
    path: Option<PathBuf>,
}

impl Reporter {
    /// `path` overrides the default destination (standard error).
    pub fn new(path: Option<PathBuf>) -> Reporter {
        Reporter { path }
    }

    /// Emit the report. A quiet success when there is nothing to report.
    pub fn emit(&self, findings: &FindingMap) -> io::Result<()> {
        if findings.is_empty() {
            info!("no write-after-write instances found");
            return Ok(());
        }
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} write-after-write instances found:",
            findings.len()
        );
        let mut i = 0usize;
        findings.for_each(|addr, finding| {
            // first_pc stays unset when no read-then-write ever followed
            // the detection; report it as 0 like any other unknown PC.
            let first = finding.first_pc.unwrap_or(0);
            let _ = writeln!(
                text,
                " #{i}: write to {addr:#x} by {first:#x} and {:#x} {}x",
                finding.second_pc, finding.count
            );
            i += 1;
        });
        match &self.path {
            Some(path) => File::create(path)?.write_all(text.as_bytes()),
            None => io::stderr().lock().write_all(text.as_bytes()),
        }
    }
}
