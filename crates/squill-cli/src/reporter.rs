//! Streaming per-file reporter.
//!
//! Implements the core `Formatter` trait so results print as they become
//! available rather than at the end of the run. The runner guarantees
//! dispatch happens on the controller thread only.

use crate::output::format_file_block;
use squill_core::{FileLintResult, Formatter};
use std::io::Write;

pub struct CliReporter {
    colored: bool,
    quiet: bool,
}

impl CliReporter {
    pub fn new(colored: bool, quiet: bool) -> Self {
        Self { colored, quiet }
    }
}

impl Formatter for CliReporter {
    fn dispatch_file_violations(&self, _path: &str, result: &FileLintResult, only_fixable: bool) {
        if self.quiet && !result.has_violations() {
            return;
        }
        if only_fixable && !result.has_violations() {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(format_file_block(result, self.colored).as_bytes());
        let _ = stdout.flush();
    }
}
