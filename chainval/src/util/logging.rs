//! Diagnostic output routing
//!
//! Validation emits user-facing diagnostic lines in two modes. In list mode
//! the lines are bracketed and written to a caller supplied sink, so that a
//! certificate listing can interleave them with its own output. Outside list
//! mode they go through the `log` facade at info or error level.

use std::io::Write;

use log::{error, info};

/// Sink for user-facing diagnostic lines produced during validation.
pub struct DiagnosticOutput<'a> {
    list_mode: bool,
    sink: Option<&'a mut dyn Write>,
}

impl<'a> DiagnosticOutput<'a> {
    /// Creates a sink. `sink` is only consulted in list mode.
    pub fn new(list_mode: bool, sink: Option<&'a mut dyn Write>) -> Self {
        DiagnosticOutput { list_mode, sink }
    }

    /// Returns true when operating in list mode.
    pub fn list_mode(&self) -> bool {
        self.list_mode
    }

    /// Emits one diagnostic line. Errors writing to the sink are ignored;
    /// diagnostics must never abort validation.
    pub fn emit(&mut self, is_error: bool, message: &str) {
        if self.list_mode {
            if let Some(fp) = self.sink.as_mut() {
                let _ = writeln!(fp, "  [{}]", message);
            }
        } else if is_error {
            error!("{}", message);
        } else {
            info!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_mode_brackets_lines() {
        let mut buf = Vec::new();
        let mut diag = DiagnosticOutput::new(true, Some(&mut buf));
        diag.emit(true, "certificate has expired");
        diag.emit(false, "issuer certificate not found");
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            "  [certificate has expired]\n  [issuer certificate not found]\n",
            out
        );
    }

    #[test]
    fn log_mode_needs_no_sink() {
        let mut diag = DiagnosticOutput::new(false, None);
        diag.emit(false, "goes to the log");
        assert!(!diag.list_mode());
    }
}
