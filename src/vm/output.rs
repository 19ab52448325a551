//! Per-run message accumulation.

use std::fmt::Write;

/// Append-only buffer `MSG` writes into.
///
/// Scoped to one run; concatenation order follows `MSG` argument order with
/// no implicit delimiters. Finalized into the run's result only when `END`
/// executes.
#[derive(Debug, Default)]
pub(super) struct MessageBuffer {
    buffer: String,
}

impl MessageBuffer {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Appends literal text verbatim.
    pub(super) fn push_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Appends an integer in decimal.
    pub(super) fn push_int(&mut self, value: i64) {
        let _ = write!(self.buffer, "{value}");
    }

    /// Consumes the buffer into the final output string.
    pub(super) fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order_with_no_separators() {
        let mut output = MessageBuffer::new();
        output.push_text("(5!) = ");
        output.push_int(120);
        output.push_text("");
        output.push_int(-3);
        assert_eq!(output.finish(), "(5!) = 120-3");
    }
}
