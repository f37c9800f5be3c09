//! Delimited line building shared by both output files.

use std::fmt::{Display, Write};

/// Fixed-point, two decimals.
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// One output line. Every field, the last one included, is followed by the separator.
pub(crate) struct Line<'s> {
    buf: String,
    separator: &'s str,
}

impl<'s> Line<'s> {
    pub(crate) fn new(separator: &'s str) -> Self {
        Self {
            buf: String::new(),
            separator,
        }
    }

    /// Appends a raw field.
    pub(crate) fn field(&mut self, field: impl Display) -> &mut Self {
        // writing into a String cannot fail
        let _ = write!(self.buf, "{}{}", field, self.separator);
        self
    }

    /// Appends a numeric result.
    pub(crate) fn value(&mut self, value: f64) -> &mut Self {
        self.field(format_value(value))
    }

    /// Terminates the line.
    pub(crate) fn finish(mut self) -> String {
        self.buf.push('\n');
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3.00");
        assert_eq!(format_value(3.14159), "3.14");
        assert_eq!(format_value(1234567.891), "1234567.89");
        assert_eq!(format_value(-0.5), "-0.50");
    }

    #[test]
    fn test_trailing_separator() {
        let mut line = Line::new(";");
        line.field("timeStep").field("pop").value(2.0);
        assert_eq!(line.finish(), "timeStep;pop;2.00;\n");
    }

    #[test]
    fn test_value_uses_format_value() {
        let mut line = Line::new(",");
        line.value(2.345).value(-1.0 / 3.0);
        assert_eq!(
            line.finish(),
            format!("{},{},\n", format_value(2.345), format_value(-1.0 / 3.0))
        );
    }

    #[test]
    fn test_multi_char_separator() {
        let mut line = Line::new(" | ");
        line.field(0).value(1.5);
        assert_eq!(line.finish(), "0 | 1.50 | \n");
    }
}
