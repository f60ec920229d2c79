//! Positioned diagnostics and error aggregation.
//!
//! The engine never fails fast on the first internal-consistency problem: it
//! collects every [`Diagnostic`] it can attribute to an input position and
//! surfaces them together as one [`FormatError`], so a batch caller can
//! report every problem in a single pass.

use std::fmt;

use thiserror::Error;

/// A single problem attributed to a position in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// 0-based line, if the position is known.
    line: Option<usize>,
    /// 0-based column, if the position is known.
    column: Option<usize>,
    message: String,
}

impl Diagnostic {
    /// A diagnostic at a known 0-based line and column.
    pub fn at(line: usize, column: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            line: Some(line),
            column: Some(column),
            message: message.into(),
        }
    }

    /// A diagnostic with no usable position.
    pub fn message(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn text(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "{}:", line + 1)?;
            if let Some(column) = self.column {
                write!(f, "{}:", column + 1)?;
            }
            write!(f, " ")?;
        }
        write!(f, "error: {}", self.message)
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failure of a formatting invocation.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Internal-consistency failures: the op stream and the token model
    /// disagree. Carries every diagnostic collected before the abort.
    #[error("{}", join_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
}

impl FormatError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            FormatError::Diagnostics(diagnostics) => diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_is_one_based() {
        let d = Diagnostic::at(2, 4, "expected token: ';'");
        assert_eq!(d.to_string(), "3:5: error: expected token: ';'");
    }

    #[test]
    fn display_without_position() {
        let d = Diagnostic::message("unbalanced level");
        assert_eq!(d.to_string(), "error: unbalanced level");
    }

    #[test]
    fn error_joins_all_diagnostics() {
        let err = FormatError::Diagnostics(vec![
            Diagnostic::at(0, 0, "first"),
            Diagnostic::at(1, 2, "second"),
        ]);
        assert_eq!(err.to_string(), "1:1: error: first\n2:3: error: second");
        assert_eq!(err.diagnostics().len(), 2);
    }
}
