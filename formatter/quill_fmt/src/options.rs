//! Engine configuration.

use quill_ir::newlines;

/// Default maximum line width before groups break.
pub const MAX_LINE_WIDTH: usize = 100;

/// Configuration for a formatting invocation.
///
/// The engine is language-agnostic; everything style-specific beyond line
/// width and separators lives in the visitor and the comment rewriter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    /// Maximum line width before groups break.
    pub max_width: usize,
    /// Line separator used in rendered output and replacement text.
    pub line_separator: String,
    /// Multiplier applied by visitors when they build constant indents.
    pub indent_multiplier: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            max_width: MAX_LINE_WIDTH,
            line_separator: "\n".to_owned(),
            indent_multiplier: 1,
        }
    }
}

impl FormatOptions {
    /// Default options with the line separator guessed from `text`.
    pub fn guessed_from(text: &str) -> FormatOptions {
        FormatOptions {
            line_separator: newlines::guess_line_separator(text).to_owned(),
            ..FormatOptions::default()
        }
    }
}
