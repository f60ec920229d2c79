//! Comment rewriting.
//!
//! The engine treats comment text as opaque: every comment leaf is passed
//! through a [`CommentRewriter`] as it is laid out, and whatever comes back
//! is emitted verbatim (embedded newlines included, which feed back into
//! column tracking). Style policy — whether `//` comments get a space after
//! the slashes, how block comments are re-indented — lives entirely in the
//! rewriter implementation, not in the engine.

use quill_ir::{newlines, Tok};

/// Rewrites comment toks for output.
pub trait CommentRewriter {
    /// Rewrite `tok` for emission at `column` under `max_width`. The result
    /// is ground truth: it may reflow or re-indent the comment, and its
    /// embedded newlines drive subsequent column tracking.
    fn rewrite(&self, tok: &Tok, max_width: usize, column: usize) -> String;
}

/// Emits every comment exactly as it appeared in the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughRewriter;

impl CommentRewriter for PassthroughRewriter {
    fn rewrite(&self, tok: &Tok, _max_width: usize, _column: usize) -> String {
        tok.original_text.clone()
    }
}

/// Re-indents multi-line block comments and tidies line comments.
///
/// Block comments whose continuation lines all carry a `*` prefix are
/// re-aligned under the current column; anything with an unrecognized shape
/// is left alone. Line comments lose trailing whitespace and, optionally,
/// gain a space after the slashes.
#[derive(Clone, Copy, Debug)]
pub struct ReindentRewriter {
    /// Insert a space in `//comment` style line comments.
    pub space_after_slashes: bool,
}

impl Default for ReindentRewriter {
    fn default() -> Self {
        ReindentRewriter {
            space_after_slashes: true,
        }
    }
}

impl ReindentRewriter {
    fn rewrite_line_comment(&self, text: &str) -> String {
        let text = text.trim_end();
        if self.space_after_slashes {
            let body = text.trim_start_matches('/');
            let slashes = text.len() - body.len();
            if !body.is_empty() && !body.starts_with(' ') {
                return format!("{} {}", &text[..slashes], body);
            }
        }
        text.to_owned()
    }

    fn rewrite_block_comment(text: &str, column: usize) -> Option<String> {
        let lines: Vec<&str> = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
        if lines.len() < 2 {
            return None;
        }
        // Every continuation line must be a `*` line for the shape to be
        // safely re-indented.
        if !lines[1..].iter().all(|l| l.trim_start().starts_with('*')) {
            return None;
        }
        let indent = " ".repeat(column);
        let mut out = String::with_capacity(text.len() + lines.len() * column);
        out.push_str(lines[0].trim_end());
        for line in &lines[1..] {
            out.push('\n');
            out.push_str(&indent);
            out.push(' ');
            out.push_str(line.trim());
        }
        Some(out)
    }
}

impl CommentRewriter for ReindentRewriter {
    fn rewrite(&self, tok: &Tok, _max_width: usize, column: usize) -> String {
        let text = &tok.original_text;
        if tok.is_line_comment() {
            return self.rewrite_line_comment(text);
        }
        if tok.is_block_comment() && newlines::contains_breaks(text) {
            if let Some(rewritten) = Self::rewrite_block_comment(text, column) {
                return rewritten;
            }
        }
        text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_ir::TokKind;

    fn comment(kind: TokKind, text: &str) -> Tok {
        Tok::new(kind, Some(0), 0, 0, text)
    }

    #[test]
    fn passthrough_is_identity() {
        let tok = comment(TokKind::LineComment, "//x  ");
        assert_eq!(PassthroughRewriter.rewrite(&tok, 100, 0), "//x  ");
    }

    #[test]
    fn line_comment_gains_space_and_loses_trailing_blanks() {
        let tok = comment(TokKind::LineComment, "//x  ");
        let rewriter = ReindentRewriter::default();
        assert_eq!(rewriter.rewrite(&tok, 100, 0), "// x");
    }

    #[test]
    fn line_comment_without_body_unchanged() {
        let tok = comment(TokKind::LineComment, "//");
        let rewriter = ReindentRewriter::default();
        assert_eq!(rewriter.rewrite(&tok, 100, 0), "//");
    }

    #[test]
    fn block_comment_reindents_under_column() {
        let tok = comment(TokKind::BlockComment, "/*\n      * one\n * two\n */");
        let rewriter = ReindentRewriter::default();
        assert_eq!(rewriter.rewrite(&tok, 100, 4), "/*\n     * one\n     * two\n     */");
    }

    #[test]
    fn irregular_block_comment_left_alone() {
        let tok = comment(TokKind::BlockComment, "/* a\n   b */");
        let rewriter = ReindentRewriter::default();
        assert_eq!(rewriter.rewrite(&tok, 100, 4), "/* a\n   b */");
    }

    #[test]
    fn single_line_block_comment_left_alone() {
        let tok = comment(TokKind::BlockComment, "/* one */");
        let rewriter = ReindentRewriter::default();
        assert_eq!(rewriter.rewrite(&tok, 100, 8), "/* one */");
    }
}
