//! Raw lexical units ("toks") and the language tokens that own them.
//!
//! A [`Tok`] is a token, a comment, a newline, or a maximal run of blanks.
//! Tokens and comments are numbered with monotonically increasing indices;
//! plain whitespace is not. Every non-token tok is attached to exactly one
//! [`Token`]: toks on the same line as a preceding token trail it, everything
//! else leads the next token, and a final end-of-input token holds whatever
//! trails the last real token.

/// Classification of a [`Tok`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokKind {
    /// A language-level token.
    Token,
    /// A maximal run of blanks (no line breaks).
    Whitespace,
    /// A single line terminator.
    Newline,
    /// A comment that runs to the end of the line.
    LineComment,
    /// A delimited comment.
    BlockComment,
    /// A delimited documentation comment. Never glued to following code.
    DocComment,
}

/// A raw lexical unit with its position in the original text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tok {
    /// Monotonic index; `None` for plain whitespace and newlines that are
    /// not numbered.
    pub index: Option<usize>,
    /// Byte offset in the original text.
    pub position: usize,
    /// 0-based column of the first character.
    pub column: usize,
    /// The processed text (escapes resolved, where the lexer does that).
    pub text: String,
    /// The exact original text.
    pub original_text: String,
    pub kind: TokKind,
}

impl Tok {
    /// A tok whose processed text equals its original text.
    pub fn new(
        kind: TokKind,
        index: Option<usize>,
        position: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Tok {
        let text = text.into();
        Tok {
            index,
            position,
            column,
            original_text: text.clone(),
            text,
            kind,
        }
    }

    /// Byte length of the original text.
    pub fn len(&self) -> usize {
        self.original_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_text.is_empty()
    }

    pub fn is_newline(&self) -> bool {
        self.kind == TokKind::Newline
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TokKind::LineComment | TokKind::BlockComment | TokKind::DocComment
        )
    }

    pub fn is_line_comment(&self) -> bool {
        self.kind == TokKind::LineComment
    }

    /// Is this a delimited comment (documentation comments included)?
    pub fn is_block_comment(&self) -> bool {
        matches!(self.kind, TokKind::BlockComment | TokKind::DocComment)
    }

    pub fn is_doc_comment(&self) -> bool {
        self.kind == TokKind::DocComment
    }
}

/// Which attached tok of a [`Token`] a reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokSlot {
    /// `toks_before[i]`.
    Before(usize),
    /// The token's own tok.
    Own,
    /// `toks_after[i]`.
    After(usize),
}

/// A language-level token plus the non-token toks attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The token's own tok; always `TokKind::Token` with a numbered index.
    pub tok: Tok,
    /// Attached toks that precede the token, in original order.
    pub toks_before: Vec<Tok>,
    /// Attached toks that follow the token, in original order.
    pub toks_after: Vec<Tok>,
}

impl Token {
    pub fn new(tok: Tok, toks_before: Vec<Tok>, toks_after: Vec<Tok>) -> Token {
        Token {
            tok,
            toks_before,
            toks_after,
        }
    }

    /// The first numbered tok of this token, counting leading comments.
    pub fn start_tok(&self) -> &Tok {
        self.toks_before
            .iter()
            .find(|tok| tok.index.is_some())
            .unwrap_or(&self.tok)
    }

    /// The last numbered tok of this token, counting trailing comments.
    pub fn end_tok(&self) -> &Tok {
        self.toks_after
            .iter()
            .rev()
            .find(|tok| tok.index.is_some())
            .unwrap_or(&self.tok)
    }

    /// The tok in `slot`, if it exists.
    pub fn tok_in_slot(&self, slot: TokSlot) -> Option<&Tok> {
        match slot {
            TokSlot::Before(i) => self.toks_before.get(i),
            TokSlot::Own => Some(&self.tok),
            TokSlot::After(i) => self.toks_after.get(i),
        }
    }

    /// The byte span of the token including attached comments.
    pub fn span_with_comments(&self) -> (usize, usize) {
        let mut start = self.tok.position;
        for tok in &self.toks_before {
            if tok.is_comment() {
                start = start.min(tok.position);
            }
        }
        let mut end = self.tok.position + self.tok.len();
        for tok in &self.toks_after {
            if tok.is_comment() {
                end = end.max(tok.position + tok.len());
            }
        }
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokKind, index: Option<usize>, position: usize, text: &str) -> Tok {
        Tok::new(kind, index, position, 0, text)
    }

    #[test]
    fn classification() {
        assert!(tok(TokKind::Newline, None, 0, "\n").is_newline());
        assert!(tok(TokKind::LineComment, Some(0), 0, "// c").is_comment());
        assert!(tok(TokKind::DocComment, Some(0), 0, "/** d */").is_block_comment());
        assert!(!tok(TokKind::Whitespace, None, 0, "  ").is_comment());
    }

    #[test]
    fn start_tok_prefers_leading_comment() {
        let token = Token::new(
            tok(TokKind::Token, Some(1), 10, "x"),
            vec![
                tok(TokKind::Whitespace, None, 4, "  "),
                tok(TokKind::LineComment, Some(0), 6, "// c"),
            ],
            vec![],
        );
        assert_eq!(token.start_tok().index, Some(0));
    }

    #[test]
    fn end_tok_prefers_trailing_comment() {
        let token = Token::new(
            tok(TokKind::Token, Some(0), 0, "x"),
            vec![],
            vec![
                tok(TokKind::Whitespace, None, 1, " "),
                tok(TokKind::BlockComment, Some(1), 2, "/* t */"),
                tok(TokKind::Newline, None, 9, "\n"),
            ],
        );
        assert_eq!(token.end_tok().index, Some(1));
    }

    #[test]
    fn span_covers_attached_comments() {
        let token = Token::new(
            tok(TokKind::Token, Some(1), 10, "xy"),
            vec![tok(TokKind::LineComment, Some(0), 2, "// lead")],
            vec![tok(TokKind::BlockComment, Some(2), 13, "/* t */")],
        );
        assert_eq!(token.span_with_comments(), (2, 20));
    }
}
