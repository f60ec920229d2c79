//! The token model consumed by the formatting engine.
//!
//! An external lexer builds a [`TokenModel`] from source text: every byte of
//! the input is covered by exactly one tok, toks are grouped under language
//! tokens, and the token list ends with an end-of-input token (empty text,
//! numbered tok) that owns any trailing comments and whitespace. The engine
//! only ever reads the model; it never mutates it, so one model can serve a
//! formatting invocation end to end.

use crate::lines::LineMaps;
use crate::newlines;
use crate::range::TokRange;
use crate::tok::{Tok, TokSlot, Token};

/// An immutable view of the lexed input.
#[derive(Debug)]
pub struct TokenModel {
    text: String,
    tokens: Vec<Token>,
    tok_count: usize,
    lines: Vec<String>,
    line_starts: Vec<usize>,
    line_maps: LineMaps,
    /// Owning token (index into `tokens`) for each numbered tok.
    tok_to_token: Vec<usize>,
    /// Slot within the owning token for each numbered tok.
    tok_slots: Vec<TokSlot>,
}

impl TokenModel {
    /// Build a model from the original text and its token list.
    ///
    /// The token list must cover the text in order; the number of numbered
    /// toks and the per-line maps are derived here once.
    pub fn new(text: impl Into<String>, tokens: Vec<Token>) -> TokenModel {
        let text = text.into();
        let mut tok_count = 0;
        for token in &tokens {
            for tok in token
                .toks_before
                .iter()
                .chain([&token.tok])
                .chain(token.toks_after.iter())
            {
                if let Some(k) = tok.index {
                    tok_count = tok_count.max(k + 1);
                }
            }
        }
        let mut tok_to_token = vec![0; tok_count];
        let mut tok_slots = vec![TokSlot::Own; tok_count];
        for (i, token) in tokens.iter().enumerate() {
            for (bi, tok) in token.toks_before.iter().enumerate() {
                if let Some(k) = tok.index {
                    tok_to_token[k] = i;
                    tok_slots[k] = TokSlot::Before(bi);
                }
            }
            if let Some(k) = token.tok.index {
                tok_to_token[k] = i;
                tok_slots[k] = TokSlot::Own;
            }
            for (ai, tok) in token.toks_after.iter().enumerate() {
                if let Some(k) = tok.index {
                    tok_to_token[k] = i;
                    tok_slots[k] = TokSlot::After(ai);
                }
            }
        }
        let line_maps = LineMaps::compute(tokens.iter().flat_map(|token| {
            token
                .toks_before
                .iter()
                .chain([&token.tok])
                .chain(token.toks_after.iter())
        }));
        let lines = newlines::split_lines(&text)
            .into_iter()
            .map(str::to_owned)
            .collect();
        let line_starts = newlines::line_starts(&text);
        TokenModel {
            text,
            tokens,
            tok_count,
            lines,
            line_starts,
            line_maps,
            tok_to_token,
            tok_slots,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The number of numbered toks (tokens and comments).
    pub fn tok_count(&self) -> usize {
        self.tok_count
    }

    /// The token owning the numbered tok `k`.
    pub fn token_at_tok(&self, k: usize) -> Option<&Token> {
        self.tok_to_token.get(k).map(|&i| &self.tokens[i])
    }

    /// The numbered tok `k` itself.
    pub fn tok(&self, k: usize) -> Option<&Tok> {
        let token = self.token_at_tok(k)?;
        token.tok_in_slot(*self.tok_slots.get(k)?)
    }

    /// The token whose own text covers the byte `position`, if any.
    pub fn token_covering(&self, position: usize) -> Option<&Token> {
        let idx = self
            .tokens
            .partition_point(|token| token.tok.position <= position);
        let token = &self.tokens[idx.checked_sub(1)?];
        (position < token.tok.position + token.tok.len().max(1)).then_some(token)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line `i` without its terminator; empty for out-of-range lines.
    pub fn line(&self, i: usize) -> &str {
        self.lines.get(i).map_or("", String::as_str)
    }

    /// The input-side per-line tok maps.
    pub fn line_maps(&self) -> &LineMaps {
        &self.line_maps
    }

    /// 0-based line number of a byte offset.
    pub fn line_number(&self, position: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= position)
            .saturating_sub(1)
    }

    /// 0-based column of a byte offset.
    pub fn column_number(&self, position: usize) -> usize {
        position - self.line_starts[self.line_number(position)]
    }

    /// Map a character range to the range of tok indices whose tokens it
    /// touches (attached comments count as part of their token).
    ///
    /// Out-of-bounds ranges are clamped. A zero-length range selects
    /// whatever lies under the cursor. Ranges covering no token map to the
    /// empty range.
    pub fn character_range_to_tok_range(&self, offset: usize, length: usize) -> TokRange {
        let offset = offset.min(self.text.len());
        let length = if length == 0 { 1 } else { length };
        let end = offset.saturating_add(length).min(self.text.len());
        if offset >= end {
            return TokRange::EMPTY;
        }
        let mut first = None;
        let mut last = None;
        for token in &self.tokens {
            let (span_start, span_end) = token.span_with_comments();
            if span_start >= end {
                break;
            }
            // Zero-length spans (the end-of-input token) never intersect.
            if span_end > offset && span_start < end {
                let k = token.tok.index;
                if first.is_none() {
                    first = k;
                }
                if k.is_some() {
                    last = k;
                }
            }
        }
        match (first, last) {
            (Some(lo), Some(hi)) => TokRange::new(lo, hi + 1),
            _ => TokRange::EMPTY,
        }
    }
}
