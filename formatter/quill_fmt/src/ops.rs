//! Op-stream assembly.
//!
//! The external visitor walks its syntax tree and emits a linear sequence of
//! [`Op`]s through an [`OpsBuilder`]: open/close level markers, tokens,
//! spaces and optional breaks. The builder follows along the token model as
//! tokens are emitted, and `build` then rewrites the stream so that every
//! comment and required blank line appears as an explicit verbatim/break
//! pair in the right place. Tokens the visitor failed to emit are flushed
//! with their surrounding text copied verbatim, so the engine never silently
//! drops input.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use quill_diagnostic::{Diagnostic, FormatError};
use quill_ir::{Tok, TokSlot, TokenModel};

use crate::indent::{BreakOutcomes, BreakTag, Indent, TagAllocator};

/// How breaks within one level cooperate when the level does not fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
    /// If the level will not fit on one line, all of its unified breaks
    /// fire together.
    Unified,
    /// Breaks fire independently of each other, filling each line with as
    /// many items as fit.
    Independent,
    /// Always fires; a level containing one can never fit on one line.
    Forced,
}

/// One formatting instruction.
#[derive(Clone, Debug)]
pub enum Op {
    /// Open a nested level with extra indent for its broken form.
    OpenLevel { plus_indent: Indent },
    /// Close the innermost open level.
    CloseLevel,
    /// A language token, by index into the token model.
    Token {
        token: usize,
        /// Did this op match an input token (`true`), or was it flushed at
        /// drain time for a token the visitor never generated (`false`)?
        real: bool,
        /// Extra indent for comments hoisted before this token.
        plus_indent_comments_before: Indent,
        /// If set, trailing block comments break onto their own line with
        /// this extra indent.
        break_and_indent_trailing_comment: Option<Indent>,
    },
    /// A single non-breaking space.
    Space,
    /// An optional line break.
    Break {
        fill_mode: FillMode,
        /// Rendering when the break does not fire.
        flat: String,
        /// Extra indent when it does.
        plus_indent: Indent,
        /// Optional tag recording whether it fired.
        tag: Option<BreakTag>,
    },
    /// A non-token tok (comment, or literal text for imaginary tokens),
    /// identified by its owning token and slot.
    Verbatim { token: usize, slot: TokSlot },
}

fn forced_break() -> Op {
    Op::Break {
        fill_mode: FillMode::Forced,
        flat: String::new(),
        plus_indent: Indent::ZERO,
        tag: None,
    }
}

fn is_forced_break(op: &Op) -> bool {
    matches!(
        op,
        Op::Break {
            fill_mode: FillMode::Forced,
            ..
        }
    )
}

/// A request to force, suppress or preserve a blank line at a token.
#[derive(Clone, Debug)]
pub enum BlankLineWanted {
    /// Always emit a blank line.
    Yes,
    /// Never emit a blank line.
    No,
    /// Keep whatever the input had. Overrides conditional requests.
    Preserve,
    /// Emit a blank line iff one of the tagged breaks fired.
    Conditional(SmallVec<[BreakTag; 2]>),
}

impl BlankLineWanted {
    /// A request conditional on a single break.
    pub fn conditional(tag: BreakTag) -> BlankLineWanted {
        BlankLineWanted::Conditional(SmallVec::from_slice(&[tag]))
    }

    /// Resolve against recorded break outcomes. `None` means "no opinion":
    /// the sink falls back to what the input had.
    pub fn wanted(&self, outcomes: &BreakOutcomes) -> Option<bool> {
        match self {
            BlankLineWanted::Yes => Some(true),
            BlankLineWanted::No => Some(false),
            BlankLineWanted::Preserve => None,
            BlankLineWanted::Conditional(tags) => tags
                .iter()
                .any(|tag| outcomes.was_taken(*tag))
                .then_some(true),
        }
    }

    /// Merge with a later request at the same token. A simple request wins
    /// over anything that follows it; conditional requests pool their tags.
    pub fn merge(self, other: BlankLineWanted) -> BlankLineWanted {
        match (self, other) {
            (BlankLineWanted::Conditional(mut tags), BlankLineWanted::Conditional(more)) => {
                tags.extend(more);
                BlankLineWanted::Conditional(tags)
            }
            (BlankLineWanted::Conditional(_), other) => other,
            (simple, _) => simple,
        }
    }
}

/// The corrected op stream plus everything the write pass needs alongside
/// it: blank-line requests, partial-format boundaries, and the number of
/// allocated break tags.
#[derive(Debug)]
pub struct OpStream {
    pub(crate) ops: Vec<Op>,
    pub(crate) blank_lines: FxHashMap<usize, BlankLineWanted>,
    /// Closed tok-index ranges at which partial reformatting may start or
    /// stop, in ascending order.
    pub(crate) boundaries: Vec<(usize, usize)>,
    pub(crate) tag_count: usize,
}

impl OpStream {
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn boundaries(&self) -> &[(usize, usize)] {
        &self.boundaries
    }
}

/// Builds the op stream for one formatting invocation.
pub struct OpsBuilder<'a> {
    input: &'a TokenModel,
    ops: Vec<Op>,
    /// Next input token to be matched.
    token_i: usize,
    /// High-water mark of visited input positions.
    input_position: usize,
    /// Unclosed open levels in the stream so far.
    depth: usize,
    tags: TagAllocator,
    diagnostics: Vec<Diagnostic>,
    blank_lines: FxHashMap<usize, BlankLineWanted>,
    boundaries: Vec<(usize, usize)>,
    last_boundary: Option<usize>,
}

impl<'a> OpsBuilder<'a> {
    pub fn new(input: &'a TokenModel) -> OpsBuilder<'a> {
        OpsBuilder {
            input,
            ops: Vec::new(),
            token_i: 0,
            input_position: 0,
            depth: 0,
            tags: TagAllocator::new(),
            diagnostics: Vec::new(),
            blank_lines: FxHashMap::default(),
            boundaries: Vec::new(),
            last_boundary: None,
        }
    }

    pub fn input(&self) -> &'a TokenModel {
        self.input
    }

    /// Allocate a tag for correlating a break with conditional indents.
    pub fn break_tag(&mut self) -> BreakTag {
        self.tags.fresh()
    }

    fn diagnostic(&self, message: String) -> Diagnostic {
        let line = self.input.line_number(self.input_position.min(self.input.text().len()));
        let column = self
            .input
            .column_number(self.input_position.min(self.input.text().len()));
        Diagnostic::at(line, column, message)
    }

    fn add(&mut self, op: Op) {
        match op {
            Op::OpenLevel { .. } => self.depth += 1,
            Op::CloseLevel => {
                if self.depth == 0 {
                    self.diagnostics
                        .push(self.diagnostic("close without matching open".to_owned()));
                    return;
                }
                self.depth -= 1;
            }
            _ => {}
        }
        self.ops.push(op);
    }

    /// Open a nested level with extra indent for its broken form.
    pub fn open(&mut self, plus_indent: Indent) {
        self.add(Op::OpenLevel { plus_indent });
    }

    /// Close the innermost open level.
    pub fn close(&mut self) {
        self.add(Op::CloseLevel);
    }

    /// The original text of the next unconsumed input token, if any.
    pub fn peek_token(&self) -> Option<&str> {
        self.peek_token_skip(0)
    }

    /// The original text of an upcoming input token, if any.
    pub fn peek_token_skip(&self, skip: usize) -> Option<&str> {
        self.input
            .tokens()
            .get(self.token_i + skip)
            .map(|token| token.tok.original_text.as_str())
    }

    /// Emit a token that must exist in the input.
    pub fn token(&mut self, text: &str) {
        self.token_with(text, Indent::ZERO, None);
    }

    /// Emit a token with comment-indent controls.
    pub fn token_with(
        &mut self,
        text: &str,
        plus_indent_comments_before: Indent,
        break_and_indent_trailing_comment: Option<Indent>,
    ) {
        if self.peek_token() == Some(text) {
            let token = self.token_i;
            self.token_i += 1;
            self.add(Op::Token {
                token,
                real: true,
                plus_indent_comments_before,
                break_and_indent_trailing_comment,
            });
        } else {
            let found = self.peek_token().unwrap_or("<end of input>").to_owned();
            self.diagnostics.push(self.diagnostic(format!(
                "expected token: '{found}'; generated '{text}' instead"
            )));
        }
    }

    /// Emit a token the syntax tree may have lost; silently dropped if the
    /// input does not have it next.
    pub fn guess_token(&mut self, text: &str) {
        if self.peek_token() == Some(text) {
            self.token(text);
        }
    }

    /// Emit a multi-character operator as single-character tokens, matching
    /// a lexer that splits all operators.
    pub fn op(&mut self, text: &str) {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.token(ch.encode_utf8(&mut buf));
        }
    }

    /// Emit a single non-breaking space.
    pub fn space(&mut self) {
        self.add(Op::Space);
    }

    /// Emit a unified break with empty flat text.
    pub fn break_op(&mut self) {
        self.break_with(FillMode::Unified, "", Indent::ZERO, None);
    }

    /// Emit an independent (fill) break.
    pub fn break_to_fill(&mut self, flat: &str) {
        self.break_with(FillMode::Independent, flat, Indent::ZERO, None);
    }

    /// Emit a break that always fires.
    pub fn forced_break(&mut self) {
        self.break_with(FillMode::Forced, "", Indent::ZERO, None);
    }

    /// Emit a break with full control over its behavior.
    pub fn break_with(
        &mut self,
        fill_mode: FillMode,
        flat: &str,
        plus_indent: Indent,
        tag: Option<BreakTag>,
    ) {
        self.add(Op::Break {
            fill_mode,
            flat: flat.to_owned(),
            plus_indent,
            tag,
        });
    }

    /// Force or suppress a blank line before the next token.
    pub fn blank_line(&mut self, wanted: BlankLineWanted) {
        let Some(token) = self.input.tokens().get(self.token_i) else {
            return;
        };
        let k = token
            .toks_before
            .iter()
            .find_map(|tok| tok.index)
            .or(token.tok.index);
        if let Some(k) = k {
            self.record_blank_line(k, wanted);
        }
    }

    fn record_blank_line(&mut self, k: usize, wanted: BlankLineWanted) {
        let merged = match self.blank_lines.remove(&k) {
            Some(existing) => existing.merge(wanted),
            None => wanted,
        };
        self.blank_lines.insert(k, merged);
    }

    /// Mark the boundary of a region that can be partially reformatted.
    /// The boundary is included in the following region.
    pub fn mark_for_partial_format(&mut self) {
        let Some(last) = self.last_boundary else {
            self.last_boundary = Some(self.token_i);
            return;
        };
        if self.token_i == last {
            return;
        }
        let start = self.input.tokens()[last].start_tok().index;
        let end = self.input.tokens()[self.token_i - 1].end_tok().index;
        if let (Some(lo), Some(hi)) = (start, end) {
            self.boundaries.push((lo, hi));
        }
        self.last_boundary = Some(self.token_i);
    }

    /// Follow along to `position` in the input, complaining about any input
    /// token that should have been emitted before it and was not.
    pub fn sync(&mut self, position: usize) {
        if position <= self.input_position {
            return;
        }
        self.input_position = position;
        if let Some(token) = self.input.tokens().get(self.token_i) {
            if position > token.tok.position {
                let text = token.tok.text.clone();
                self.token_i += 1;
                self.diagnostics
                    .push(self.diagnostic(format!("did not generate token \"{text}\"")));
            }
        }
    }

    /// Flush all remaining input tokens (end-of-input comments included) as
    /// imaginary tokens whose surrounding text is copied verbatim.
    pub fn drain(&mut self) {
        let end = self.input.text().len() + 1;
        if end > self.input_position {
            while self
                .input
                .tokens()
                .get(self.token_i)
                .is_some_and(|token| end > token.tok.position)
            {
                let token = self.token_i;
                self.token_i += 1;
                self.add(Op::Token {
                    token,
                    real: false,
                    plus_indent_comments_before: Indent::ZERO,
                    break_and_indent_trailing_comment: None,
                });
            }
        }
        self.input_position = end;
        if self.depth != 0 {
            self.diagnostics
                .push(Diagnostic::message(format!("saw {} unclosed ops", self.depth)));
        }
    }

    /// Size in bytes of the construct starting at `position`, including
    /// attached comments.
    pub fn actual_size(&self, position: usize, length: usize) -> Option<usize> {
        let start_token = self.input.token_covering(position)?;
        let mut start = start_token.tok.position;
        for tok in &start_token.toks_before {
            if tok.is_comment() {
                start = start.min(tok.position);
            }
        }
        let end_token = self
            .input
            .token_covering(position + length.saturating_sub(1))?;
        let mut end = end_token.tok.position + end_token.tok.len();
        for tok in &end_token.toks_after {
            if tok.is_comment() {
                end = end.max(tok.position + tok.len());
            }
        }
        Some(end - start)
    }

    /// Column where the construct at `position` actually starts, counting
    /// leading comments on the same line.
    pub fn actual_start_column(&self, position: usize) -> Option<usize> {
        let token = self.input.token_covering(position)?;
        let line = self.input.line_number(token.tok.position);
        let mut start = token.tok.position;
        for tok in &token.toks_before {
            if tok.is_comment() {
                if self.input.line_number(tok.position) != line {
                    break;
                }
                start = start.min(tok.position);
            }
        }
        Some(self.input.column_number(start))
    }

    /// Rewrite the stream to insert comments and blank-line requests, and
    /// finish the boundary list. Fails with every collected diagnostic if
    /// the stream and the token model ever disagreed.
    pub fn build(mut self) -> Result<OpStream, FormatError> {
        self.mark_for_partial_format();
        let input = self.input;
        let ops = std::mem::take(&mut self.ops);
        let ops_n = ops.len();
        // Ops to splice in before position i; position ops_n is the end.
        let mut tok_ops: FxHashMap<usize, Vec<Op>> = FxHashMap::default();

        for (i, op) in ops.iter().enumerate() {
            let Op::Token {
                token: ti,
                real,
                plus_indent_comments_before,
                break_and_indent_trailing_comment,
            } = op
            else {
                continue;
            };
            let token = &input.tokens()[*ti];
            // Hoist leading material before any opens that immediately
            // precede the token, and push trailing material past any closes
            // that immediately follow, so inserted ops never cross a
            // nesting boundary that was not already open.
            let mut j = i;
            while j > 0 && matches!(ops[j - 1], Op::OpenLevel { .. }) {
                j -= 1;
            }
            let mut k = i;
            while k + 1 < ops_n && matches!(ops[k + 1], Op::CloseLevel) {
                k += 1;
            }

            if *real {
                let mut newlines = 0usize;
                let mut glue_space = false;
                let mut last_was_comment = false;
                let mut allow_blank_after = false;
                let mut emitted_before =
                    j > 0 || tok_ops.get(&j).is_some_and(|v| !v.is_empty());
                for (bi, tb) in token.toks_before.iter().enumerate() {
                    if tb.is_newline() {
                        newlines += 1;
                    } else if tb.is_comment() {
                        if newlines > 0 {
                            push_at(
                                &mut tok_ops,
                                j,
                                Op::Break {
                                    fill_mode: FillMode::Forced,
                                    flat: String::new(),
                                    plus_indent: plus_indent_comments_before.clone(),
                                    tag: None,
                                },
                            );
                        } else if emitted_before {
                            push_at(&mut tok_ops, j, Op::Space);
                        }
                        push_comment(&mut tok_ops, j, *ti, TokSlot::Before(bi), tb);
                        if tb.is_doc_comment() {
                            push_at(&mut tok_ops, j, forced_break());
                        }
                        glue_space = tb.is_block_comment();
                        newlines = 0;
                        last_was_comment = true;
                        emitted_before = true;
                        allow_blank_after = !tb.is_doc_comment();
                    }
                }
                if allow_blank_after && newlines > 1 {
                    if let Some(k_index) = token.tok.index {
                        self.record_blank_line(k_index, BlankLineWanted::Yes);
                    }
                }
                if newlines >= 2 || (last_was_comment && newlines > 0) {
                    // Blank-line runs collapse to a single forced break;
                    // the sink decides whether a blank line survives.
                    push_at(&mut tok_ops, j, forced_break());
                } else if glue_space {
                    push_at(&mut tok_ops, j, Op::Space);
                }
                for (ai, ta) in token.toks_after.iter().enumerate() {
                    if !ta.is_comment() {
                        continue;
                    }
                    let break_after = ta.is_doc_comment()
                        || (ta.is_block_comment()
                            && break_and_indent_trailing_comment.is_some());
                    if break_after {
                        push_at(
                            &mut tok_ops,
                            k + 1,
                            Op::Break {
                                fill_mode: FillMode::Forced,
                                flat: String::new(),
                                plus_indent: break_and_indent_trailing_comment
                                    .clone()
                                    .unwrap_or(Indent::ZERO),
                                tag: None,
                            },
                        );
                    } else {
                        push_at(&mut tok_ops, k + 1, Op::Space);
                    }
                    push_comment(&mut tok_ops, k + 1, *ti, TokSlot::After(ai), ta);
                    if break_after {
                        push_at(&mut tok_ops, k + 1, forced_break());
                    }
                }
            } else {
                // Imaginary token: copy every surrounding tok literally,
                // spaces and newlines included, so no input text is lost.
                for bi in 0..token.toks_before.len() {
                    push_at(
                        &mut tok_ops,
                        j,
                        Op::Verbatim {
                            token: *ti,
                            slot: TokSlot::Before(bi),
                        },
                    );
                }
                for ai in 0..token.toks_after.len() {
                    push_at(
                        &mut tok_ops,
                        k + 1,
                        Op::Verbatim {
                            token: *ti,
                            slot: TokSlot::After(ai),
                        },
                    );
                }
            }
        }

        // Splice, suppressing spaces (and single-space breaks) that land
        // immediately after a forced break.
        let mut new_ops = Vec::with_capacity(ops_n + tok_ops.len());
        let mut after_forced_break = false;
        for (i, op) in ops.into_iter().enumerate() {
            if let Some(inserted) = tok_ops.remove(&i) {
                for ins in inserted {
                    if after_forced_break && matches!(ins, Op::Space) {
                        continue;
                    }
                    after_forced_break = is_forced_break(&ins);
                    new_ops.push(ins);
                }
            }
            let suppress = after_forced_break
                && match &op {
                    Op::Space => true,
                    Op::Break {
                        flat, plus_indent, ..
                    } => flat == " " && plus_indent.is_zero(),
                    _ => false,
                };
            if suppress {
                continue;
            }
            if !matches!(op, Op::OpenLevel { .. }) {
                after_forced_break = is_forced_break(&op);
            }
            new_ops.push(op);
        }
        if let Some(inserted) = tok_ops.remove(&ops_n) {
            for ins in inserted {
                if after_forced_break && matches!(ins, Op::Space) {
                    continue;
                }
                after_forced_break = is_forced_break(&ins);
                new_ops.push(ins);
            }
        }

        if self.diagnostics.is_empty() {
            tracing::debug!(ops = new_ops.len(), boundaries = self.boundaries.len(), "op stream assembled");
            Ok(OpStream {
                ops: new_ops,
                blank_lines: self.blank_lines,
                boundaries: self.boundaries,
                tag_count: self.tags.count(),
            })
        } else {
            Err(FormatError::Diagnostics(self.diagnostics))
        }
    }
}

fn push_at(tok_ops: &mut FxHashMap<usize, Vec<Op>>, at: usize, op: Op) {
    tok_ops.entry(at).or_default().push(op);
}

/// The ops for one comment: its verbatim text, and for line comments a
/// forced break so nothing shares their line tail.
fn push_comment(
    tok_ops: &mut FxHashMap<usize, Vec<Op>>,
    at: usize,
    token: usize,
    slot: TokSlot,
    tok: &Tok,
) {
    push_at(tok_ops, at, Op::Verbatim { token, slot });
    if tok.is_line_comment() {
        push_at(tok_ops, at, forced_break());
    }
}
