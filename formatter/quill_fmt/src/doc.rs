//! The document tree and break computation.
//!
//! [`DocBuilder`] folds the corrected op stream into a tree of levels and
//! leaves. Widths, flat renderings and tok ranges are sealed bottom-up at
//! build time and never change afterwards; the only later mutation is the
//! single [`Doc::compute_breaks`] pass, which records per level whether it
//! committed to one line and per break whether it fired, before the
//! read-only write pass replays those decisions into a sink.
//!
//! Levels live in an arena indexed by handle, which is what makes the
//! builder's retroactive append target cheap: after a level closes, text
//! can still be routed into it (a trailing semicolon joins the level that
//! holds the last break, so it participates in that level's one-line fit
//! test instead of being judged alone).

use quill_ir::{newlines, Tok, TokRange, Token, TokenModel};

use crate::comments::CommentRewriter;
use crate::indent::{BreakOutcomes, BreakTag, Indent};
use crate::ops::{FillMode, Op};
use crate::output::Sink;

/// A node width: finite character count, or infinite for content that can
/// never render on one line (forced breaks, multi-line verbatim text).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Finite(usize),
    Infinite,
}

impl Width {
    fn add(self, other: Width) -> Width {
        match (self, other) {
            (Width::Finite(a), Width::Finite(b)) => Width::Finite(a + b),
            _ => Width::Infinite,
        }
    }

    fn fits(self, column: usize, max_width: usize) -> bool {
        match self {
            Width::Finite(w) => column + w <= max_width,
            Width::Infinite => false,
        }
    }
}

/// State threaded through break computation. Never mutated in place: every
/// step produces a new value.
#[derive(Clone, Copy, Debug)]
pub struct LayoutState {
    /// Indent of the level whose breaks are being laid out; fired breaks
    /// indent relative to this.
    pub last_indent: usize,
    /// Current indent.
    pub indent: usize,
    /// Current column.
    pub column: usize,
    /// A split did not fit; the next break must fire regardless of mode.
    pub must_break: bool,
}

impl LayoutState {
    pub fn new(indent: usize, column: usize) -> LayoutState {
        LayoutState {
            last_indent: indent,
            indent,
            column,
            must_break: false,
        }
    }

    fn with_column(self, column: usize) -> LayoutState {
        LayoutState { column, ..self }
    }
}

/// Everything break computation consults besides the tree itself.
pub struct LayoutContext<'c> {
    pub max_width: usize,
    pub rewriter: &'c dyn CommentRewriter,
    pub outcomes: &'c mut BreakOutcomes,
}

fn clamp_indent(indent: i32) -> usize {
    usize::try_from(indent.max(0)).unwrap_or(0)
}

/// A break leaf with its layout decision.
#[derive(Clone, Debug)]
struct BreakNode {
    fill_mode: FillMode,
    flat: String,
    plus_indent: Indent,
    tag: Option<BreakTag>,
    /// Set by compute_breaks.
    broken: bool,
    /// Column after the break, when broken.
    new_indent: usize,
}

#[derive(Clone, Debug)]
enum Node<'a> {
    /// A nested level, by arena handle.
    Level(usize),
    Token {
        token: &'a Token,
        range: TokRange,
    },
    Space,
    Break(BreakNode),
    Verbatim {
        tok: &'a Tok,
        range: TokRange,
        /// Comment text after rewriting; set by compute_breaks.
        rewritten: Option<String>,
    },
}

/// A run of children between breaks.
#[derive(Clone, Debug)]
struct Split {
    /// The break preceding this run; `None` for the first run.
    break_index: Option<usize>,
    /// Child indices in the run.
    children: Vec<usize>,
}

#[derive(Clone, Debug)]
struct LevelData<'a> {
    plus_indent: Indent,
    children: Vec<Node<'a>>,
    // Sealed at build time.
    width: Width,
    flat: String,
    range: TokRange,
    splits: Vec<Split>,
    // Set by compute_breaks.
    one_line: bool,
}

impl LevelData<'_> {
    fn new(plus_indent: Indent) -> Self {
        LevelData {
            plus_indent,
            children: Vec::new(),
            width: Width::Finite(0),
            flat: String::new(),
            range: TokRange::EMPTY,
            splits: Vec::new(),
            one_line: false,
        }
    }
}

/// The document tree for one formatting invocation.
#[derive(Clone, Debug)]
pub struct Doc<'a> {
    /// Arena of levels; index 0 is the root.
    levels: Vec<LevelData<'a>>,
}

impl<'a> Doc<'a> {
    fn node_width(&self, node: &Node<'a>) -> Width {
        match node {
            Node::Level(i) => self.levels[*i].width,
            Node::Token { token, .. } => Width::Finite(token.tok.original_text.len()),
            Node::Space => Width::Finite(1),
            Node::Break(b) => {
                if matches!(b.fill_mode, FillMode::Forced) {
                    Width::Infinite
                } else {
                    Width::Finite(b.flat.len())
                }
            }
            Node::Verbatim { tok, .. } => {
                if newlines::contains_breaks(&tok.original_text) {
                    Width::Infinite
                } else {
                    Width::Finite(tok.original_text.len())
                }
            }
        }
    }

    fn node_range(&self, node: &Node<'a>) -> TokRange {
        match node {
            Node::Level(i) => self.levels[*i].range,
            Node::Token { range, .. } | Node::Verbatim { range, .. } => *range,
            Node::Space | Node::Break(_) => TokRange::EMPTY,
        }
    }

    fn node_flat_into(&self, node: &Node<'a>, out: &mut String) {
        match node {
            Node::Level(i) => out.push_str(&self.levels[*i].flat),
            Node::Token { token, .. } => out.push_str(&token.tok.original_text),
            Node::Space => out.push(' '),
            Node::Break(b) => out.push_str(&b.flat),
            Node::Verbatim { tok, .. } => out.push_str(&tok.original_text),
        }
    }

    /// Decide which breaks fire. One pass over the tree; annotates levels
    /// and breaks for the write pass and resolves break tags.
    pub fn compute_breaks(&mut self, ctx: &mut LayoutContext<'_>, state: LayoutState) -> LayoutState {
        self.compute_level(0, ctx, state)
    }

    fn compute_level(
        &mut self,
        idx: usize,
        ctx: &mut LayoutContext<'_>,
        state: LayoutState,
    ) -> LayoutState {
        let width = self.levels[idx].width;
        if width.fits(state.column, ctx.max_width) {
            self.levels[idx].one_line = true;
            let Width::Finite(w) = width else {
                return state;
            };
            return state.with_column(state.column + w);
        }
        self.levels[idx].one_line = false;
        let plus = self.levels[idx].plus_indent.eval(ctx.outcomes);
        let indent_i32 = i32::try_from(state.indent).unwrap_or(i32::MAX);
        let level_indent = clamp_indent(indent_i32.saturating_add(plus));
        let broken = LayoutState {
            last_indent: level_indent,
            indent: level_indent,
            column: state.column,
            must_break: state.must_break,
        };
        let end = self.compute_broken(idx, ctx, broken);
        state.with_column(end.column)
    }

    fn compute_broken(
        &mut self,
        idx: usize,
        ctx: &mut LayoutContext<'_>,
        state0: LayoutState,
    ) -> LayoutState {
        // Take the children out of the arena so child levels can be
        // visited through `self` without aliasing.
        let mut children = std::mem::take(&mut self.levels[idx].children);
        let splits = std::mem::take(&mut self.levels[idx].splits);
        let mut state = state0;
        for split in &splits {
            state = self.compute_break_and_split(&mut children, ctx, state, split);
        }
        self.levels[idx].children = children;
        self.levels[idx].splits = splits;
        state
    }

    /// Lay out one break and the run that follows it.
    fn compute_break_and_split(
        &mut self,
        children: &mut [Node<'a>],
        ctx: &mut LayoutContext<'_>,
        state0: LayoutState,
        split: &Split,
    ) -> LayoutState {
        let break_width = split
            .break_index
            .map_or(Width::Finite(0), |bi| self.node_width(&children[bi]));
        let split_width = split
            .children
            .iter()
            .fold(Width::Finite(0), |w, &ci| w.add(self.node_width(&children[ci])));
        let unified = split.break_index.is_some_and(|bi| {
            matches!(
                &children[bi],
                Node::Break(b) if matches!(b.fill_mode, FillMode::Unified)
            )
        });
        let should_break = unified
            || state0.must_break
            || !break_width.add(split_width).fits(state0.column, ctx.max_width);

        let mut state = state0;
        if let Some(bi) = split.break_index {
            if let Node::Break(b) = &mut children[bi] {
                state = compute_break(b, ctx, state, state.last_indent, should_break);
            }
        }
        let enough_room = split_width.fits(state.column, ctx.max_width);
        state.must_break = false;
        for &ci in &split.children {
            state = self.compute_node(&mut children[ci], ctx, state);
        }
        if !enough_room {
            // Force the following break to fire even if it is independent.
            state.must_break = true;
        }
        state
    }

    fn compute_node(
        &mut self,
        node: &mut Node<'a>,
        ctx: &mut LayoutContext<'_>,
        state: LayoutState,
    ) -> LayoutState {
        match node {
            Node::Level(i) => self.compute_level(*i, ctx, state),
            Node::Token { token, .. } => {
                state.with_column(state.column + token.tok.original_text.len())
            }
            Node::Space => state.with_column(state.column + 1),
            Node::Verbatim { tok, rewritten, .. } => {
                let text = ctx.rewriter.rewrite(tok, ctx.max_width, state.column);
                let column = match text.rfind('\n') {
                    Some(i) => text.len() - i - 1,
                    None => state.column + text.len(),
                };
                *rewritten = Some(text);
                state.with_column(column)
            }
            Node::Break(_) => unreachable!("break nodes are laid out by their enclosing level"),
        }
    }

    /// Replay the computed layout into a sink, in document order.
    pub fn write(&self, sink: &mut dyn Sink) {
        self.write_level(0, sink);
    }

    fn write_level(&self, idx: usize, sink: &mut dyn Sink) {
        let level = &self.levels[idx];
        if level.one_line {
            sink.append(&level.flat, level.range);
            return;
        }
        for split in &level.splits {
            if let Some(bi) = split.break_index {
                self.write_node(&level.children[bi], sink);
            }
            for &ci in &split.children {
                self.write_node(&level.children[ci], sink);
            }
        }
    }

    fn write_node(&self, node: &Node<'a>, sink: &mut dyn Sink) {
        match node {
            Node::Level(i) => self.write_level(*i, sink),
            Node::Token { token, range } => sink.append(&token.tok.original_text, *range),
            Node::Space => sink.append(" ", TokRange::EMPTY),
            Node::Break(b) => {
                if b.broken {
                    sink.append("\n", TokRange::EMPTY);
                    sink.indent(b.new_indent);
                } else {
                    sink.append(&b.flat, TokRange::EMPTY);
                }
            }
            Node::Verbatim { tok, range, rewritten } => sink.append(
                rewritten.as_deref().unwrap_or(tok.original_text.as_str()),
                *range,
            ),
        }
    }
}

fn compute_break(
    b: &mut BreakNode,
    ctx: &mut LayoutContext<'_>,
    state: LayoutState,
    last_indent: usize,
    broken: bool,
) -> LayoutState {
    if let Some(tag) = b.tag {
        ctx.outcomes.record(tag, broken);
    }
    if broken {
        b.broken = true;
        let base = i32::try_from(last_indent).unwrap_or(i32::MAX);
        b.new_indent = clamp_indent(base.saturating_add(b.plus_indent.eval(ctx.outcomes)));
        state.with_column(b.new_indent)
    } else {
        b.broken = false;
        state.with_column(state.column + b.flat.len())
    }
}

/// Folds an op stream into a [`Doc`].
pub struct DocBuilder<'a> {
    input: &'a TokenModel,
    doc: Doc<'a>,
    /// Open level handles; the root stays at the bottom.
    stack: Vec<usize>,
    /// Where content leaves go. Reset to the innermost open level whenever
    /// a break is appended, so trailing text joins the level that holds
    /// the last break even after that level closes.
    append_level: usize,
}

impl<'a> DocBuilder<'a> {
    pub fn new(input: &'a TokenModel) -> DocBuilder<'a> {
        DocBuilder {
            input,
            doc: Doc {
                levels: vec![LevelData::new(Indent::ZERO)],
            },
            stack: vec![0],
            append_level: 0,
        }
    }

    fn top(&self) -> usize {
        self.stack.last().copied().unwrap_or(0)
    }

    fn append(&mut self, node: Node<'a>) {
        let target = self.append_level;
        self.doc.levels[target].children.push(node);
    }

    fn push_op(&mut self, op: Op) {
        match op {
            Op::OpenLevel { plus_indent } => {
                let idx = self.doc.levels.len();
                self.doc.levels.push(LevelData::new(plus_indent));
                self.stack.push(idx);
            }
            Op::CloseLevel => self.close_level(),
            Op::Token { token, .. } => {
                let token = &self.input.tokens()[token];
                let range = token.tok.index.map_or(TokRange::EMPTY, TokRange::singleton);
                self.append(Node::Token { token, range });
            }
            Op::Space => self.append(Node::Space),
            Op::Break {
                fill_mode,
                flat,
                plus_indent,
                tag,
            } => {
                self.append_level = self.top();
                self.append(Node::Break(BreakNode {
                    fill_mode,
                    flat,
                    plus_indent,
                    tag,
                    broken: false,
                    new_indent: 0,
                }));
            }
            Op::Verbatim { token, slot } => {
                if let Some(tok) = self.input.tokens()[token].tok_in_slot(slot) {
                    let range = tok.index.map_or(TokRange::EMPTY, TokRange::singleton);
                    self.append(Node::Verbatim {
                        tok,
                        range,
                        rewritten: None,
                    });
                }
            }
        }
    }

    fn close_level(&mut self) {
        assert!(self.stack.len() > 1, "close without matching open");
        let idx = match self.stack.pop() {
            Some(idx) => idx,
            None => unreachable!(),
        };
        let parent = self.top();
        self.doc.levels[parent].children.push(Node::Level(idx));
    }

    /// Append a whole op stream.
    pub fn with_ops(mut self, ops: Vec<Op>) -> Self {
        for op in ops {
            self.push_op(op);
        }
        self
    }

    /// Seal widths, flat renderings, ranges and split lists bottom-up and
    /// return the finished tree.
    pub fn build(mut self) -> Doc<'a> {
        while self.stack.len() > 1 {
            self.close_level();
        }
        // Levels are created parent-first, so reverse order is bottom-up.
        for idx in (0..self.doc.levels.len()).rev() {
            self.seal(idx);
        }
        self.doc
    }

    fn seal(&mut self, idx: usize) {
        let children = std::mem::take(&mut self.doc.levels[idx].children);
        let mut width = Width::Finite(0);
        let mut range = TokRange::EMPTY;
        let mut splits = vec![Split {
            break_index: None,
            children: Vec::new(),
        }];
        for (ci, node) in children.iter().enumerate() {
            width = width.add(self.doc.node_width(node));
            range = range.union(self.doc.node_range(node));
            if matches!(node, Node::Break(_)) {
                splits.push(Split {
                    break_index: Some(ci),
                    children: Vec::new(),
                });
            } else if let Some(split) = splits.last_mut() {
                split.children.push(ci);
            }
        }
        let mut flat = String::new();
        if matches!(width, Width::Finite(_)) {
            for node in &children {
                self.doc.node_flat_into(node, &mut flat);
            }
        }
        let level = &mut self.doc.levels[idx];
        level.children = children;
        level.width = width;
        level.flat = flat;
        level.range = range;
        level.splits = splits;
    }
}
