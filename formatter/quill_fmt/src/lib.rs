//! Quill formatting engine.
//!
//! A language-agnostic pretty-printer with partial reformatting. An
//! external visitor walks its syntax tree and emits a linear stream of
//! formatting ops; this crate decides where lines break, how much to
//! indent, where comments and blank lines land, and — for partial
//! requests — which minimal byte ranges of the original file to replace.
//!
//! # Pipeline
//!
//! 1. [`ops`]: the visitor's raw op stream is corrected so every comment
//!    and required blank line is explicit
//! 2. [`doc`]: the linear stream folds into a tree of levels and leaves
//! 3. [`doc::Doc::compute_breaks`]: one pass decides which breaks fire
//! 4. [`output`]: the write pass assembles final lines and tok-line maps
//! 5. [`replacement`]: line maps on both sides align output text with
//!    input byte ranges
//!
//! Each invocation owns its whole pipeline state; independent invocations
//! can run on separate threads with no shared mutable state.

pub mod comments;
pub mod doc;
pub mod engine;
pub mod indent;
pub mod ops;
pub mod options;
pub mod output;
pub mod replacement;

pub use comments::{CommentRewriter, PassthroughRewriter, ReindentRewriter};
pub use doc::{Doc, DocBuilder, LayoutContext, LayoutState, Width};
pub use engine::FormatEngine;
pub use indent::{BreakOutcomes, BreakTag, Indent};
pub use ops::{BlankLineWanted, FillMode, Op, OpStream, OpsBuilder};
pub use options::{FormatOptions, MAX_LINE_WIDTH};
pub use output::{FormatOutput, LineCounter, LineSink, Sink};
pub use replacement::{apply_replacements, Replacement};
