//! Shared data model for the Quill formatting engine.
//!
//! The engine itself never lexes source text. An external lexer produces a
//! [`TokenModel`]: the original text plus an ordered list of language-level
//! [`Token`]s, each owning the comments and whitespace ([`Tok`]s) that
//! surround it. Everything the engine needs to correlate input and output —
//! tok-index ranges, per-line range maps, newline handling — lives here so
//! that both sides of the pipeline speak the same vocabulary.
//!
//! # Modules
//!
//! - [`tok`]: raw lexical units and language tokens
//! - [`model`]: the token model consumed by the engine
//! - [`range`]: tok-index ranges and integer range sets
//! - [`lines`]: per-line tok-range maps (input and output share the shape)
//! - [`newlines`]: platform-independent line-terminator handling

pub mod lines;
pub mod model;
pub mod newlines;
pub mod range;
pub mod tok;

pub use lines::LineMaps;
pub use model::TokenModel;
pub use range::{RangeSet, TokRange};
pub use tok::{Tok, TokKind, TokSlot, Token};
