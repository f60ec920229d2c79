//! The formatting driver.
//!
//! Wires the sequential phases of one invocation together: the assembled op
//! stream is folded into a document tree, the break-computation pass
//! settles the layout, and the write pass fills the line buffer. Nothing
//! here is shared between invocations; callers may run one engine per file
//! across worker threads without locks.

use tracing::debug;

use quill_diagnostic::FormatError;
use quill_ir::TokenModel;

use crate::comments::{CommentRewriter, PassthroughRewriter};
use crate::doc::{DocBuilder, LayoutContext, LayoutState};
use crate::indent::BreakOutcomes;
use crate::ops::{OpStream, OpsBuilder};
use crate::options::FormatOptions;
use crate::output::{FormatOutput, LineSink};

/// Runs formatting invocations with a fixed configuration.
pub struct FormatEngine {
    options: FormatOptions,
    rewriter: Box<dyn CommentRewriter>,
}

impl FormatEngine {
    /// An engine that emits comments unchanged.
    pub fn new(options: FormatOptions) -> FormatEngine {
        FormatEngine {
            options,
            rewriter: Box::new(PassthroughRewriter),
        }
    }

    /// Replace the comment rewriter.
    pub fn with_rewriter(mut self, rewriter: Box<dyn CommentRewriter>) -> FormatEngine {
        self.rewriter = rewriter;
        self
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Lay out an assembled op stream against its token model.
    pub fn format<'i>(&self, input: &'i TokenModel, stream: OpStream) -> FormatOutput<'i> {
        let OpStream {
            ops,
            blank_lines,
            boundaries,
            tag_count,
        } = stream;
        debug!(ops = ops.len(), tags = tag_count, "layout starting");
        let mut doc = DocBuilder::new(input).with_ops(ops).build();
        let mut outcomes = BreakOutcomes::new(tag_count);
        let mut ctx = LayoutContext {
            max_width: self.options.max_width,
            rewriter: self.rewriter.as_ref(),
            outcomes: &mut outcomes,
        };
        doc.compute_breaks(&mut ctx, LayoutState::new(0, 0));
        let mut sink = LineSink::new(input, &blank_lines, &outcomes);
        doc.write(&mut sink);
        let out = sink.finish(boundaries, self.options.clone());
        debug!(lines = out.line_count(), "layout complete");
        out
    }

    /// Convenience: validate and build the op stream, then lay it out.
    pub fn format_builder<'i>(
        &self,
        builder: OpsBuilder<'i>,
    ) -> Result<FormatOutput<'i>, FormatError> {
        let input = builder.input();
        let stream = builder.build()?;
        Ok(self.format(input, stream))
    }
}
