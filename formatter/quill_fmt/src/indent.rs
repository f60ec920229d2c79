//! Conditional indentation and break tags.
//!
//! A [`BreakTag`] is an opaque handle that correlates one break with the
//! indent expressions that depend on its outcome. Tags are allocated from a
//! per-invocation counter and their outcomes live in a dense table, so
//! consulting one is an array read rather than an identity-map lookup.
//!
//! Tags are always declared before the breaks and indents that reference
//! them, in document order, so by the time an [`Indent::If`] is evaluated
//! its tag has been resolved by the layout pass.

/// Handle identifying one break whose outcome other nodes consult.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BreakTag(usize);

/// Per-invocation table of break outcomes, indexed by tag.
#[derive(Clone, Debug, Default)]
pub struct BreakOutcomes {
    taken: Vec<Option<bool>>,
}

impl BreakOutcomes {
    /// A table with room for `tag_count` tags, all unresolved.
    pub fn new(tag_count: usize) -> BreakOutcomes {
        BreakOutcomes {
            taken: vec![None; tag_count],
        }
    }

    /// Record whether the tagged break fired. The layout pass may visit a
    /// break more than once while it settles an enclosing level; the last
    /// recording wins.
    pub fn record(&mut self, tag: BreakTag, broken: bool) {
        if self.taken.len() <= tag.0 {
            self.taken.resize(tag.0 + 1, None);
        }
        self.taken[tag.0] = Some(broken);
    }

    /// Whether the tagged break fired. An unresolved tag reads as not taken.
    pub fn was_taken(&self, tag: BreakTag) -> bool {
        self.taken.get(tag.0).copied().flatten().unwrap_or(false)
    }
}

/// Allocator for [`BreakTag`]s, owned by the op builder.
#[derive(Clone, Debug, Default)]
pub struct TagAllocator {
    next: usize,
}

impl TagAllocator {
    pub fn new() -> TagAllocator {
        TagAllocator::default()
    }

    pub fn fresh(&mut self) -> BreakTag {
        let tag = BreakTag(self.next);
        self.next += 1;
        tag
    }

    /// Number of tags handed out so far.
    pub fn count(&self) -> usize {
        self.next
    }
}

/// An indent amount: a constant, or a choice depending on whether a tagged
/// break fired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Indent {
    Const(i32),
    If {
        tag: BreakTag,
        then_indent: Box<Indent>,
        else_indent: Box<Indent>,
    },
}

impl Indent {
    pub const ZERO: Indent = Indent::Const(0);

    pub fn constant(n: i32) -> Indent {
        Indent::Const(n)
    }

    pub fn conditional(tag: BreakTag, then_indent: Indent, else_indent: Indent) -> Indent {
        Indent::If {
            tag,
            then_indent: Box::new(then_indent),
            else_indent: Box::new(else_indent),
        }
    }

    /// Evaluate against the recorded break outcomes.
    pub fn eval(&self, outcomes: &BreakOutcomes) -> i32 {
        match self {
            Indent::Const(n) => *n,
            Indent::If {
                tag,
                then_indent,
                else_indent,
            } => {
                if outcomes.was_taken(*tag) {
                    then_indent.eval(outcomes)
                } else {
                    else_indent.eval(outcomes)
                }
            }
        }
    }

    /// Is this statically the zero indent?
    pub fn is_zero(&self) -> bool {
        matches!(self, Indent::Const(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_tag_reads_not_taken() {
        let mut tags = TagAllocator::new();
        let tag = tags.fresh();
        let outcomes = BreakOutcomes::new(tags.count());
        assert!(!outcomes.was_taken(tag));
    }

    #[test]
    fn last_recording_wins() {
        let mut tags = TagAllocator::new();
        let tag = tags.fresh();
        let mut outcomes = BreakOutcomes::new(tags.count());
        outcomes.record(tag, true);
        outcomes.record(tag, false);
        assert!(!outcomes.was_taken(tag));
    }

    #[test]
    fn conditional_indent_follows_outcome() {
        let mut tags = TagAllocator::new();
        let tag = tags.fresh();
        let indent = Indent::conditional(tag, Indent::constant(4), Indent::constant(0));
        let mut outcomes = BreakOutcomes::new(tags.count());
        assert_eq!(indent.eval(&outcomes), 0);
        outcomes.record(tag, true);
        assert_eq!(indent.eval(&outcomes), 4);
    }

    #[test]
    fn nested_conditionals() {
        let mut tags = TagAllocator::new();
        let outer = tags.fresh();
        let inner = tags.fresh();
        let indent = Indent::conditional(
            outer,
            Indent::conditional(inner, Indent::constant(8), Indent::constant(4)),
            Indent::constant(2),
        );
        let mut outcomes = BreakOutcomes::new(tags.count());
        outcomes.record(outer, true);
        outcomes.record(inner, true);
        assert_eq!(indent.eval(&outcomes), 8);
    }
}
