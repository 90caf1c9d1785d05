//! Ordered classification tables.
//!
//! Every label the pipeline derives comes from a slice of [`Rule`]s that is
//! evaluated top to bottom; the first predicate that holds decides the label
//! and the table's fallback covers everything else. Keeping the boundaries in
//! data rather than nested branches lets each table be tested on its own.

/// A single `(predicate, label)` pair.
#[derive(Clone, Copy)]
pub struct Rule<I, L> {
    pub label: L,
    pub when: fn(&I) -> bool,
}

impl<I, L> Rule<I, L> {
    pub const fn new(label: L, when: fn(&I) -> bool) -> Self {
        Self { label, when }
    }
}

/// An ordered rule list with the label used when nothing matches.
#[derive(Clone, Copy)]
pub struct RuleTable<I: 'static, L: 'static> {
    pub rules: &'static [Rule<I, L>],
    pub fallback: L,
}

impl<I, L: Copy> RuleTable<I, L> {
    /// Evaluates the rules in order. First match wins.
    pub fn classify(&self, input: &I) -> L {
        self.rules
            .iter()
            .find(|rule| (rule.when)(input))
            .map(|rule| rule.label)
            .unwrap_or(self.fallback)
    }
}
