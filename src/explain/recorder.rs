//! Explanation recording.
//!
//! Every outcome that carries a ruling implements [`Provenance`], which
//! lists the (decision, rule, citation, dice) entries that produced it.
//! The [`ExplanationRecorder`] observes outcomes as they are returned:
//! `observe` hands its argument back untouched, so engine results are the
//! same whether recording is on or off.
//!
//! ```
//! use rust_wargame::explain::{Citation, ExplanationRecorder, Provenance, TraceEntry};
//! use rust_wargame::rules::RuleId;
//!
//! struct Ruling(u8);
//!
//! impl Provenance for Ruling {
//!     fn provenance(&self, out: &mut Vec<TraceEntry>) {
//!         out.push(TraceEntry::new("ruled", RuleId::new("r"), Citation::new("Core Rules", 1)));
//!     }
//! }
//!
//! let mut on = ExplanationRecorder::new();
//! let mut off = ExplanationRecorder::disabled();
//! assert_eq!(on.observe(Ruling(3)).0, off.observe(Ruling(3)).0);
//! assert_eq!(on.finish().len(), 1);
//! assert!(off.finish().is_empty());
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::OutcomeId;
use crate::rules::RuleId;

use super::citation::Citation;

/// One recorded decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// What was decided, in words.
    pub decision: String,
    /// Rule that produced the decision.
    pub rule: RuleId,
    /// Where the rule is written.
    pub citation: Citation,
    /// Raw dice consumed by the decision.
    pub draws: SmallVec<[u8; 8]>,
}

impl TraceEntry {
    /// Create an entry with no dice.
    pub fn new(decision: impl Into<String>, rule: RuleId, citation: Citation) -> Self {
        Self {
            decision: decision.into(),
            rule,
            citation,
            draws: SmallVec::new(),
        }
    }

    /// Attach raw dice draws (builder pattern).
    #[must_use]
    pub fn with_draws(mut self, draws: &[u8]) -> Self {
        self.draws.extend_from_slice(draws);
        self
    }
}

/// Anything that can account for the rulings behind it.
pub trait Provenance {
    /// Append this value's trace entries, in decision order.
    fn provenance(&self, out: &mut Vec<TraceEntry>);
}

impl<T: Provenance> Provenance for Vec<T> {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        for item in self {
            item.provenance(out);
        }
    }
}

impl<T: Provenance> Provenance for Option<T> {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        if let Some(item) = self {
            item.provenance(out);
        }
    }
}

/// The append-only trace of one resolved action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    /// Entries in decision order.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Citations in decision order.
    #[must_use]
    pub fn citations(&self) -> Vec<Citation> {
        self.entries.iter().map(|e| e.citation.clone()).collect()
    }

    /// Rules in decision order.
    pub fn rules(&self) -> impl Iterator<Item = &RuleId> {
        self.entries.iter().map(|e| &e.rule)
    }

    /// All raw dice, in the order they were drawn.
    #[must_use]
    pub fn draws(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|e| e.draws.iter().copied()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Observes outcomes and accumulates their provenance.
#[derive(Clone, Debug)]
pub struct ExplanationRecorder {
    enabled: bool,
    entries: Vec<TraceEntry>,
}

impl Default for ExplanationRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplanationRecorder {
    /// Create an enabled recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            entries: Vec::new(),
        }
    }

    /// Create a recorder that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            entries: Vec::new(),
        }
    }

    /// Whether recording is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the provenance of `value` and return it unchanged.
    pub fn observe<T: Provenance>(&mut self, value: T) -> T {
        if self.enabled {
            value.provenance(&mut self.entries);
        }
        value
    }

    /// Record a single entry.
    pub fn record(&mut self, entry: TraceEntry) {
        if self.enabled {
            self.entries.push(entry);
        }
    }

    /// Take the accumulated trace, leaving the recorder empty.
    pub fn finish(&mut self) -> Trace {
        Trace {
            entries: std::mem::take(&mut self.entries),
        }
    }
}

/// Traces of committed actions, keyed by outcome.
#[derive(Clone, Debug, Default)]
pub struct ExplanationLog {
    traces: FxHashMap<OutcomeId, Trace>,
}

impl ExplanationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the trace of an outcome.
    pub fn insert(&mut self, outcome: OutcomeId, trace: Trace) {
        self.traces.insert(outcome, trace);
    }

    /// The full trace of an outcome.
    #[must_use]
    pub fn trace(&self, outcome: OutcomeId) -> Option<&Trace> {
        self.traces.get(&outcome)
    }

    /// Ordered citations behind an outcome.
    #[must_use]
    pub fn explain(&self, outcome: OutcomeId) -> Option<Vec<Citation>> {
        self.trace(outcome).map(Trace::citations)
    }

    /// Number of stored traces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Roll(u8);

    impl Provenance for Roll {
        fn provenance(&self, out: &mut Vec<TraceEntry>) {
            out.push(
                TraceEntry::new("rolled", RuleId::new("roll"), Citation::new("Core Rules", 2))
                    .with_draws(&[self.0]),
            );
        }
    }

    #[test]
    fn test_observe_returns_value_unchanged() {
        let mut recorder = ExplanationRecorder::new();
        let r = recorder.observe(Roll(5));
        assert_eq!(r.0, 5);
        let trace = recorder.finish();
        assert_eq!(trace.draws(), vec![5]);
        assert!(recorder.finish().is_empty());
    }

    #[test]
    fn test_vec_provenance_keeps_order() {
        let mut recorder = ExplanationRecorder::new();
        recorder.observe(vec![Roll(1), Roll(6)]);
        assert_eq!(recorder.finish().draws(), vec![1, 6]);
    }

    #[test]
    fn test_log_explain() {
        let mut log = ExplanationLog::new();
        let mut recorder = ExplanationRecorder::new();
        recorder.observe(Roll(3));
        log.insert(OutcomeId::new(1), recorder.finish());

        let cites = log.explain(OutcomeId::new(1)).unwrap();
        assert_eq!(cites, vec![Citation::new("Core Rules", 2)]);
        assert!(log.explain(OutcomeId::new(2)).is_none());
    }
}
