//! The working context of one action.
//!
//! An [`ActionScope`] bundles the proposed state, the catalog, the dice and
//! the recorder, plus the queue of milestones raised but not yet
//! delivered. Handlers, the case manager and observers all work through
//! it, so everything an action touches is dropped together if it fails.

use std::collections::VecDeque;

use crate::core::GameState;
use crate::explain::{ExplanationRecorder, Provenance};
use crate::resolution::{DiceSource, LeadershipResult};
use crate::rules::RuleCatalog;

use super::milestone::Milestone;

/// Mutable context of an action in progress.
pub struct ActionScope<'a> {
    /// Proposed state; committed only if the action succeeds.
    pub state: &'a mut GameState,
    pub catalog: &'a RuleCatalog,
    pub dice: &'a mut dyn DiceSource,
    pub recorder: &'a mut ExplanationRecorder,
    pending: VecDeque<Milestone>,
    delivered: Vec<Milestone>,
    tests: Vec<LeadershipResult>,
}

impl<'a> ActionScope<'a> {
    pub fn new(
        state: &'a mut GameState,
        catalog: &'a RuleCatalog,
        dice: &'a mut dyn DiceSource,
        recorder: &'a mut ExplanationRecorder,
    ) -> Self {
        Self {
            state,
            catalog,
            dice,
            recorder,
            pending: VecDeque::new(),
            delivered: Vec::new(),
            tests: Vec::new(),
        }
    }

    /// Queue a milestone for delivery.
    pub fn emit(&mut self, milestone: Milestone) {
        self.pending.push_back(milestone);
    }

    /// Next undelivered milestone, oldest first.
    pub(crate) fn next_pending(&mut self) -> Option<Milestone> {
        self.pending.pop_front()
    }

    pub(crate) fn mark_delivered(&mut self, milestone: Milestone) {
        self.delivered.push(milestone);
    }

    /// Whether milestones are waiting for delivery.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record the provenance of `value` and hand it back.
    pub fn observe<T: Provenance>(&mut self, value: T) -> T {
        self.recorder.observe(value)
    }

    /// Keep a leadership test taken as a side effect of the action.
    pub fn push_test(&mut self, result: LeadershipResult) {
        let result = self.recorder.observe(result);
        self.tests.push(result);
    }

    /// Milestones delivered so far, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> &[Milestone] {
        &self.delivered
    }

    /// Leadership tests taken so far.
    #[must_use]
    pub fn tests(&self) -> &[LeadershipResult] {
        &self.tests
    }

    /// Delivered milestones and side-effect tests, consuming the scope.
    pub fn into_parts(self) -> (Vec<Milestone>, Vec<LeadershipResult>) {
        (self.delivered, self.tests)
    }
}
