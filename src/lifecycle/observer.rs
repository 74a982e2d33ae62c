//! Observer registry.
//!
//! Observers subscribe to milestones with a filter and a priority. When a
//! milestone is delivered, every matching observer runs, higher priority
//! first and registration order within a priority.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::Result;

use super::manager::CaseManager;
use super::milestone::{Milestone, MilestoneFilter, MilestoneKind};
use super::scope::ActionScope;

/// Unique identifier for an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u32);

impl ObserverId {
    /// Create a new observer ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Observer({})", self.0)
    }
}

/// Something that reacts to milestones.
///
/// Observers may change the proposed state and raise further milestones
/// through the case manager; those are delivered in the same action.
pub trait MilestoneObserver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// React to a delivered milestone.
    fn on_milestone(&self, milestone: &Milestone, manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<()>;
}

/// A registered observer.
#[derive(Clone)]
pub struct Registration {
    pub id: ObserverId,
    pub filter: MilestoneFilter,
    /// Higher runs first. Equal priorities run in id order.
    pub priority: i32,
    pub enabled: bool,
    pub observer: Arc<dyn MilestoneObserver>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("name", &self.observer.name())
            .field("filter", &self.filter)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Kinds a filter can only ever match, if that set is known.
fn indexed_kinds(filter: &MilestoneFilter) -> Option<Vec<MilestoneKind>> {
    match filter {
        MilestoneFilter::Kind(k) => Some(vec![*k]),
        MilestoneFilter::AnyKind(kinds) => Some(kinds.clone()),
        MilestoneFilter::All(filters) => filters.iter().find_map(indexed_kinds),
        MilestoneFilter::Any | MilestoneFilter::Unit(_) | MilestoneFilter::Not(_) => None,
    }
}

/// Registry for milestone observers.
#[derive(Clone, Debug, Default)]
pub struct ObserverRegistry {
    observers: FxHashMap<ObserverId, Registration>,

    /// Index by milestone kind for fast lookup.
    by_kind: FxHashMap<MilestoneKind, Vec<ObserverId>>,

    /// Observers whose filter is not tied to a kind.
    unindexed: Vec<ObserverId>,

    next_id: u32,
}

impl ObserverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, returns its ID.
    pub fn register(
        &mut self,
        filter: MilestoneFilter,
        priority: i32,
        observer: Arc<dyn MilestoneObserver>,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId::new(self.next_id);

        match indexed_kinds(&filter) {
            Some(kinds) => {
                for kind in kinds {
                    self.by_kind.entry(kind).or_default().push(id);
                }
            }
            None => self.unindexed.push(id),
        }

        self.observers.insert(
            id,
            Registration {
                id,
                filter,
                priority,
                enabled: true,
                observer,
            },
        );
        id
    }

    /// Unregister an observer.
    pub fn unregister(&mut self, id: ObserverId) -> Option<Registration> {
        let registration = self.observers.remove(&id)?;
        self.by_kind.retain(|_, ids| {
            ids.retain(|&o| o != id);
            !ids.is_empty()
        });
        self.unindexed.retain(|&o| o != id);
        Some(registration)
    }

    /// Get a registration by ID.
    #[must_use]
    pub fn get(&self, id: ObserverId) -> Option<&Registration> {
        self.observers.get(&id)
    }

    /// Enable or disable an observer.
    pub fn set_enabled(&mut self, id: ObserverId, enabled: bool) {
        if let Some(registration) = self.observers.get_mut(&id) {
            registration.enabled = enabled;
        }
    }

    /// Observers that want `milestone`, in delivery order.
    pub fn matching(&self, milestone: &Milestone) -> Vec<&Registration> {
        let indexed = self.by_kind.get(&milestone.kind()).into_iter().flatten();
        let mut results: Vec<&Registration> = indexed
            .chain(self.unindexed.iter())
            .filter_map(|id| self.observers.get(id))
            .filter(|r| r.enabled && r.filter.matches(milestone))
            .collect();

        // Sort by priority (descending), then by id (ascending) for stability
        results.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        results.dedup_by_key(|r| r.id);
        results
    }

    /// Get total observer count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitId;

    struct Named(&'static str);

    impl MilestoneObserver for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn on_milestone(&self, _: &Milestone, _: &CaseManager, _: &mut ActionScope<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn names(registry: &ObserverRegistry, milestone: &Milestone) -> Vec<String> {
        registry
            .matching(milestone)
            .iter()
            .map(|r| r.observer.name().to_string())
            .collect()
    }

    #[test]
    fn test_priority_then_registration_order() {
        let mut registry = ObserverRegistry::new();
        registry.register(MilestoneFilter::Any, 0, Arc::new(Named("late")));
        registry.register(MilestoneFilter::Kind(MilestoneKind::Broken), 5, Arc::new(Named("high")));
        registry.register(MilestoneFilter::Any, 0, Arc::new(Named("later")));

        let broken = Milestone::Broken { unit: UnitId::new(1) };
        assert_eq!(names(&registry, &broken), vec!["high", "late", "later"]);
    }

    #[test]
    fn test_filters_are_applied() {
        let mut registry = ObserverRegistry::new();
        registry.register(MilestoneFilter::Kind(MilestoneKind::Broken), 0, Arc::new(Named("broken")));
        registry.register(MilestoneFilter::Unit(UnitId::new(2)), 0, Arc::new(Named("unit2")));
        registry.register(
            MilestoneFilter::kinds([MilestoneKind::Fled, MilestoneKind::Broken]),
            0,
            Arc::new(Named("routs")),
        );

        let fled = Milestone::Fled { unit: UnitId::new(2) };
        assert_eq!(names(&registry, &fled), vec!["unit2", "routs"]);
        let deployed = Milestone::UnitDeployed { unit: UnitId::new(1) };
        assert!(names(&registry, &deployed).is_empty());
    }

    #[test]
    fn test_unregister_and_disable() {
        let mut registry = ObserverRegistry::new();
        let a = registry.register(MilestoneFilter::Any, 0, Arc::new(Named("a")));
        let b = registry.register(MilestoneFilter::Kind(MilestoneKind::Destroyed), 0, Arc::new(Named("b")));
        let destroyed = Milestone::Destroyed { unit: UnitId::new(1) };

        registry.set_enabled(a, false);
        assert_eq!(names(&registry, &destroyed), vec!["b"]);
        assert!(registry.unregister(b).is_some());
        assert!(registry.unregister(b).is_none());
        assert!(names(&registry, &destroyed).is_empty());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(a).is_some());
    }
}
