//! Unit & Combat Case Manager.
//!
//! Owns the lifecycle of units, combats and spell effects, and delivers
//! milestones to observers.
//!
//! ## Key Types
//!
//! - `UnitStatus` / `StatusTrigger`: the per-unit state machine
//! - `Combat`: a set of engaged units
//! - `Milestone`: a lifecycle event other components react to
//! - `CaseManager`: applies transitions and dispatches milestones
//! - `ActionScope`: the proposed state and milestone queue of one action
//!
//! ## Delivery
//!
//! Milestones go into a FIFO queue on the action scope. `dispatch` drains
//! it, so milestones raised by observers (a panic test failing because a
//! neighbour broke) are delivered before the action returns.

pub mod combat;
pub mod manager;
pub mod milestone;
pub mod observer;
pub mod reactions;
pub mod scope;
pub mod status;

pub use combat::{Combat, CombatState, DeclaredCharge};
pub use manager::CaseManager;
pub use milestone::{Milestone, MilestoneFilter, MilestoneKind};
pub use observer::{MilestoneObserver, ObserverId, ObserverRegistry, Registration};
pub use reactions::{take_panic_test, CombatCleanupObserver, PanicObserver, SpellLifecycleObserver};
pub use scope::ActionScope;
pub use status::{can_transition, StatusTrigger, UnitStatus};
