pub mod controller;
pub mod engine;
pub mod state;
pub mod store;

pub use controller::{EnforcementController, TickReport};
pub use engine::{EnforcementPolicy, Enforcer, Notice, TickOutcome};
pub use state::{EnforcementPhase, UsageAccumulator, UsageState};
pub use store::DeadlineStore;
