//! Local orchestrator for the util provider
//!
//! The engine drives the provider the way an orchestrator would:
//! 1. Session - Configure the provider once
//! 2. Planning - Refresh state and diff it against configuration
//! 3. Executing - Invoke lifecycle verbs and fold responses into state

pub mod display;
pub mod executor;
pub mod planner;
pub mod session;

pub use executor::{execute, reconcile};
pub use planner::{Plan, PlanMode, plan};
pub use session::Session;
