//! Core acquisition logic.
//!
//! This module contains:
//! - RetryPolicy: bounded retry budget for downloads
//! - Conflict: policy and resolvers for pre-existing output
//! - Progress: counter shared by concurrent workers
//! - AcquisitionEngine: materializes one catalog entry
//! - BatchOrchestrator: plans conflicts and runs units in parallel

pub mod conflict;
pub mod engine;
pub mod orchestrator;
pub mod progress;
pub mod retry;

// Re-export commonly used types
pub use conflict::{
    resolver_for, ConflictDecision, ConflictError, ConflictPolicy, ConflictResolver,
    FixedResolver, PromptResolver,
};
pub use engine::{file_name_of, AcquireError, AcquisitionEngine};
pub use orchestrator::{BatchOrchestrator, BatchReport, PlannedUnit, UnitGroup, UnitOutcome};
pub use progress::Progress;
pub use retry::RetryPolicy;
