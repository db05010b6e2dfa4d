//! Utility types shared across the runtime.
//!
//! - [`Ref`] - environment-scoped unique reference used by monitors and timers

pub mod ids;

pub use ids::Ref;
