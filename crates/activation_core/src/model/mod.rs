//! Value types flowing through the activation pipeline.
//!
//! # Responsibility
//! - Describe visible documents and extension descriptors as plain values.
//! - Keep every stage input comparable so unchanged outputs can be suppressed.
//!
//! # Invariants
//! - `ExecutableExtension` is only built for activated, enabled extensions
//!   whose script URL resolved to a value.

pub mod descriptor;
pub mod document;
