//! Extension manifest contracts.
//!
//! This module defines what the activation engine reads from a manifest:
//! declarative activation events and the script entry point. Loading and
//! sandboxed execution of the script belong to the host.

pub mod activation_event;
pub mod manifest;
