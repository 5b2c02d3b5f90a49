//! Activation decision pipeline.
//!
//! # Responsibility
//! - Track which enabled extensions have activated against visible documents.
//! - Resolve activated extensions to loadable script urls, memoized per url.
//! - Drive both stages from live settings and document inputs.
//!
//! # Invariants
//! - The activated set only grows for the lifetime of an engine.
//! - A script url is handed to the host at most once per resolver.
//! - Per-extension failures become diagnostics, never stream errors.

pub mod activation;
pub mod pipeline;
pub mod resolver;
