//! Error types and error handling for the compiler core.
//!
//! Two channels are kept apart:
//!
//! - Recoverable user errors (unknown names, redeclarations, ambiguous or
//!   unmatched calls) are collected in a [`errors::Diagnostics`] sink
//! - Fatal errors (illegal casts, const violations, nested references) are
//!   returned as [`errors::FatalError`] and propagated with `?`

pub mod errors;
