//! Code generation module.
//!
//! This module ties the type lattice, the cast engine and the backend
//! together: declarations, scope management, overload resolution and the
//! expression-level operations a driver calls while walking the AST.
//!
//! Recoverable errors (unknown names, redeclarations, unresolved or
//! ambiguous calls) are recorded in the unit's diagnostics and replaced by a
//! poison value; everything the type system cannot satisfy is returned as a
//! [`crate::errors::errors::FatalError`].

pub mod codegen;
pub mod expr;
pub mod options;

#[cfg(test)]
mod tests;
