//! The type lattice.
//!
//! This module defines every type the language can express:
//!
//! - Primitive integrals (including the 1-bit boolean) and reals
//! - The `Nothing` bottom type and the zero-sized `Unit`
//! - Functions, structs and fixed-size arrays
//! - Reference and pointer modifiers, which never wrap a reference
//! - `Unresolved` placeholders for forward-referenced names
//!
//! Forward references are closed with [`resolve::resolve_with`] once the
//! definitions they name are known.

pub mod resolve;
pub mod types;

#[cfg(test)]
mod tests;
