//! Symbol tables used during code generation.
//!
//! Types and variables live in cascading lexical scopes stored in an arena
//! and linked by parent index. Functions live in a separate global overload
//! table, since overloads are resolved by signature rather than by nesting.

pub mod scope;

#[cfg(test)]
mod tests;
