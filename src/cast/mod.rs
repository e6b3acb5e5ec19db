//! The cast engine.
//!
//! Implicit casts are what the compiler inserts at assignment, argument and
//! return boundaries; explicit casts extend them with pointer reinterpretation
//! and numeric conversions. Numeric opcode selection and the common type of
//! binary operands live in [`lift`].

pub mod cast;
pub mod lift;
