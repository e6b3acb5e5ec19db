//! Typed values.
//!
//! A [`values::Value`] pairs an opaque backend handle with its type. A
//! [`values::ValueRef`] is the addressable flavour: it can be loaded from
//! and, unless const, stored through.

pub mod values;
