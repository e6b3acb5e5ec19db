//! Numeric lifting: conversion opcodes between primitives and the common
//! type of binary operands.

use tracing::trace;

use crate::{
    backend::builder::{CastOpcode, IrBuilder},
    errors::errors::FatalError,
    types::types::{Prim, Type},
    values::values::Value,
};

/// The opcode converting a `from` primitive into a `to` primitive, or
/// `None` when either side is not a primitive.
///
/// Integral widening follows the signedness of the *source*; float to
/// integral conversion follows the signedness of the *destination*.
pub fn lift_kind(from: &Type, to: &Type) -> Option<CastOpcode> {
    let (from, to) = (from.as_prim()?, to.as_prim()?);
    Some(prim_lift_kind(from, to))
}

fn prim_lift_kind(from: Prim, to: Prim) -> CastOpcode {
    match (from.is_real(), to.is_real()) {
        (false, false) => {
            if from.bit_size() > to.bit_size() {
                CastOpcode::Trunc
            } else if from.bit_size() == to.bit_size() {
                CastOpcode::BitCast
            } else {
                from.fold_sign(CastOpcode::SExt, CastOpcode::ZExt)
            }
        }
        (false, true) => from.fold_sign(CastOpcode::SIToFP, CastOpcode::UIToFP),
        (true, false) => to.fold_sign(CastOpcode::FPToSI, CastOpcode::FPToUI),
        (true, true) => {
            if from.bit_size() > to.bit_size() {
                CastOpcode::FPTrunc
            } else if from.bit_size() < to.bit_size() {
                CastOpcode::FPExt
            } else {
                CastOpcode::BitCast
            }
        }
    }
}

/// The type two primitive operands are lifted to before a binary
/// arithmetic or comparison operation.
///
/// Identical floats, doubles and booleans stay as they are. Otherwise the
/// wider type wins, and on equal width the unsigned one wins. Reals beat
/// integrals.
///
/// # Errors
///
/// Returns [`FatalError::UnsupportedUnify`] if either side is not a
/// primitive.
pub fn unify(lhs: &Type, rhs: &Type) -> Result<Type, FatalError> {
    let (a, b) = match (lhs.as_prim(), rhs.as_prim()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(FatalError::UnsupportedUnify {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
            })
        }
    };

    if a == b && matches!(a, Prim::Float | Prim::Double | Prim::Boolean) {
        return Ok(lhs.clone());
    }

    let unified = match (a.is_real(), b.is_real()) {
        (true, false) => a,
        (false, true) => b,
        _ => {
            if a.bit_size() > b.bit_size() {
                a
            } else if a.bit_size() < b.bit_size() {
                b
            } else if a.is_signed() && !b.is_signed() {
                b
            } else {
                // Short and Char tie on both counts; the left operand wins.
                a
            }
        }
    };

    Ok(Type::Prim(unified))
}

/// Converts a primitive value to `dest` for use as an operand.
///
/// # Errors
///
/// Returns [`FatalError::IllegalCast`] when no lifting opcode exists.
pub fn lift<B: IrBuilder + ?Sized>(ir: &mut B, from: &Value, dest: &Type) -> Result<Value, FatalError> {
    if from.get_type() == dest {
        return Ok(from.clone());
    }
    let opcode = lift_kind(from.get_type(), dest).ok_or_else(|| FatalError::IllegalCast {
        from: from.get_type().to_string(),
        to: dest.to_string(),
    })?;
    trace!(from = %from.get_type(), to = %dest, %opcode, "lift");
    Ok(Value::new(ir.cast(opcode, from.raw(), dest)?, dest.clone()))
}
