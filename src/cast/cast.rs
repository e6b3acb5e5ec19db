use tracing::trace;

use crate::{
    backend::builder::IrBuilder,
    errors::errors::FatalError,
    types::types::Type,
    values::values::Value,
};

use super::lift::lift_kind;

/// Whether a `from` converts to `dest` without cast syntax.
///
/// Succeeds when:
/// - `from` is `dest`
/// - `from` is `Nothing`
/// - `from` is `*Nothing` (the null literal) and `dest` is any pointer
/// - `from` is a reference whose target implicitly converts to `dest`
/// - both are pointers to the same type
pub fn can_implicitly_cast(from: &Type, dest: &Type) -> bool {
    if from == dest {
        return true;
    }
    match (from, dest) {
        (Type::Nothing, _) => true,
        (Type::Reference(reference), _) => can_implicitly_cast(reference.orig(), dest),
        (Type::Pointer(source), Type::Pointer(target)) => {
            source.orig() == &Type::Nothing || source.orig() == target.orig()
        }
        _ => false,
    }
}

/// Whether a `from` converts to `dest` with cast syntax.
pub fn can_explicitly_cast(from: &Type, dest: &Type) -> bool {
    if can_implicitly_cast(from, dest) {
        return true;
    }
    match (from, dest) {
        (Type::Reference(reference), _) => can_explicitly_cast(reference.orig(), dest),
        (Type::Pointer(_), Type::Pointer(_)) => true,
        (Type::Pointer(_), Type::Prim(prim)) => prim.is_integral(),
        (Type::Prim(_), Type::Prim(_)) => lift_kind(from, dest).is_some(),
        _ => false,
    }
}

fn fail(from: &Value, dest: &Type) -> FatalError {
    FatalError::IllegalCast {
        from: from.get_type().to_string(),
        to: dest.to_string(),
    }
}

/// Converts `from` to `dest` the way an assignment, argument or return
/// boundary does.
///
/// # Errors
///
/// Returns [`FatalError::IllegalCast`] naming both types when
/// [`can_implicitly_cast`] refuses the pair.
pub fn implicit_cast<B: IrBuilder + ?Sized>(
    ir: &mut B,
    from: &Value,
    dest: &Type,
) -> Result<Value, FatalError> {
    if !can_implicitly_cast(from.get_type(), dest) {
        return Err(fail(from, dest));
    }
    emit_implicit(ir, from, dest)
}

fn emit_implicit<B: IrBuilder + ?Sized>(
    ir: &mut B,
    from: &Value,
    dest: &Type,
) -> Result<Value, FatalError> {
    let type_ = from.get_type();
    if type_ == dest {
        return Ok(from.clone());
    }
    trace!(from = %type_, to = %dest, "implicit cast");
    match type_ {
        // Control never reaches a value of the bottom type.
        Type::Nothing => Ok(Value::new(ir.undefined(dest)?, dest.clone())),
        Type::Reference(_) => {
            let loaded = from.deref(ir)?;
            emit_implicit(ir, &loaded, dest)
        }
        _ => Ok(Value::new(ir.bit_cast(from.raw(), dest)?, dest.clone())),
    }
}

/// Converts `from` to `dest` as requested by cast syntax.
///
/// On top of the implicit conversions this allows bit-casting between any
/// two pointers, pointer to integral conversion and every primitive
/// conversion numeric lifting has an opcode for.
///
/// # Errors
///
/// Returns [`FatalError::IllegalCast`] naming both types otherwise.
pub fn explicit_cast<B: IrBuilder + ?Sized>(
    ir: &mut B,
    from: &Value,
    dest: &Type,
) -> Result<Value, FatalError> {
    if !can_explicitly_cast(from.get_type(), dest) {
        return Err(fail(from, dest));
    }
    emit_explicit(ir, from, dest)
}

fn emit_explicit<B: IrBuilder + ?Sized>(
    ir: &mut B,
    from: &Value,
    dest: &Type,
) -> Result<Value, FatalError> {
    let type_ = from.get_type();
    if can_implicitly_cast(type_, dest) {
        return emit_implicit(ir, from, dest);
    }
    trace!(from = %type_, to = %dest, "explicit cast");
    match (type_, dest) {
        (Type::Reference(_), _) => {
            let loaded = from.deref(ir)?;
            emit_explicit(ir, &loaded, dest)
        }
        (Type::Pointer(_), Type::Pointer(_)) => {
            Ok(Value::new(ir.bit_cast(from.raw(), dest)?, dest.clone()))
        }
        (Type::Pointer(_), Type::Prim(_)) => {
            Ok(Value::new(ir.ptr_to_int(from.raw(), dest)?, dest.clone()))
        }
        _ => {
            let opcode = lift_kind(type_, dest).ok_or_else(|| fail(from, dest))?;
            Ok(Value::new(ir.cast(opcode, from.raw(), dest)?, dest.clone()))
        }
    }
}
