//! Closing forward references over a type.

use std::rc::Rc;

use crate::errors::errors::FatalError;

use super::types::{ArrayType, FunctionType, StructType, Type};

/// Rebuilds `type_` with every `Unresolved` name replaced by what `lookup`
/// knows about it.
///
/// A single pass: a name is replaced by its current definition, which is not
/// itself resolved again. Names `lookup` does not know stay unresolved, so
/// the caller can run another pass once more declarations are in.
///
/// # Errors
///
/// Fails with [`FatalError::NestedReference`] if a replacement would put a
/// reference under a reference or a pointer.
pub fn resolve_with<F>(type_: &Type, lookup: &mut F) -> Result<Type, FatalError>
where
    F: FnMut(&str) -> Option<Type>,
{
    match type_ {
        Type::Nothing | Type::Unit | Type::Prim(_) => Ok(type_.clone()),
        Type::Unresolved(name) => Ok(lookup(name).unwrap_or_else(|| type_.clone())),
        Type::Function(function) => {
            let return_type = resolve_with(&function.return_type, lookup)?;
            let parameter_types = function
                .parameter_types
                .iter()
                .map(|parameter| resolve_with(parameter, lookup))
                .collect::<Result<Vec<Type>, FatalError>>()?;
            Ok(Type::Function(Rc::new(FunctionType::new(
                return_type,
                parameter_types,
            ))))
        }
        Type::Struct(structure) => {
            let fields = structure
                .fields
                .iter()
                .map(|field| field.map_type(|ty| resolve_with(ty, lookup)))
                .collect::<Result<Vec<_>, FatalError>>()?;
            Ok(Type::Struct(Rc::new(StructType {
                name: structure.name.clone(),
                fields,
                packed: structure.packed,
            })))
        }
        Type::Array(array) => Ok(Type::Array(Rc::new(ArrayType {
            element_type: resolve_with(&array.element_type, lookup)?,
            size: array.size,
            is_const: array.is_const,
        }))),
        Type::Reference(modifier) => {
            resolve_with(modifier.orig(), lookup)?.reference(modifier.is_const())
        }
        Type::Pointer(modifier) => {
            resolve_with(modifier.orig(), lookup)?.pointer(modifier.is_const())
        }
    }
}
