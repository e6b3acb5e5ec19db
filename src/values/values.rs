use tracing::trace;

use crate::{
    backend::builder::{IrBuilder, RawValue},
    errors::errors::FatalError,
    types::types::Type,
};

/// A backend value tagged with its type.
///
/// A value whose type is a reference is addressable: [`Value::deref`] loads
/// through it and [`Value::as_value_ref`] exposes the store side.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    raw: RawValue,
    type_: Type,
}

impl Value {
    pub fn new(raw: RawValue, type_: Type) -> Self {
        Value { raw, type_ }
    }

    /// The fixed value of type `Unit`.
    pub fn unit<B: IrBuilder + ?Sized>(ir: &mut B) -> Result<Value, FatalError> {
        Ok(Value::new(ir.undefined(&Type::Unit)?, Type::Unit))
    }

    pub fn raw(&self) -> RawValue {
        self.raw
    }

    pub fn get_type(&self) -> &Type {
        &self.type_
    }

    /// The rvalue of this value: loads through a reference, and is the
    /// identity on everything else.
    pub fn deref<B: IrBuilder + ?Sized>(&self, ir: &mut B) -> Result<Value, FatalError> {
        match self.as_value_ref() {
            Some(reference) => reference.deref(ir),
            None => Ok(self.clone()),
        }
    }

    pub fn as_value_ref(&self) -> Option<ValueRef> {
        match &self.type_ {
            Type::Reference(modifier) => Some(ValueRef {
                value: self.clone(),
                orig: modifier.orig().clone(),
                is_const: modifier.is_const(),
            }),
            _ => None,
        }
    }
}

/// An addressable value of type `Reference(orig, is_const)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRef {
    value: Value,
    orig: Type,
    is_const: bool,
}

impl ValueRef {
    /// Wraps the address of a storage location holding an `orig`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::NestedReference`] if `orig` is a reference.
    pub fn new(address: RawValue, orig: Type, is_const: bool) -> Result<Self, FatalError> {
        let type_ = orig.reference(is_const)?;
        Ok(ValueRef {
            value: Value::new(address, type_),
            orig,
            is_const,
        })
    }

    /// The zero-sized reference to `Unit`: storing through it does nothing
    /// and loading from it yields the unit value.
    pub fn unit<B: IrBuilder + ?Sized>(ir: &mut B, is_const: bool) -> Result<Self, FatalError> {
        let address = ir.const_null(&Type::Unit.pointer(is_const)?)?;
        ValueRef::new(address, Type::Unit, is_const)
    }

    pub fn orig(&self) -> &Type {
        &self.orig
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Stores `value` into the referenced location.
    ///
    /// The caller is responsible for `value` already having type `orig`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::ConstViolation`] without emitting anything when
    /// the reference is const.
    pub fn store<B: IrBuilder + ?Sized>(&self, ir: &mut B, value: &Value) -> Result<(), FatalError> {
        if self.orig == Type::Unit {
            return Ok(());
        }
        if self.is_const {
            return Err(FatalError::ConstViolation {
                target: self.value.get_type().to_string(),
            });
        }
        trace!(target_type = %self.value.get_type(), "store");
        ir.store(value.raw(), self.value.raw())?;
        Ok(())
    }

    pub fn deref<B: IrBuilder + ?Sized>(&self, ir: &mut B) -> Result<Value, FatalError> {
        if self.orig == Type::Unit {
            return Value::unit(ir);
        }
        let loaded = ir.load(self.value.raw(), &self.orig)?;
        Ok(Value::new(loaded, self.orig.clone()))
    }
}
