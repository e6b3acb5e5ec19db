//! Expression-level code generation: calls and overload resolution, casts,
//! assignment, arithmetic, comparison and conditionals.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    backend::builder::{ArithOp, Backend, BlockId, IntPredicate},
    cast::{
        cast::{can_implicitly_cast, explicit_cast, implicit_cast},
        lift::{lift, unify},
    },
    errors::errors::{ErrorImpl, FatalError},
    scope::scope::Overload,
    types::types::{FunctionType, Type},
    values::values::Value,
};

use super::codegen::CodegenContext;

fn describe(name: &str, signature: &FunctionType) -> String {
    format!("{}({})", name, signature.parameter_list())
}

impl<'u, B: Backend> CodegenContext<'u, B> {
    /// Picks the overload of `name` a call with `argument_types` goes to.
    ///
    /// Failures are recorded as diagnostics. An ambiguous call reports the
    /// first two applicable overloads and still selects the first one.
    fn select_overload(&mut self, argument_types: &[Type], name: &str) -> Option<Overload> {
        let overloads = self.unit.functions.get(name).to_vec();
        if overloads.is_empty() {
            self.report(ErrorImpl::FunctionNotDeclared {
                function: name.to_string(),
            });
            return None;
        }

        let applicable: Vec<&Overload> = overloads
            .iter()
            .filter(|overload| {
                let parameters = &overload.signature.parameter_types;
                parameters.len() == argument_types.len()
                    && argument_types
                        .iter()
                        .zip(parameters)
                        .all(|(argument, parameter)| can_implicitly_cast(argument, parameter))
            })
            .collect();

        match applicable.as_slice() {
            [] => {
                self.report(ErrorImpl::NoMatchingOverload {
                    function: name.to_string(),
                    arguments: argument_types
                        .iter()
                        .map(|type_| type_.to_string())
                        .collect::<Vec<String>>()
                        .join(", "),
                    candidates: overloads
                        .iter()
                        .map(|overload| describe(name, &overload.signature))
                        .collect(),
                });
                None
            }
            [only] => {
                debug!(name, signature = %only.signature, "call resolved");
                Some((*only).clone())
            }
            [first, second, ..] => {
                self.report(ErrorImpl::AmbiguousCall {
                    function: name.to_string(),
                    first: describe(name, &first.signature),
                    second: describe(name, &second.signature),
                });
                Some((*first).clone())
            }
        }
    }

    /// Resolves a call of `name` with arguments of `argument_types`.
    ///
    /// # Returns
    ///
    /// The selected signature, or the never-callable `Nothing()` when no
    /// overload applies. Either way failures end up in the diagnostics.
    pub fn resolve_call(&mut self, argument_types: &[Type], name: &str) -> Rc<FunctionType> {
        match self.select_overload(argument_types, name) {
            Some(overload) => overload.signature,
            None => Rc::new(FunctionType::new(Type::Nothing, vec![])),
        }
    }

    /// Emits a call of `name`, converting each argument to its parameter
    /// type.
    ///
    /// An unresolved call emits nothing and yields a poison value of type
    /// `Nothing`.
    pub fn call(&mut self, name: &str, arguments: &[Value]) -> Result<Value, FatalError> {
        let argument_types: Vec<Type> = arguments
            .iter()
            .map(|argument| argument.get_type().clone())
            .collect();
        let overload = match self.select_overload(&argument_types, name) {
            Some(overload) => overload,
            None => return self.poison(),
        };

        let mut raw_arguments = Vec::with_capacity(arguments.len());
        for (argument, parameter) in arguments.iter().zip(&overload.signature.parameter_types) {
            raw_arguments.push(self.implicit_cast(argument, parameter)?.raw());
        }

        let return_type = overload.signature.return_type.clone();
        let ir = &mut self.unit.backend;
        let raw = match ir.call(overload.value.raw(), &overload.signature, &raw_arguments)? {
            Some(raw) => raw,
            None => ir.undefined(&return_type)?,
        };
        Ok(Value::new(raw, return_type))
    }

    pub fn implicit_cast(&mut self, value: &Value, dest: &Type) -> Result<Value, FatalError> {
        implicit_cast(&mut self.unit.backend, value, dest)
    }

    pub fn explicit_cast(&mut self, value: &Value, dest: &Type) -> Result<Value, FatalError> {
        explicit_cast(&mut self.unit.backend, value, dest)
    }

    /// Stores `value` through `target`, converting it to the target's type.
    /// Assigning through a unit reference emits nothing, const or not.
    ///
    /// # Errors
    ///
    /// - [`FatalError::NotAssignable`] if `target` is not a reference
    /// - [`FatalError::ConstViolation`] if it is a const one
    /// - [`FatalError::IllegalCast`] if `value` does not convert
    pub fn assign(&mut self, target: &Value, value: &Value) -> Result<(), FatalError> {
        let reference = target
            .as_value_ref()
            .ok_or_else(|| FatalError::NotAssignable {
                target: target.get_type().to_string(),
            })?;
        if reference.orig() == &Type::Unit {
            return Ok(());
        }
        if reference.is_const() {
            return Err(FatalError::ConstViolation {
                target: target.get_type().to_string(),
            });
        }
        let value = self.implicit_cast(value, reference.orig())?;
        reference.store(&mut self.unit.backend, &value)
    }

    /// Loads both operands and lifts them to their unified type.
    fn operands(&mut self, lhs: &Value, rhs: &Value) -> Result<(Value, Value), FatalError> {
        let ir = &mut self.unit.backend;
        let lhs = lhs.deref(ir)?;
        let rhs = rhs.deref(ir)?;
        let type_ = unify(lhs.get_type(), rhs.get_type())?;
        trace!(lhs = %lhs.get_type(), rhs = %rhs.get_type(), unified = %type_, "operands");
        Ok((lift(ir, &lhs, &type_)?, lift(ir, &rhs, &type_)?))
    }

    pub fn arithmetic(&mut self, op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, FatalError> {
        let (lhs, rhs) = self.operands(lhs, rhs)?;
        let raw = self.unit.backend.arithmetic(op, lhs.raw(), rhs.raw())?;
        Ok(Value::new(raw, lhs.get_type().clone()))
    }

    /// Compares two operands, yielding a `Boolean`.
    pub fn compare(
        &mut self,
        predicate: IntPredicate,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<Value, FatalError> {
        let (lhs, rhs) = self.operands(lhs, rhs)?;
        let raw = self.unit.backend.icmp(predicate, lhs.raw(), rhs.raw())?;
        Ok(Value::new(raw, Type::BOOLEAN))
    }

    /// Emits a conditional.
    ///
    /// # Arguments
    ///
    /// * `condition` - Converted to `Boolean`
    /// * `then_arm` - Generates the value of the `then` block, in a sub-scope
    /// * `else_arm` - Generates the value of the `else` block, in a sub-scope
    ///
    /// # Returns
    ///
    /// The value of the taken arm, joined by a phi in the merge block. Both
    /// arms are converted to the type of the `then` value, or to the type of
    /// the `else` value when the `then` arm is `Nothing` or already left its
    /// block. An arm ending in a terminator does not reach the merge block.
    /// A `Unit` conditional yields the unit value and no phi.
    pub fn branch<T, E>(&mut self, condition: &Value, then_arm: T, else_arm: E) -> Result<Value, FatalError>
    where
        T: FnOnce(&mut CodegenContext<'_, B>) -> Result<Value, FatalError>,
        E: FnOnce(&mut CodegenContext<'_, B>) -> Result<Value, FatalError>,
    {
        let function = self
            .function
            .as_ref()
            .ok_or(FatalError::NoInsertionPoint)?
            .value
            .raw();
        let condition = self.implicit_cast(condition, &Type::BOOLEAN)?;

        let ir = &mut self.unit.backend;
        let then_block = ir.append_block(function, "then")?;
        let else_block = ir.append_block(function, "else")?;
        let merge_block = ir.append_block(function, "merge")?;
        ir.cond_br(condition.raw(), then_block, else_block)?;

        self.unit.backend.position_at_end(then_block)?;
        let then_value = then_arm(&mut self.sub_scope())?;
        let then_exit = self.arm_exit(then_value)?;

        self.unit.backend.position_at_end(else_block)?;
        let else_value = else_arm(&mut self.sub_scope())?;
        let else_exit = self.arm_exit(else_value)?;

        let type_ = match (&then_exit, &else_exit) {
            (Some((value, _)), _) if value.get_type() != &Type::Nothing => value.get_type().clone(),
            (_, Some((value, _))) => value.get_type().clone(),
            (Some((value, _)), None) => value.get_type().clone(),
            (None, None) => Type::Nothing,
        };

        let mut incoming = vec![];
        for (value, end) in then_exit.into_iter().chain(else_exit) {
            self.unit.backend.position_at_end(end)?;
            let value = self.implicit_cast(&value, &type_)?;
            self.unit.backend.br(merge_block)?;
            incoming.push((value.raw(), end));
        }
        trace!(type_ = %type_, arms = incoming.len(), "branch joined");

        self.unit.backend.position_at_end(merge_block)?;
        match (&type_, incoming.as_slice()) {
            (Type::Unit, _) => Value::unit(&mut self.unit.backend),
            (Type::Nothing, _) | (_, []) => self.poison(),
            (_, [(raw, _)]) => Ok(Value::new(*raw, type_.clone())),
            _ => {
                let raw = self.unit.backend.phi(&type_, &incoming)?;
                Ok(Value::new(raw, type_.clone()))
            }
        }
    }

    /// The loaded value of an arm and the block it ends in, or `None` when
    /// the arm already terminated its block.
    fn arm_exit(&mut self, value: Value) -> Result<Option<(Value, BlockId)>, FatalError> {
        let ir = &mut self.unit.backend;
        if ir.is_terminated() {
            return Ok(None);
        }
        let value = value.deref(ir)?;
        let end = ir.current_block().ok_or(FatalError::NoInsertionPoint)?;
        Ok(Some((value, end)))
    }

    /// The null constant of type `*type_`.
    pub fn null_pointer(&mut self, type_: &Type) -> Result<Value, FatalError> {
        let pointer = type_.pointer(false)?;
        let raw = self.unit.backend.const_null(&pointer)?;
        Ok(Value::new(raw, pointer))
    }

    /// The undefined sentinel of `type_`; declaring a variable with it
    /// leaves the storage uninitialised.
    pub fn undefined(&mut self, type_: &Type) -> Result<Value, FatalError> {
        let raw = self.unit.backend.undefined(type_)?;
        Ok(Value::new(raw, type_.clone()))
    }

    /// An integral constant.
    pub fn constant(&mut self, type_: &Type, value: u64) -> Result<Value, FatalError> {
        let raw = self.unit.backend.const_int(type_, value)?;
        Ok(Value::new(raw, type_.clone()))
    }
}
