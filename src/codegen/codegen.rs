//! Compilation unit state and the per-scope code generation context.
//!
//! A [`CodegenUnit`] owns everything that lives as long as one compilation:
//! the backend, the arena of lexical scopes, the overload table and the
//! diagnostics sink. A [`CodegenContext`] is a short-lived view of the unit
//! positioned at one scope; entering a block or function body borrows a
//! child context through [`CodegenContext::sub_scope`].

use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::statements::{Prototype, StructDecl},
    backend::builder::Backend,
    errors::errors::{Diagnostics, ErrorImpl, FatalError},
    scope::scope::{Overload, OverloadTable, ScopeArena, ScopeId},
    types::{
        resolve::resolve_with,
        types::{default_types, FunctionType, Type},
    },
    values::values::{Value, ValueRef},
};

use super::options::CodegenOptions;

/// The function whose body is being generated.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFrame {
    pub name: String,
    pub value: Value,
    pub signature: Rc<FunctionType>,
}

/// The state shared by every scope of one compilation.
pub struct CodegenUnit<B: Backend> {
    /// The backend instructions are emitted into
    pub backend: B,
    scopes: ScopeArena,
    pub(super) functions: OverloadTable,
    diagnostics: Diagnostics,
    options: CodegenOptions,
}

impl<B: Backend> CodegenUnit<B> {
    /// Creates a new compilation unit.
    ///
    /// # Arguments
    ///
    /// * `backend` - The backend to emit into
    /// * `options` - Unit settings
    ///
    /// # Returns
    ///
    /// A unit whose root scope knows `Nothing`, `Unit` and every primitive
    /// by name.
    pub fn new(backend: B, options: CodegenOptions) -> Self {
        let mut scopes = ScopeArena::new();
        let root = scopes.root();
        for type_ in default_types() {
            scopes.insert_type(root, &type_.name(), type_);
        }
        debug!(module = %options.module_name, "new compilation unit");

        CodegenUnit {
            backend,
            scopes,
            functions: OverloadTable::new(),
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    /// A context positioned at the root scope.
    pub fn context(&mut self) -> CodegenContext<'_, B> {
        let scope = self.scopes.root();
        CodegenContext {
            unit: self,
            scope,
            function: None,
        }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    pub fn size_type(&self) -> Type {
        self.options.size_type()
    }

    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    pub fn functions(&self) -> &OverloadTable {
        &self.functions
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Asks the backend module to check itself. `None` when it is well
    /// formed, otherwise the backend's message.
    pub fn run_verify(&self) -> Option<String> {
        self.backend.verify()
    }

    /// Runs the configured pass pipeline, returning whether the module
    /// changed.
    pub fn run_passes(&mut self) -> bool {
        debug!(passes = ?self.options.passes.passes, "running passes");
        self.backend.run_passes(&self.options.passes)
    }
}

/// A view of a [`CodegenUnit`] at one lexical scope.
pub struct CodegenContext<'u, B: Backend> {
    pub(super) unit: &'u mut CodegenUnit<B>,
    scope: ScopeId,
    pub(super) function: Option<FunctionFrame>,
}

impl<'u, B: Backend> CodegenContext<'u, B> {
    /// A context for a fresh, empty scope chained to this one.
    ///
    /// The child shares the backend and the overload table; types and
    /// variables it declares are invisible here once it is dropped.
    pub fn sub_scope(&mut self) -> CodegenContext<'_, B> {
        let scope = self.unit.scopes.push(self.scope);
        CodegenContext {
            unit: &mut *self.unit,
            scope,
            function: self.function.clone(),
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn function(&self) -> Option<&FunctionFrame> {
        self.function.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.unit.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.unit.backend
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.unit.diagnostics
    }

    pub fn size_type(&self) -> Type {
        self.unit.size_type()
    }

    pub fn run_verify(&self) -> Option<String> {
        self.unit.run_verify()
    }

    pub fn run_passes(&mut self) -> bool {
        self.unit.run_passes()
    }

    pub(super) fn report(&mut self, error: ErrorImpl) {
        self.unit.diagnostics.push(error);
    }

    /// The type bound to `name` in the nearest enclosing scope.
    pub fn find_type(&self, name: &str) -> Option<Type> {
        self.unit.scopes.lookup_type(self.scope, name).cloned()
    }

    /// Like [`CodegenContext::find_type`], but a miss records an unknown
    /// type diagnostic and yields `Unresolved(name)` so the declaration using
    /// it can be resolved again later.
    pub fn lookup_type(&mut self, name: &str) -> Type {
        match self.find_type(name) {
            Some(type_) => type_,
            None => {
                self.report_unknown_type(name);
                Type::unresolved(name)
            }
        }
    }

    /// One resolution pass over `type_` against the types visible here.
    pub fn resolve(&self, type_: &Type) -> Result<Type, FatalError> {
        resolve_with(type_, &mut |name: &str| self.find_type(name))
    }

    fn resolve_rounds(&self, type_: &Type) -> Result<Type, FatalError> {
        let mut current = type_.clone();
        for _ in 0..self.unit.options.max_resolve_rounds {
            if current.is_resolved() {
                break;
            }
            let next = self.resolve(&current)?;
            if next == current {
                break;
            }
            current = next;
        }
        Ok(current)
    }

    fn report_unresolved(&mut self, type_: &Type, except: Option<&str>) {
        let mut names = vec![];
        type_.collect_unresolved(&mut names);
        for name in names {
            if except != Some(name.as_str()) {
                self.report_unknown_type(&name);
            }
        }
    }

    /// Records an unknown type diagnostic unless `name` already has one.
    fn report_unknown_type(&mut self, name: &str) {
        let reported = self.unit.diagnostics.iter().any(|error| {
            matches!(error.get_internal_error(), ErrorImpl::UnknownType { type_ } if type_ == name)
        });
        if !reported {
            self.report(ErrorImpl::UnknownType {
                type_: name.to_string(),
            });
        }
    }

    /// Resolves `type_` until no unresolved name remains or no further
    /// progress is made, then reports every name still unknown.
    pub fn resolve_fully(&mut self, type_: &Type) -> Result<Type, FatalError> {
        let resolved = self.resolve_rounds(type_)?;
        self.report_unresolved(&resolved, None);
        Ok(resolved)
    }

    /// Binds `name` to `type_` in the current scope.
    ///
    /// Redeclaring a name of the current scope is diagnosed and the new
    /// binding wins; shadowing an outer scope is allowed.
    pub fn declare_type(&mut self, name: &str, type_: Type) {
        if self.unit.scopes.has_local_type(self.scope, name) {
            self.report(ErrorImpl::TypeAlreadyDeclared {
                type_: name.to_string(),
            });
        }
        debug!(name, type_ = %type_, scope = self.scope.index(), "declare type");
        self.unit.scopes.insert_type(self.scope, name, type_);
    }

    /// Resolves the field types of `decl` and declares the resulting struct.
    ///
    /// A field referring to the struct itself keeps its name unresolved
    /// without a diagnostic.
    pub fn declare_struct(&mut self, decl: &StructDecl) -> Result<Type, FatalError> {
        let resolved = self.resolve_rounds(&decl.to_type())?;
        self.report_unresolved(&resolved, Some(decl.name.as_str()));
        self.declare_type(&decl.name, resolved.clone());
        Ok(resolved)
    }

    /// Runs one resolution pass over the type bound to `name` and rebinds
    /// the result in the scope that declared it, without a redeclaration
    /// diagnostic. Used once every member of a group of mutually recursive
    /// structs is declared.
    ///
    /// Returns `None` when no scope binds `name`.
    pub fn close_type(&mut self, name: &str) -> Result<Option<Type>, FatalError> {
        let owner = match self.unit.scopes.declaring_scope(self.scope, name) {
            Some(owner) => owner,
            None => return Ok(None),
        };
        let scopes = &self.unit.scopes;
        let resolved = match scopes.lookup_type(owner, name) {
            Some(current) => resolve_with(current, &mut |other: &str| {
                scopes.lookup_type(owner, other).cloned()
            })?,
            None => return Ok(None),
        };
        debug!(name, type_ = %resolved, scope = owner.index(), "close type");
        self.unit.scopes.insert_type(owner, name, resolved.clone());
        Ok(Some(resolved))
    }

    /// Allocates a local named `name` and initialises it with `value`.
    ///
    /// # Arguments
    ///
    /// * `name` - The variable name
    /// * `value` - The initial value; a reference is loaded first, and the
    ///   undefined sentinel leaves the storage uninitialised
    /// * `is_const` - Whether later stores through the variable are refused
    ///
    /// # Returns
    ///
    /// The addressable variable.
    pub fn declare_variable(
        &mut self,
        name: &str,
        value: &Value,
        is_const: bool,
    ) -> Result<ValueRef, FatalError> {
        let ir = &mut self.unit.backend;
        let value = value.deref(ir)?;
        let type_ = value.get_type().clone();

        let variable = if type_ == Type::Unit {
            ValueRef::unit(ir, is_const)?
        } else {
            let address = ir.alloca(&type_, name)?;
            if !ir.is_undefined(value.raw()) {
                ir.store(value.raw(), address)?;
            }
            ValueRef::new(address, type_, is_const)?
        };

        if self.unit.scopes.has_local_variable(self.scope, name) {
            self.report(ErrorImpl::VariableAlreadyDeclared {
                variable: name.to_string(),
            });
        }
        debug!(name, type_ = %variable.orig(), is_const, "declare variable");
        self.unit
            .scopes
            .insert_variable(self.scope, name, variable.clone());
        Ok(variable)
    }

    /// The variable `name` as a reference-typed value.
    ///
    /// A miss records a diagnostic and yields a poison value of type
    /// `Nothing`.
    pub fn lookup_variable(&mut self, name: &str) -> Result<Value, FatalError> {
        if let Some(variable) = self.unit.scopes.lookup_variable(self.scope, name) {
            return Ok(variable.as_value().clone());
        }
        self.report(ErrorImpl::VariableNotDeclared {
            variable: name.to_string(),
        });
        self.poison()
    }

    pub(super) fn poison(&mut self) -> Result<Value, FatalError> {
        let raw = self.unit.backend.undefined(&Type::Nothing)?;
        Ok(Value::new(raw, Type::Nothing))
    }

    /// Registers `value`, a function, as an overload of `name`.
    ///
    /// A second overload with the same parameter types is diagnosed and
    /// replaces the first.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::NotAFunction`] if `value` is not of a function
    /// type.
    pub fn declare_function(&mut self, name: &str, value: Value) -> Result<(), FatalError> {
        let signature = match value.get_type().as_function() {
            Some(signature) => Rc::clone(signature),
            None => {
                return Err(FatalError::NotAFunction {
                    name: name.to_string(),
                    found: value.get_type().to_string(),
                })
            }
        };

        if self.unit.functions.contains(name, &signature.parameter_types) {
            self.report(ErrorImpl::FunctionAlreadyDeclared {
                function: name.to_string(),
                parameters: signature.parameter_list(),
            });
        }
        debug!(name, signature = %signature, "declare function");
        self.unit
            .functions
            .insert(name, Overload { signature, value });
        Ok(())
    }

    fn declare_resolved(&mut self, prototype: &Prototype) -> Result<(Prototype, Value), FatalError> {
        let resolved = prototype.map_types(|type_| self.resolve_rounds(type_))?;
        let signature = Rc::new(resolved.signature());
        self.report_unresolved(&Type::Function(Rc::clone(&signature)), None);

        let handle = self
            .unit
            .backend
            .declare_function(&resolved.link_name(), &signature)?;
        let value = Value::new(handle, Type::Function(signature));
        self.declare_function(&resolved.name, value.clone())?;
        Ok((resolved, value))
    }

    /// Resolves `prototype`, declares it in the backend module under its
    /// link name and registers it as an overload.
    pub fn declare_prototype(&mut self, prototype: &Prototype) -> Result<Value, FatalError> {
        Ok(self.declare_resolved(prototype)?.1)
    }

    /// Declares `prototype` and starts its body.
    ///
    /// # Arguments
    ///
    /// * `prototype` - The function head
    ///
    /// # Returns
    ///
    /// A context for the function body, positioned in its entry block, in
    /// which every parameter is a mutable local.
    pub fn define_function(&mut self, prototype: &Prototype) -> Result<CodegenContext<'_, B>, FatalError> {
        let (resolved, function) = self.declare_resolved(prototype)?;
        let signature = match function.get_type().as_function() {
            Some(signature) => Rc::clone(signature),
            None => {
                return Err(FatalError::NotAFunction {
                    name: resolved.name.clone(),
                    found: function.get_type().to_string(),
                })
            }
        };

        let entry = self.unit.backend.append_block(function.raw(), "entry")?;
        self.unit.backend.position_at_end(entry)?;
        debug!(function = %resolved, "define function");

        let mut body = self.sub_scope();
        body.function = Some(FunctionFrame {
            name: resolved.name.clone(),
            value: function.clone(),
            signature,
        });
        for (index, parameter) in resolved.parameters.iter().enumerate() {
            let raw = body.unit.backend.param(function.raw(), index as u32)?;
            body.declare_variable(
                &parameter.name,
                &Value::new(raw, parameter.type_.clone()),
                false,
            )?;
        }
        Ok(body)
    }

    /// Returns `value` from the function being defined, converted to its
    /// return type. `Unit` and `Nothing` functions return nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::NoInsertionPoint`] outside a function body.
    pub fn ret(&mut self, value: &Value) -> Result<(), FatalError> {
        let return_type = self
            .function
            .as_ref()
            .ok_or(FatalError::NoInsertionPoint)?
            .signature
            .return_type
            .clone();

        match return_type {
            Type::Unit | Type::Nothing => self.unit.backend.ret(None)?,
            _ => {
                let value = self.implicit_cast(value, &return_type)?;
                self.unit.backend.ret(Some(value.raw()))?
            }
        }
        Ok(())
    }
}
