use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use crate::{
    types::types::{FunctionType, Type},
    values::values::{Value, ValueRef},
};

/// Index of a scope inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single lexical scope: the types and variables declared directly in it
/// and the scope it cascades to.
#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    types: HashMap<String, Type>,
    variables: HashMap<String, ValueRef>,
}

/// Every scope created during a compilation, addressed by [`ScopeId`].
///
/// Lookups start in a given scope and walk parent indices outward, stopping
/// at the first hit. Insertion only ever touches the scope it is given, so a
/// child never writes into its parent.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        ScopeArena::new()
    }
}

impl ScopeArena {
    /// Creates an arena holding only the root scope.
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Creates an empty scope chained to `parent`.
    ///
    /// # Arguments
    ///
    /// * `parent` - The scope lookups fall back to
    ///
    /// # Returns
    ///
    /// The id of the new scope.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Default::default()
        });
        debug!(scope = id.0, parent = parent.0, "new scope");
        id
    }

    pub fn get(&self, scope: ScopeId) -> &Scope {
        &self.scopes[scope.index()]
    }

    fn walk<'a, T, F>(&'a self, scope: ScopeId, find: F) -> Option<&'a T>
    where
        F: Fn(&'a Scope) -> Option<&'a T>,
    {
        let mut current = Some(scope);
        while let Some(id) = current {
            let record = &self.scopes[id.index()];
            if let Some(found) = find(record) {
                return Some(found);
            }
            current = record.parent;
        }
        None
    }

    /// The type named `name` in the nearest scope declaring it.
    pub fn lookup_type(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        self.walk(scope, |record| record.types.get(name))
    }

    /// The nearest scope, starting at `scope`, that binds the type `name`.
    pub fn declaring_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let record = &self.scopes[id.index()];
            if record.types.contains_key(name) {
                return Some(id);
            }
            current = record.parent;
        }
        None
    }

    /// The variable named `name` in the nearest scope declaring it.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<&ValueRef> {
        self.walk(scope, |record| record.variables.get(name))
    }

    pub fn has_local_type(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope).types.contains_key(name)
    }

    pub fn has_local_variable(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope).variables.contains_key(name)
    }

    /// Binds `name` to `type_` in `scope`, returning the binding it replaced.
    pub fn insert_type(&mut self, scope: ScopeId, name: &str, type_: Type) -> Option<Type> {
        self.scopes[scope.index()]
            .types
            .insert(name.to_string(), type_)
    }

    /// Binds `name` to `variable` in `scope`, returning the binding it
    /// replaced.
    pub fn insert_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        variable: ValueRef,
    ) -> Option<ValueRef> {
        self.scopes[scope.index()]
            .variables
            .insert(name.to_string(), variable)
    }
}

/// One function registered under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    pub signature: Rc<FunctionType>,
    pub value: Value,
}

/// The global, non-cascading multimap of function overloads.
///
/// Overloads under one name keep their declaration order; at most one
/// overload exists per parameter list.
#[derive(Debug, Default)]
pub struct OverloadTable {
    overloads: HashMap<String, Vec<Overload>>,
}

impl OverloadTable {
    pub fn new() -> Self {
        OverloadTable::default()
    }

    /// Every overload named `name`, in declaration order.
    pub fn get(&self, name: &str) -> &[Overload] {
        self.overloads
            .get(name)
            .map(|overloads| overloads.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str, parameter_types: &[Type]) -> bool {
        self.get(name)
            .iter()
            .any(|overload| overload.signature.parameter_types == parameter_types)
    }

    /// Registers `overload` under `name`.
    ///
    /// An overload with the same parameter types is replaced in place and
    /// returned.
    pub fn insert(&mut self, name: &str, overload: Overload) -> Option<Overload> {
        let overloads = self.overloads.entry(name.to_string()).or_default();
        match overloads
            .iter_mut()
            .find(|existing| existing.signature.parameter_types == overload.signature.parameter_types)
        {
            Some(existing) => Some(std::mem::replace(existing, overload)),
            None => {
                overloads.push(overload);
                None
            }
        }
    }

    /// Total number of overloads across all names.
    pub fn len(&self) -> usize {
        self.overloads.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
