use std::rc::Rc;

use crate::{
    backend::builder::RawValue,
    types::types::{FunctionType, Type},
    values::values::{Value, ValueRef},
};

use super::scope::{Overload, OverloadTable, ScopeArena};

fn variable(raw: u32, type_: Type) -> ValueRef {
    ValueRef::new(RawValue(raw), type_, false).unwrap()
}

fn overload(raw: u32, return_type: Type, parameter_types: Vec<Type>) -> Overload {
    let signature = Rc::new(FunctionType::new(return_type, parameter_types));
    Overload {
        value: Value::new(RawValue(raw), Type::Function(Rc::clone(&signature))),
        signature,
    }
}

#[test]
fn test_lookup_walks_to_parent() {
    let mut arena = ScopeArena::new();
    let root = arena.root();
    arena.insert_type(root, "Int", Type::INT);
    arena.insert_variable(root, "x", variable(0, Type::INT));

    let child = arena.push(root);
    let grandchild = arena.push(child);

    assert_eq!(arena.lookup_type(grandchild, "Int"), Some(&Type::INT));
    assert_eq!(arena.lookup_variable(grandchild, "x").unwrap().orig(), &Type::INT);
    assert!(!arena.has_local_variable(grandchild, "x"));
    assert_eq!(arena.get(grandchild).parent, Some(child));
}

#[test]
fn test_shadowing_leaves_parent_untouched() {
    let mut arena = ScopeArena::new();
    let root = arena.root();
    arena.insert_variable(root, "x", variable(0, Type::INT));

    let child = arena.push(root);
    arena.insert_variable(child, "x", variable(1, Type::DOUBLE));

    assert_eq!(arena.lookup_variable(child, "x").unwrap().orig(), &Type::DOUBLE);
    assert_eq!(arena.lookup_variable(root, "x").unwrap().orig(), &Type::INT);
}

#[test]
fn test_child_declarations_are_invisible_to_siblings() {
    let mut arena = ScopeArena::new();
    let root = arena.root();
    let first = arena.push(root);
    let second = arena.push(root);

    arena.insert_type(first, "Local", Type::LONG);

    assert!(arena.lookup_type(first, "Local").is_some());
    assert!(arena.lookup_type(second, "Local").is_none());
    assert!(arena.lookup_type(root, "Local").is_none());
    assert_eq!(arena.len(), 3);
}

#[test]
fn test_insert_reports_replaced_binding() {
    let mut arena = ScopeArena::new();
    let root = arena.root();

    assert_eq!(arena.insert_type(root, "T", Type::INT), None);
    assert_eq!(arena.insert_type(root, "T", Type::LONG), Some(Type::INT));
    assert_eq!(arena.lookup_type(root, "T"), Some(&Type::LONG));
}

#[test]
fn test_overloads_keep_declaration_order() {
    let mut table = OverloadTable::new();
    table.insert("f", overload(0, Type::Unit, vec![Type::INT]));
    table.insert("f", overload(1, Type::Unit, vec![Type::LONG]));

    let overloads = table.get("f");
    assert_eq!(overloads.len(), 2);
    assert_eq!(overloads[0].signature.parameter_types, vec![Type::INT]);
    assert_eq!(overloads[1].signature.parameter_types, vec![Type::LONG]);
    assert!(table.get("g").is_empty());
}

#[test]
fn test_overload_with_same_parameters_is_replaced() {
    let mut table = OverloadTable::new();
    table.insert("f", overload(0, Type::Unit, vec![Type::INT]));

    let replaced = table.insert("f", overload(1, Type::INT, vec![Type::INT]));

    assert_eq!(replaced.unwrap().value.raw(), RawValue(0));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("f")[0].signature.return_type, Type::INT);
    assert!(table.contains("f", &[Type::INT]));
    assert!(!table.contains("f", &[Type::LONG]));
}

#[test]
fn test_declaring_scope_finds_nearest_binding() {
    let mut arena = ScopeArena::new();
    let root = arena.root();
    arena.insert_type(root, "Node", Type::INT);
    let child = arena.push(root);
    let grandchild = arena.push(child);

    assert_eq!(arena.declaring_scope(grandchild, "Node"), Some(root));

    arena.insert_type(child, "Node", Type::LONG);
    assert_eq!(arena.declaring_scope(grandchild, "Node"), Some(child));
    assert_eq!(arena.declaring_scope(grandchild, "Missing"), None);
}
