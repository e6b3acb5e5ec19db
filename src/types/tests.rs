//! Unit tests for the type lattice.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use super::resolve::resolve_with;
use super::types::{default_types, Prim, Type, TypedName};
use crate::errors::errors::FatalError;

fn point() -> Type {
    Type::structure(
        "Point",
        vec![TypedName::new("x", Type::INT), TypedName::new("y", Type::INT)],
        false,
    )
}

#[test]
fn test_primitives_are_singletons() {
    assert_eq!(Type::INT, Type::Prim(Prim::Int));
    assert_ne!(Type::SHORT, Type::CHAR);
    assert_eq!(Type::SHORT.as_prim().unwrap().bit_size(), 16);
    assert_eq!(Type::CHAR.as_prim().unwrap().bit_size(), 16);
}

#[test]
fn test_prim_properties() {
    assert!(Prim::Boolean.is_integral());
    assert!(!Prim::Boolean.is_signed());
    assert_eq!(Prim::Boolean.bit_size(), 1);
    assert!(Prim::Long.is_signed());
    assert!(!Prim::ULong.is_signed());
    assert!(Prim::Double.is_real());
    assert_eq!(Prim::UInt.fold_sign("s", "u"), "u");
}

#[test]
fn test_structural_equality() {
    assert_eq!(
        Type::function(Type::INT, vec![Type::LONG]),
        Type::function(Type::INT, vec![Type::LONG])
    );
    assert_ne!(
        Type::function(Type::INT, vec![Type::LONG]),
        Type::function(Type::INT, vec![Type::ULONG])
    );
    assert_eq!(point(), point());
    assert_eq!(
        Type::array(Type::BYTE, 4, true),
        Type::array(Type::BYTE, 4, true)
    );
    assert_ne!(
        Type::array(Type::BYTE, 4, true),
        Type::array(Type::BYTE, 4, false)
    );
    assert_eq!(
        Type::INT.pointer(false).unwrap(),
        Type::INT.pointer(false).unwrap()
    );
}

#[test]
fn test_reference_of_reference_is_rejected() {
    let reference = Type::INT.reference(false).unwrap();

    assert!(matches!(
        reference.reference(true),
        Err(FatalError::NestedReference { modifier: "reference", .. })
    ));
    assert!(matches!(
        reference.pointer(false),
        Err(FatalError::NestedReference { modifier: "pointer", .. })
    ));
}

#[test]
fn test_pointer_to_pointer_is_allowed() {
    let pointer = Type::INT.pointer(false).unwrap();
    let double_pointer = pointer.pointer(true).unwrap();
    assert_eq!(double_pointer.as_modifier().unwrap().orig(), &pointer);
    assert!(pointer.reference(false).is_ok());
}

#[test]
fn test_display_names() {
    assert_eq!(Type::INT.to_string(), "Int");
    assert_eq!(Type::INT.reference(true).unwrap().to_string(), "&const (Int)");
    assert_eq!(Type::INT.pointer(false).unwrap().to_string(), "*(Int)");
    assert_eq!(Type::array(Type::BYTE, 4, true).to_string(), "[const Byte, 4]");
    assert_eq!(
        Type::function(Type::INT, vec![Type::INT, Type::LONG]).to_string(),
        "Int(Int, Long)"
    );
    assert_eq!(point().to_string(), "Point");
}

#[test]
fn test_struct_field_lookup() {
    let point = point();
    let structure = point.as_struct().unwrap();

    assert_eq!(structure.index_of("y").unwrap(), 1);
    assert_eq!(structure.field("x").unwrap().type_, Type::INT);
    assert_eq!(
        structure.field("z"),
        Err(FatalError::NoSuchMember {
            structure: "Point".to_string(),
            member: "z".to_string()
        })
    );
}

#[test]
fn test_reference_to_array_decays_to_pointer() {
    let array = Type::array(Type::INT, 8, true);
    let reference = array.reference(false).unwrap();

    assert_eq!(reference.as_pointer(), Some(Type::INT.pointer(true).unwrap()));
    let pointer = Type::LONG.pointer(false).unwrap();
    assert_eq!(pointer.as_pointer(), Some(pointer.clone()));
    assert_eq!(Type::INT.reference(false).unwrap().as_pointer(), None);
    assert_eq!(Type::INT.as_pointer(), None);
}

#[test]
fn test_default_types() {
    let names: Vec<String> = default_types().iter().map(|ty| ty.name()).collect();
    assert_eq!(names.len(), 14);
    assert_eq!(names[0], "Nothing");
    assert_eq!(names[1], "Unit");
    assert!(names.contains(&"ULong".to_string()));
}

#[test]
fn test_resolve_nested_unresolved() {
    let mut known = HashMap::new();
    known.insert("Point".to_string(), point());

    let unresolved = Type::function(
        Type::unresolved("Point"),
        vec![
            Type::array(Type::unresolved("Point"), 2, false),
            Type::unresolved("Point").pointer(false).unwrap(),
        ],
    );
    assert!(!unresolved.is_resolved());

    let resolved = resolve_with(&unresolved, &mut |name| known.get(name).cloned()).unwrap();

    assert!(resolved.is_resolved());
    assert_eq!(
        resolved,
        Type::function(
            point(),
            vec![
                Type::array(point(), 2, false),
                point().pointer(false).unwrap()
            ]
        )
    );
}

#[test]
fn test_resolve_keeps_unknown_names() {
    let structure = Type::structure(
        "Node",
        vec![
            TypedName::new("value", Type::INT),
            TypedName::new("other", Type::unresolved("Other")),
        ],
        true,
    );

    let resolved = resolve_with(&structure, &mut |_| None).unwrap();

    assert_eq!(resolved, structure);
    let mut names = vec![];
    resolved.collect_unresolved(&mut names);
    assert_eq!(names, vec!["Other".to_string()]);
}

#[test]
fn test_resolve_primitives_are_fixed_points() {
    for ty in &default_types() {
        assert_eq!(&resolve_with(ty, &mut |_| None).unwrap(), ty);
    }
}

#[test]
fn test_resolve_rejects_reference_under_modifier() {
    let aliased = Type::INT.reference(false).unwrap();
    let pointer = Type::unresolved("Alias").pointer(false).unwrap();

    let result = resolve_with(&pointer, &mut |_| Some(aliased.clone()));

    assert!(matches!(result, Err(FatalError::NestedReference { .. })));
}
