//! Unit tests for the code generation context.

use pretty_assertions::assert_eq;

use crate::{
    ast::statements::{Prototype, StructDecl},
    backend::{
        builder::{ArithOp, BackendModule, IntPredicate, Pass, PassPipeline},
        recording::{Instruction, RecordingBackend},
    },
    errors::errors::{ErrorImpl, FatalError},
    types::types::{Prim, Type, TypedName},
};

use super::{
    codegen::CodegenUnit,
    options::CodegenOptions,
};

fn unit() -> CodegenUnit<RecordingBackend> {
    CodegenUnit::new(RecordingBackend::new("test"), CodegenOptions::default())
}

fn unit_with_entry() -> CodegenUnit<RecordingBackend> {
    CodegenUnit::new(
        RecordingBackend::with_entry_block("test").unwrap(),
        CodegenOptions::default(),
    )
}

fn prototype(name: &str, parameters: Vec<(&str, Type)>, return_type: Type) -> Prototype {
    Prototype::new(
        vec![],
        name,
        parameters
            .into_iter()
            .map(|(name, type_)| TypedName::new(name, type_))
            .collect(),
        return_type,
    )
    .unwrap()
}

#[test]
fn test_default_options() {
    let options = CodegenOptions::default();

    assert_eq!(options.module_name, "main");
    assert_eq!(options.size_type(), Type::ULONG);
    assert_eq!(options.max_resolve_rounds, 8);
    assert_eq!(options.passes, PassPipeline::standard());

    let options = options
        .with_module_name("lib")
        .with_size_type(Prim::UInt)
        .with_max_resolve_rounds(0)
        .with_passes(PassPipeline::empty());
    assert_eq!(options.module_name, "lib");
    assert_eq!(options.size_type, Prim::UInt);
    assert_eq!(options.max_resolve_rounds, 1);
    assert!(options.passes.passes.is_empty());
}

#[test]
fn test_root_scope_knows_default_types() {
    let mut unit = unit();
    let mut context = unit.context();

    assert_eq!(context.lookup_type("Int"), Type::INT);
    assert_eq!(context.lookup_type("Nothing"), Type::Nothing);
    assert_eq!(context.lookup_type("Unit"), Type::Unit);
    assert_eq!(context.size_type(), Type::ULONG);
    assert!(context.diagnostics().is_empty());
}

#[test]
fn test_unknown_type_is_deferred() {
    let mut unit = unit();
    let mut context = unit.context();

    assert_eq!(context.lookup_type("Point"), Type::unresolved("Point"));
    assert_eq!(
        context.diagnostics().iter().next().unwrap().get_internal_error(),
        &ErrorImpl::UnknownType {
            type_: "Point".to_string()
        }
    );
}

#[test]
fn test_forward_reference_resolves_after_declaration() {
    let mut unit = unit();
    let mut context = unit.context();
    let pending = Type::unresolved("Point").pointer(false).unwrap();

    assert_eq!(context.resolve(&pending).unwrap(), pending);

    let point = context
        .declare_struct(&StructDecl::new(vec![], "Point", vec![TypedName::new("x", Type::INT)]).unwrap())
        .unwrap();

    assert_eq!(
        context.resolve_fully(&pending).unwrap(),
        point.pointer(false).unwrap()
    );
    assert!(context.diagnostics().is_empty());
}

#[test]
fn test_resolve_fully_reports_each_unknown_name_once() {
    let mut unit = unit();
    let mut context = unit.context();
    let type_ = Type::function(
        Type::unresolved("Missing"),
        vec![Type::unresolved("Missing"), Type::unresolved("Other")],
    );

    let resolved = context.resolve_fully(&type_).unwrap();

    assert_eq!(resolved, type_);
    assert_eq!(
        context.diagnostics().messages(),
        vec![
            "Unknown type \"Missing\"".to_string(),
            "Unknown type \"Other\"".to_string()
        ]
    );
}

#[test]
fn test_type_redeclaration_is_diagnosed_but_shadowing_is_not() {
    let mut unit = unit();
    let mut context = unit.context();
    context.declare_type("Size", Type::ULONG);

    {
        let mut inner = context.sub_scope();
        inner.declare_type("Size", Type::UINT);
        assert_eq!(inner.lookup_type("Size"), Type::UINT);
        assert!(inner.diagnostics().is_empty());
    }

    context.declare_type("Size", Type::LONG);
    assert_eq!(context.lookup_type("Size"), Type::LONG);
    assert_eq!(context.diagnostics().len(), 1);
}

#[test]
fn test_self_referential_struct_keeps_its_name() {
    let mut unit = unit();
    let mut context = unit.context();
    let next = Type::unresolved("Node").pointer(false).unwrap();
    let decl = StructDecl::new(vec![], "Node", vec![TypedName::new("next", next.clone())]).unwrap();

    let node = context.declare_struct(&decl).unwrap();

    assert_eq!(node.as_struct().unwrap().field("next").unwrap().type_, next);
    assert!(context.diagnostics().is_empty());
}

#[test]
fn test_declare_variable_allocates_and_stores() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let value = context.constant(&Type::INT, 4).unwrap();

    let variable = context.declare_variable("x", &value, false).unwrap();

    assert_eq!(variable.orig(), &Type::INT);
    let instructions = context.backend().instructions();
    assert!(matches!(instructions[0], Instruction::Alloca { name, .. } if name == "x"));
    assert!(matches!(
        instructions[1],
        Instruction::Store { value: stored, .. } if *stored == value.raw()
    ));
}

#[test]
fn test_declare_variable_with_undefined_skips_store() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let value = context.undefined(&Type::DOUBLE).unwrap();

    context.declare_variable("y", &value, true).unwrap();

    let instructions = context.backend().instructions();
    assert_eq!(instructions.len(), 1);
    assert!(matches!(instructions[0], Instruction::Alloca { .. }));
}

#[test]
fn test_lookup_of_unknown_variable_is_poison() {
    let mut unit = unit();
    let mut context = unit.context();

    let value = context.lookup_variable("ghost").unwrap();

    assert_eq!(value.get_type(), &Type::Nothing);
    assert_eq!(context.diagnostics().len(), 1);
}

#[test]
fn test_variable_redeclaration_in_same_scope() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let one = context.constant(&Type::INT, 1).unwrap();
    let two = context.constant(&Type::LONG, 2).unwrap();

    context.declare_variable("x", &one, false).unwrap();
    context.declare_variable("x", &two, false).unwrap();

    let x = context.lookup_variable("x").unwrap();
    assert_eq!(x.as_value_ref().unwrap().orig(), &Type::LONG);
    assert_eq!(
        context.diagnostics().messages(),
        vec!["Variable \"x\" already declared".to_string()]
    );
}

#[test]
fn test_declare_function_requires_function_type() {
    let mut unit = unit();
    let mut context = unit.context();
    let value = context.constant(&Type::INT, 0).unwrap();

    let error = context.declare_function("f", value).unwrap_err();

    assert_eq!(
        error,
        FatalError::NotAFunction {
            name: "f".to_string(),
            found: "Int".to_string()
        }
    );
}

#[test]
fn test_resolve_call_prefers_exact_match() {
    let mut unit = unit();
    let mut context = unit.context();
    context
        .declare_prototype(&prototype("f", vec![("a", Type::INT)], Type::Unit))
        .unwrap();
    context
        .declare_prototype(&prototype("f", vec![("a", Type::LONG)], Type::Unit))
        .unwrap();

    let signature = context.resolve_call(&[Type::INT], "f");

    assert_eq!(signature.parameter_types, vec![Type::INT]);
    assert!(context.diagnostics().is_empty());
}

#[test]
fn test_resolve_call_reports_ambiguity_and_picks_first() {
    let mut unit = unit();
    let mut context = unit.context();
    let int_ptr = Type::INT.pointer(false).unwrap();
    let long_ptr = Type::LONG.pointer(false).unwrap();
    context
        .declare_prototype(&prototype("f", vec![("p", int_ptr.clone())], Type::Unit))
        .unwrap();
    context
        .declare_prototype(&prototype("f", vec![("p", long_ptr)], Type::Unit))
        .unwrap();

    let null = Type::Nothing.pointer(false).unwrap();
    let signature = context.resolve_call(&[null], "f");

    assert_eq!(signature.parameter_types, vec![int_ptr]);
    assert_eq!(
        context.diagnostics().iter().next().unwrap().get_internal_error(),
        &ErrorImpl::AmbiguousCall {
            function: "f".to_string(),
            first: "f(*(Int))".to_string(),
            second: "f(*(Long))".to_string(),
        }
    );
}

#[test]
fn test_resolve_call_without_candidates_returns_sentinel() {
    let mut unit = unit();
    let mut context = unit.context();
    context
        .declare_prototype(&prototype("g", vec![("a", Type::INT)], Type::INT))
        .unwrap();

    let missing = context.resolve_call(&[], "h");
    let mismatched = context.resolve_call(&[Type::DOUBLE], "g");

    assert_eq!(missing.return_type, Type::Nothing);
    assert!(missing.parameter_types.is_empty());
    assert_eq!(mismatched.return_type, Type::Nothing);
    assert_eq!(
        context.diagnostics().messages(),
        vec![
            "No function named \"h\"".to_string(),
            "No matching function for call to \"g\" with argument types: (Double)".to_string(),
        ]
    );
}

#[test]
fn test_call_casts_arguments_and_types_result() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let function = context
        .declare_prototype(&prototype("id", vec![("a", Type::INT)], Type::INT))
        .unwrap();
    let argument = context.constant(&Type::INT, 3).unwrap();
    let variable = context.declare_variable("a", &argument, false).unwrap();

    let result = context.call("id", &[variable.as_value().clone()]).unwrap();

    assert_eq!(result.get_type(), &Type::INT);
    let instructions = context.backend().instructions();
    assert!(matches!(
        instructions[instructions.len() - 2],
        Instruction::Load { .. }
    ));
    assert!(matches!(
        instructions[instructions.len() - 1],
        Instruction::Call { function: callee, .. } if *callee == function.raw()
    ));
}

#[test]
fn test_failed_call_is_poison_without_emission() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();

    let result = context.call("nowhere", &[]).unwrap();

    assert_eq!(result.get_type(), &Type::Nothing);
    assert!(context.backend().instructions().is_empty());
    assert_eq!(context.diagnostics().len(), 1);
}

#[test]
fn test_define_function_binds_parameters_and_returns() {
    let mut unit = unit();
    {
        let mut context = unit.context();
        let mut body = context
            .define_function(&prototype(
                "add",
                vec![("a", Type::INT), ("b", Type::INT)],
                Type::LONG,
            ))
            .unwrap();
        let a = body.lookup_variable("a").unwrap();
        let b = body.lookup_variable("b").unwrap();
        let sum = body.arithmetic(ArithOp::Add, &a, &b).unwrap();
        let widened = body.explicit_cast(&sum, &Type::LONG).unwrap();
        body.ret(&widened).unwrap();
    }

    assert!(unit.diagnostics().is_empty());
    assert_eq!(unit.run_verify(), None);
    assert!(unit.backend.function("add(Int,Int):Long").is_some());
    assert!(matches!(
        unit.backend.instructions().last(),
        Some(Instruction::Ret { value: Some(_) })
    ));
}

#[test]
fn test_ret_outside_function_fails() {
    let mut unit = unit();
    let mut context = unit.context();
    let value = context.constant(&Type::INT, 0).unwrap();

    assert_eq!(context.ret(&value), Err(FatalError::NoInsertionPoint));
}

#[test]
fn test_assign_converts_and_respects_const() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let zero = context.constant(&Type::INT, 0).unwrap();
    let mutable = context.declare_variable("m", &zero, false).unwrap();
    let constant = context.declare_variable("c", &zero, true).unwrap();
    let reference = mutable.as_value().clone();

    context.assign(&reference, &constant.as_value().clone()).unwrap();
    assert!(matches!(
        context.backend().instructions().last(),
        Some(Instruction::Store { pointer, .. }) if *pointer == mutable.as_value().raw()
    ));

    let error = context.assign(constant.as_value(), &zero).unwrap_err();
    assert!(matches!(error, FatalError::ConstViolation { .. }));

    let error = context.assign(&zero, &zero).unwrap_err();
    assert_eq!(
        error,
        FatalError::NotAssignable {
            target: "Int".to_string()
        }
    );
}

#[test]
fn test_arithmetic_lifts_to_unified_type() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let lhs = context.constant(&Type::INT, 1).unwrap();
    let rhs = context.constant(&Type::UINT, 2).unwrap();

    let sum = context.arithmetic(ArithOp::Sub, &lhs, &rhs).unwrap();
    let less = context.compare(IntPredicate::Ult, &lhs, &rhs).unwrap();

    assert_eq!(sum.get_type(), &Type::UINT);
    assert_eq!(less.get_type(), &Type::BOOLEAN);
    assert!(matches!(
        context.backend().instructions()[1],
        Instruction::Arithmetic { op: ArithOp::Sub, .. }
    ));
}

#[test]
fn test_arithmetic_on_pointers_is_unsupported() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let pointer = context.null_pointer(&Type::INT).unwrap();
    let one = context.constant(&Type::INT, 1).unwrap();

    let error = context.arithmetic(ArithOp::Add, &pointer, &one).unwrap_err();

    assert!(matches!(error, FatalError::UnsupportedUnify { .. }));
}

#[test]
fn test_branch_joins_arms_with_phi() {
    let mut unit = unit();
    {
        let mut context = unit.context();
        let mut body = context
            .define_function(&prototype("pick", vec![("c", Type::BOOLEAN)], Type::LONG))
            .unwrap();
        let condition = body.lookup_variable("c").unwrap();
        let value = body
            .branch(
                &condition,
                |then| then.constant(&Type::LONG, 1),
                |otherwise| otherwise.constant(&Type::LONG, 2),
            )
            .unwrap();
        assert_eq!(value.get_type(), &Type::LONG);
        body.ret(&value).unwrap();
    }

    assert_eq!(unit.run_verify(), None);
    let names: Vec<&str> = unit
        .backend
        .blocks
        .iter()
        .map(|block| block.name.as_str())
        .collect();
    assert_eq!(names, vec!["entry", "then", "else", "merge"]);
    assert!(unit
        .backend
        .instructions()
        .iter()
        .any(|instruction| matches!(instruction, Instruction::Phi { incoming, .. } if incoming.len() == 2)));
}

#[test]
fn test_branch_arm_scopes_do_not_leak() {
    let mut unit = unit();
    let mut context = unit.context();
    let mut body = context
        .define_function(&prototype("f", vec![("c", Type::BOOLEAN)], Type::Unit))
        .unwrap();
    let condition = body.lookup_variable("c").unwrap();

    let value = body
        .branch(
            &condition,
            |then| {
                let one = then.constant(&Type::INT, 1)?;
                then.declare_variable("local", &one, false)?;
                then.undefined(&Type::Unit)
            },
            |otherwise| otherwise.undefined(&Type::Unit),
        )
        .unwrap();

    assert_eq!(value.get_type(), &Type::Unit);
    body.lookup_variable("local").unwrap();
    assert_eq!(body.diagnostics().len(), 1);
}

#[test]
fn test_run_passes_uses_configured_pipeline() {
    let options = CodegenOptions::default()
        .with_passes(PassPipeline {
            passes: vec![Pass::Reassociate],
        });
    let mut unit = CodegenUnit::new(RecordingBackend::new("passes"), options);

    assert!(!unit.context().run_passes());
    assert_eq!(unit.backend.passes_run, vec![Pass::Reassociate]);
    assert!(unit.backend.verify().is_none());
}

#[test]
fn test_branch_arm_that_returns_skips_merge() {
    let mut unit = unit();
    {
        let mut context = unit.context();
        let mut body = context
            .define_function(&prototype("f", vec![("c", Type::BOOLEAN)], Type::INT))
            .unwrap();
        let condition = body.lookup_variable("c").unwrap();
        let value = body
            .branch(
                &condition,
                |then| {
                    let one = then.constant(&Type::INT, 1)?;
                    then.ret(&one)?;
                    then.undefined(&Type::Nothing)
                },
                |otherwise| otherwise.constant(&Type::INT, 2),
            )
            .unwrap();
        assert_eq!(value.get_type(), &Type::INT);
        body.ret(&value).unwrap();
    }

    assert_eq!(unit.run_verify(), None);
    let then_block = &unit.backend.blocks[1];
    assert_eq!(then_block.name, "then");
    assert!(matches!(then_block.instructions.as_slice(), [Instruction::Ret { .. }]));
    assert!(!unit
        .backend
        .instructions()
        .iter()
        .any(|instruction| matches!(instruction, Instruction::Phi { .. })));
}

#[test]
fn test_branch_with_poisoned_then_arm_joins_at_else_type() {
    let mut unit = unit();
    {
        let mut context = unit.context();
        let mut body = context
            .define_function(&prototype("f", vec![("c", Type::BOOLEAN)], Type::INT))
            .unwrap();
        let condition = body.lookup_variable("c").unwrap();
        let value = body
            .branch(
                &condition,
                |then| then.lookup_variable("missing"),
                |otherwise| otherwise.constant(&Type::INT, 2),
            )
            .unwrap();
        assert_eq!(value.get_type(), &Type::INT);
        body.ret(&value).unwrap();
    }

    assert_eq!(unit.run_verify(), None);
    assert_eq!(
        unit.diagnostics().messages(),
        vec!["Variable \"missing\" not declared".to_string()]
    );
    assert!(unit
        .backend
        .instructions()
        .iter()
        .any(|instruction| matches!(instruction, Instruction::Phi { incoming, .. } if incoming.len() == 2)));
}

#[test]
fn test_unknown_type_is_reported_once() {
    let mut unit = unit();
    let mut context = unit.context();

    let foo = context.lookup_type("Foo");
    context
        .declare_prototype(&prototype("h", vec![("x", foo)], Type::Unit))
        .unwrap();
    context.resolve_fully(&Type::unresolved("Foo")).unwrap();

    assert_eq!(
        context.diagnostics().messages(),
        vec!["Unknown type \"Foo\"".to_string()]
    );
}

#[test]
fn test_assign_to_const_unit_is_a_no_op() {
    let mut unit = unit_with_entry();
    let mut context = unit.context();
    let nothing = context.undefined(&Type::Unit).unwrap();
    let variable = context.declare_variable("u", &nothing, true).unwrap();
    let emitted = context.backend().instructions().len();

    context.assign(variable.as_value(), &nothing).unwrap();

    assert_eq!(context.backend().instructions().len(), emitted);
}

#[test]
fn test_close_type_rebinds_mutually_recursive_struct() {
    let mut unit = unit();
    let mut context = unit.context();
    let owner = Type::unresolved("Owner").pointer(false).unwrap();

    context
        .declare_struct(
            &StructDecl::new(vec![], "Pet", vec![TypedName::new("owner", owner)]).unwrap(),
        )
        .unwrap();
    let owner_type = context
        .declare_struct(
            &StructDecl::new(vec![], "Owner", vec![TypedName::new("age", Type::UBYTE)]).unwrap(),
        )
        .unwrap();

    let pet = context.close_type("Pet").unwrap().unwrap();
    assert_eq!(context.find_type("Pet"), Some(pet.clone()));
    let field = &pet.as_struct().unwrap().field("owner").unwrap().type_;
    assert_eq!(field.as_modifier().unwrap().orig(), &owner_type);

    assert_eq!(context.close_type("Missing").unwrap(), None);
    assert_eq!(context.diagnostics().len(), 1);
}
