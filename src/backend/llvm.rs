//! LLVM implementation of the backend seams, built on inkwell.
//!
//! Handles given to the core index into slot tables owned by this backend.

use std::collections::HashSet;

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    passes::PassManager,
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum},
    values::{
        BasicMetadataValueEnum, BasicValue, BasicValueEnum, FunctionValue, IntValue, PointerValue,
    },
    AddressSpace, FloatPredicate, InstructionOpcode,
};

use crate::{
    errors::errors::BackendError,
    types::types::{FunctionType, Prim, Type},
};

use super::builder::{
    ArithOp, BackendModule, BlockId, CastOpcode, IntPredicate, IrBuilder, Pass, PassPipeline,
    RawValue,
};

#[derive(Debug, Clone, Copy)]
enum Slot<'ctx> {
    Value(BasicValueEnum<'ctx>),
    Function(FunctionValue<'ctx>),
}

/// Backend emitting LLVM IR into a single module.
///
/// # Type Parameters
///
/// * `'ctx` - Lifetime of the LLVM context
pub struct LlvmBackend<'ctx> {
    /// Reference to the LLVM context
    pub context: &'ctx Context,
    /// The LLVM module being built
    pub module: Module<'ctx>,
    /// The LLVM IR builder
    pub builder: Builder<'ctx>,

    slots: Vec<Slot<'ctx>>,
    blocks: Vec<BasicBlock<'ctx>>,
    undefined: HashSet<RawValue>,
    position: Option<BlockId>,
}

impl<'ctx> LlvmBackend<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        LlvmBackend {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            slots: vec![],
            blocks: vec![],
            undefined: HashSet::new(),
            position: None,
        }
    }

    /// Converts a language type to an LLVM basic type.
    ///
    /// `Unit` and `Nothing` become the empty struct; references and pointers
    /// become typed pointers to their target.
    pub fn lower_type(&self, type_: &Type) -> Result<BasicTypeEnum<'ctx>, BackendError> {
        match type_ {
            Type::Nothing | Type::Unit => Ok(self.context.struct_type(&[], false).into()),
            Type::Prim(prim) => Ok(match prim {
                Prim::Boolean => self.context.bool_type().into(),
                Prim::Byte | Prim::UByte => self.context.i8_type().into(),
                Prim::Short | Prim::Char | Prim::UShort => self.context.i16_type().into(),
                Prim::Int | Prim::UInt => self.context.i32_type().into(),
                Prim::Long | Prim::ULong => self.context.i64_type().into(),
                Prim::Float => self.context.f32_type().into(),
                Prim::Double => self.context.f64_type().into(),
            }),
            Type::Function(function) => Ok(self
                .lower_function_type(function)?
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Struct(structure) => {
                let fields = structure
                    .fields
                    .iter()
                    .map(|field| self.lower_type(&field.type_))
                    .collect::<Result<Vec<BasicTypeEnum<'ctx>>, BackendError>>()?;
                Ok(self.context.struct_type(&fields, structure.packed).into())
            }
            Type::Array(array) => Ok(self
                .lower_type(&array.element_type)?
                .array_type(array.size)
                .into()),
            Type::Reference(modifier) | Type::Pointer(modifier) => match modifier.orig() {
                Type::Nothing | Type::Unit => Ok(self
                    .context
                    .i8_type()
                    .ptr_type(AddressSpace::default())
                    .into()),
                orig => Ok(self
                    .lower_type(orig)?
                    .ptr_type(AddressSpace::default())
                    .into()),
            },
            Type::Unresolved(_) => Err(BackendError::UnloweredType {
                type_: type_.to_string(),
            }),
        }
    }

    pub fn lower_function_type(
        &self,
        function: &FunctionType,
    ) -> Result<inkwell::types::FunctionType<'ctx>, BackendError> {
        let parameters = function
            .parameter_types
            .iter()
            .map(|parameter| self.lower_type(parameter).map(BasicMetadataTypeEnum::from))
            .collect::<Result<Vec<BasicMetadataTypeEnum<'ctx>>, BackendError>>()?;

        match function.return_type {
            Type::Unit | Type::Nothing => Ok(self.context.void_type().fn_type(&parameters, false)),
            ref return_type => Ok(self.lower_type(return_type)?.fn_type(&parameters, false)),
        }
    }

    fn push(&mut self, slot: Slot<'ctx>) -> RawValue {
        self.slots.push(slot);
        RawValue(self.slots.len() as u32 - 1)
    }

    fn push_value<V: BasicValue<'ctx>>(&mut self, value: V) -> RawValue {
        self.push(Slot::Value(value.as_basic_value_enum()))
    }

    fn value(&self, raw: RawValue) -> Result<BasicValueEnum<'ctx>, BackendError> {
        match self.slots.get(raw.0 as usize) {
            Some(Slot::Value(value)) => Ok(*value),
            Some(Slot::Function(function)) => Ok(function
                .as_global_value()
                .as_pointer_value()
                .as_basic_value_enum()),
            None => Err(BackendError::InvalidHandle {
                handle: raw.0,
                expected: "value",
            }),
        }
    }

    fn function(&self, raw: RawValue) -> Result<FunctionValue<'ctx>, BackendError> {
        match self.slots.get(raw.0 as usize) {
            Some(Slot::Function(function)) => Ok(*function),
            _ => Err(BackendError::InvalidHandle {
                handle: raw.0,
                expected: "function",
            }),
        }
    }

    fn int_value(&self, raw: RawValue) -> Result<IntValue<'ctx>, BackendError> {
        match self.value(raw)? {
            BasicValueEnum::IntValue(value) => Ok(value),
            _ => Err(BackendError::InvalidHandle {
                handle: raw.0,
                expected: "integer value",
            }),
        }
    }

    fn pointer_value(&self, raw: RawValue) -> Result<PointerValue<'ctx>, BackendError> {
        match self.value(raw)? {
            BasicValueEnum::PointerValue(value) => Ok(value),
            _ => Err(BackendError::InvalidHandle {
                handle: raw.0,
                expected: "pointer value",
            }),
        }
    }

    fn block(&self, block: BlockId) -> Result<BasicBlock<'ctx>, BackendError> {
        self.blocks
            .get(block.0 as usize)
            .copied()
            .ok_or(BackendError::InvalidHandle {
                handle: block.0,
                expected: "block",
            })
    }
}

fn builder_error(error: inkwell::builder::BuilderError) -> BackendError {
    BackendError::Builder(error.to_string())
}

fn undef_of(type_: BasicTypeEnum<'_>) -> BasicValueEnum<'_> {
    match type_ {
        BasicTypeEnum::ArrayType(ty) => ty.get_undef().into(),
        BasicTypeEnum::FloatType(ty) => ty.get_undef().into(),
        BasicTypeEnum::IntType(ty) => ty.get_undef().into(),
        BasicTypeEnum::PointerType(ty) => ty.get_undef().into(),
        BasicTypeEnum::StructType(ty) => ty.get_undef().into(),
        BasicTypeEnum::VectorType(ty) => ty.get_undef().into(),
    }
}

fn int_predicate(predicate: IntPredicate) -> inkwell::IntPredicate {
    match predicate {
        IntPredicate::Eq => inkwell::IntPredicate::EQ,
        IntPredicate::Ne => inkwell::IntPredicate::NE,
        IntPredicate::Slt => inkwell::IntPredicate::SLT,
        IntPredicate::Sle => inkwell::IntPredicate::SLE,
        IntPredicate::Sgt => inkwell::IntPredicate::SGT,
        IntPredicate::Sge => inkwell::IntPredicate::SGE,
        IntPredicate::Ult => inkwell::IntPredicate::ULT,
        IntPredicate::Ule => inkwell::IntPredicate::ULE,
        IntPredicate::Ugt => inkwell::IntPredicate::UGT,
        IntPredicate::Uge => inkwell::IntPredicate::UGE,
    }
}

fn float_predicate(predicate: IntPredicate) -> FloatPredicate {
    match predicate {
        IntPredicate::Eq => FloatPredicate::OEQ,
        IntPredicate::Ne => FloatPredicate::ONE,
        IntPredicate::Slt | IntPredicate::Ult => FloatPredicate::OLT,
        IntPredicate::Sle | IntPredicate::Ule => FloatPredicate::OLE,
        IntPredicate::Sgt | IntPredicate::Ugt => FloatPredicate::OGT,
        IntPredicate::Sge | IntPredicate::Uge => FloatPredicate::OGE,
    }
}

fn cast_opcode(opcode: CastOpcode) -> InstructionOpcode {
    match opcode {
        CastOpcode::Trunc => InstructionOpcode::Trunc,
        CastOpcode::ZExt => InstructionOpcode::ZExt,
        CastOpcode::SExt => InstructionOpcode::SExt,
        CastOpcode::FPToUI => InstructionOpcode::FPToUI,
        CastOpcode::FPToSI => InstructionOpcode::FPToSI,
        CastOpcode::UIToFP => InstructionOpcode::UIToFP,
        CastOpcode::SIToFP => InstructionOpcode::SIToFP,
        CastOpcode::FPTrunc => InstructionOpcode::FPTrunc,
        CastOpcode::FPExt => InstructionOpcode::FPExt,
        CastOpcode::BitCast => InstructionOpcode::BitCast,
    }
}

impl<'ctx> IrBuilder for LlvmBackend<'ctx> {
    fn const_int(&mut self, type_: &Type, value: u64) -> Result<RawValue, BackendError> {
        match self.lower_type(type_)? {
            BasicTypeEnum::IntType(ty) => {
                let constant = ty.const_int(value, false);
                Ok(self.push_value(constant))
            }
            _ => Err(BackendError::UnloweredType {
                type_: type_.to_string(),
            }),
        }
    }

    fn const_null(&mut self, pointer_type: &Type) -> Result<RawValue, BackendError> {
        match self.lower_type(pointer_type)? {
            BasicTypeEnum::PointerType(ty) => {
                let constant = ty.const_null();
                Ok(self.push_value(constant))
            }
            _ => Err(BackendError::UnloweredType {
                type_: pointer_type.to_string(),
            }),
        }
    }

    fn undefined(&mut self, type_: &Type) -> Result<RawValue, BackendError> {
        let value = undef_of(self.lower_type(type_)?);
        let raw = self.push_value(value);
        self.undefined.insert(raw);
        Ok(raw)
    }

    fn is_undefined(&self, value: RawValue) -> bool {
        self.undefined.contains(&value)
    }

    fn append_block(&mut self, function: RawValue, name: &str) -> Result<BlockId, BackendError> {
        let function = self.function(function)?;
        self.blocks
            .push(self.context.append_basic_block(function, name));
        Ok(BlockId(self.blocks.len() as u32 - 1))
    }

    fn position_at_end(&mut self, block: BlockId) -> Result<(), BackendError> {
        self.builder.position_at_end(self.block(block)?);
        self.position = Some(block);
        Ok(())
    }

    fn current_block(&self) -> Option<BlockId> {
        self.position
    }

    fn is_terminated(&self) -> bool {
        self.position
            .and_then(|block| self.block(block).ok())
            .is_some_and(|block| block.get_terminator().is_some())
    }

    fn param(&mut self, function: RawValue, index: u32) -> Result<RawValue, BackendError> {
        let value = self
            .function(function)?
            .get_nth_param(index)
            .ok_or_else(|| BackendError::Builder(format!("no parameter {}", index)))?;
        Ok(self.push_value(value))
    }

    fn icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError> {
        let compared = match (self.value(lhs)?, self.value(rhs)?) {
            (BasicValueEnum::FloatValue(lhs), BasicValueEnum::FloatValue(rhs)) => self
                .builder
                .build_float_compare(float_predicate(predicate), lhs, rhs, "cmp")
                .map_err(builder_error)?,
            _ => self
                .builder
                .build_int_compare(
                    int_predicate(predicate),
                    self.int_value(lhs)?,
                    self.int_value(rhs)?,
                    "cmp",
                )
                .map_err(builder_error)?,
        };
        Ok(self.push_value(compared))
    }

    fn br(&mut self, target: BlockId) -> Result<(), BackendError> {
        self.builder
            .build_unconditional_branch(self.block(target)?)
            .map_err(builder_error)?;
        Ok(())
    }

    fn cond_br(
        &mut self,
        condition: RawValue,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<(), BackendError> {
        self.builder
            .build_conditional_branch(
                self.int_value(condition)?,
                self.block(then_block)?,
                self.block(else_block)?,
            )
            .map_err(builder_error)?;
        Ok(())
    }

    fn ret(&mut self, value: Option<RawValue>) -> Result<(), BackendError> {
        match value {
            Some(value) => {
                let value = self.value(value)?;
                self.builder.build_return(Some(&value))
            }
            None => self.builder.build_return(None),
        }
        .map_err(builder_error)?;
        Ok(())
    }

    fn unreachable(&mut self) -> Result<(), BackendError> {
        self.builder.build_unreachable().map_err(builder_error)?;
        Ok(())
    }

    fn phi(
        &mut self,
        type_: &Type,
        incoming: &[(RawValue, BlockId)],
    ) -> Result<RawValue, BackendError> {
        let phi = self
            .builder
            .build_phi(self.lower_type(type_)?, "phi")
            .map_err(builder_error)?;
        let mut branches = vec![];
        for (value, block) in incoming {
            branches.push((self.value(*value)?, self.block(*block)?));
        }
        let branches = branches
            .iter()
            .map(|(value, block)| (value as &dyn BasicValue<'ctx>, *block))
            .collect::<Vec<_>>();
        phi.add_incoming(&branches);
        Ok(self.push_value(phi.as_basic_value()))
    }

    fn alloca(&mut self, type_: &Type, name: &str) -> Result<RawValue, BackendError> {
        let allocated = self
            .builder
            .build_alloca(self.lower_type(type_)?, name)
            .map_err(builder_error)?;
        Ok(self.push_value(allocated))
    }

    fn load(&mut self, pointer: RawValue, _type_: &Type) -> Result<RawValue, BackendError> {
        let loaded = self
            .builder
            .build_load(self.pointer_value(pointer)?, "load")
            .map_err(builder_error)?;
        Ok(self.push_value(loaded))
    }

    fn store(&mut self, value: RawValue, pointer: RawValue) -> Result<(), BackendError> {
        self.builder
            .build_store(self.pointer_value(pointer)?, self.value(value)?)
            .map_err(builder_error)?;
        Ok(())
    }

    fn bit_cast(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError> {
        let cast = self
            .builder
            .build_bitcast(self.value(value)?, self.lower_type(dest)?, "pointer_cast")
            .map_err(builder_error)?;
        Ok(self.push_value(cast))
    }

    fn ptr_to_int(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError> {
        let int_type = match self.lower_type(dest)? {
            BasicTypeEnum::IntType(ty) => ty,
            _ => {
                return Err(BackendError::UnloweredType {
                    type_: dest.to_string(),
                })
            }
        };
        let cast = self
            .builder
            .build_ptr_to_int(self.pointer_value(value)?, int_type, "p2i")
            .map_err(builder_error)?;
        Ok(self.push_value(cast))
    }

    fn cast(
        &mut self,
        opcode: CastOpcode,
        value: RawValue,
        dest: &Type,
    ) -> Result<RawValue, BackendError> {
        let cast = self
            .builder
            .build_cast(
                cast_opcode(opcode),
                self.value(value)?,
                self.lower_type(dest)?,
                "primitive_cast",
            )
            .map_err(builder_error)?;
        Ok(self.push_value(cast))
    }

    fn arithmetic(
        &mut self,
        op: ArithOp,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError> {
        let name = op.mnemonic();
        let result: BasicValueEnum<'ctx> = match (self.value(lhs)?, self.value(rhs)?) {
            (BasicValueEnum::FloatValue(lhs), BasicValueEnum::FloatValue(rhs)) => match op {
                ArithOp::Add => self.builder.build_float_add(lhs, rhs, name),
                ArithOp::Sub => self.builder.build_float_sub(lhs, rhs, name),
                ArithOp::Mul => self.builder.build_float_mul(lhs, rhs, name),
                ArithOp::SDiv => self.builder.build_float_div(lhs, rhs, name),
            }
            .map_err(builder_error)?
            .into(),
            _ => {
                let (lhs, rhs) = (self.int_value(lhs)?, self.int_value(rhs)?);
                match op {
                    ArithOp::Add => self.builder.build_int_add(lhs, rhs, name),
                    ArithOp::Sub => self.builder.build_int_sub(lhs, rhs, name),
                    ArithOp::Mul => self.builder.build_int_mul(lhs, rhs, name),
                    ArithOp::SDiv => self.builder.build_int_signed_div(lhs, rhs, name),
                }
                .map_err(builder_error)?
                .into()
            }
        };
        Ok(self.push_value(result))
    }

    fn call(
        &mut self,
        function: RawValue,
        _signature: &FunctionType,
        arguments: &[RawValue],
    ) -> Result<Option<RawValue>, BackendError> {
        let function = self.function(function)?;
        let arguments = arguments
            .iter()
            .map(|argument| self.value(*argument).map(BasicMetadataValueEnum::from))
            .collect::<Result<Vec<BasicMetadataValueEnum<'ctx>>, BackendError>>()?;

        let call = self
            .builder
            .build_call(function, &arguments, "call")
            .map_err(builder_error)?;

        Ok(call
            .try_as_basic_value()
            .left()
            .map(|value| self.push_value(value)))
    }
}

impl<'ctx> BackendModule for LlvmBackend<'ctx> {
    fn declare_function(
        &mut self,
        link_name: &str,
        signature: &FunctionType,
    ) -> Result<RawValue, BackendError> {
        let function = match self.module.get_function(link_name) {
            Some(function) => function,
            None => self.module.add_function(
                link_name,
                self.lower_function_type(signature)?,
                Some(Linkage::External),
            ),
        };
        Ok(self.push(Slot::Function(function)))
    }

    fn verify(&self) -> Option<String> {
        self.module.verify().err().map(|message| message.to_string())
    }

    fn run_passes(&mut self, pipeline: &PassPipeline) -> bool {
        let fpm = PassManager::create(());

        for pass in &pipeline.passes {
            match pass {
                // The standalone constant propagation pass is gone on LLVM 14.
                Pass::ConstantPropagation => fpm.add_sccp_pass(),
                Pass::InstructionCombining => fpm.add_instruction_combining_pass(),
                Pass::Reassociate => fpm.add_reassociate_pass(),
                Pass::GlobalValueNumbering => fpm.add_gvn_pass(),
                Pass::CfgSimplification => fpm.add_cfg_simplification_pass(),
            }
        }

        fpm.run_on(&self.module)
    }
}
