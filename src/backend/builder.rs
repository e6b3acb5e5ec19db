//! The seams the core emits through.

use std::{fmt::Display, str::FromStr};

use crate::{
    errors::errors::{BackendError, FatalError},
    types::types::{FunctionType, Type},
};

/// Opaque handle to a value produced by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawValue(pub u32);

/// Opaque handle to a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Conversion opcodes chosen by numeric lifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOpcode {
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    /// Same-width reinterpretation.
    BitCast,
}

impl Display for CastOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CastOpcode::Trunc => "trunc",
            CastOpcode::ZExt => "zext",
            CastOpcode::SExt => "sext",
            CastOpcode::FPToUI => "fptoui",
            CastOpcode::FPToSI => "fptosi",
            CastOpcode::UIToFP => "uitofp",
            CastOpcode::SIToFP => "sitofp",
            CastOpcode::FPTrunc => "fptrunc",
            CastOpcode::FPExt => "fpext",
            CastOpcode::BitCast => "bitcast",
        };
        write!(f, "{}", name)
    }
}

/// Binary arithmetic by mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::SDiv => "sdiv",
        }
    }
}

impl FromStr for ArithOp {
    type Err = FatalError;

    fn from_str(mnemonic: &str) -> Result<Self, Self::Err> {
        match mnemonic {
            "add" => Ok(ArithOp::Add),
            "sub" => Ok(ArithOp::Sub),
            "mul" => Ok(ArithOp::Mul),
            "sdiv" => Ok(ArithOp::SDiv),
            _ => Err(FatalError::UnknownArithmetic {
                mnemonic: mnemonic.to_string(),
            }),
        }
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

/// Optimization passes a backend module can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    ConstantPropagation,
    InstructionCombining,
    Reassociate,
    GlobalValueNumbering,
    CfgSimplification,
}

/// An ordered list of passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPipeline {
    pub passes: Vec<Pass>,
}

impl PassPipeline {
    /// Constant propagation, instruction combining, reassociation, GVN and
    /// CFG simplification, in that order.
    pub fn standard() -> Self {
        PassPipeline {
            passes: vec![
                Pass::ConstantPropagation,
                Pass::InstructionCombining,
                Pass::Reassociate,
                Pass::GlobalValueNumbering,
                Pass::CfgSimplification,
            ],
        }
    }

    pub fn empty() -> Self {
        PassPipeline { passes: vec![] }
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        PassPipeline::standard()
    }
}

/// Instruction emission primitives.
///
/// The core treats every returned handle as opaque; only the backend that
/// produced a handle knows what it stands for.
pub trait IrBuilder {
    fn const_int(&mut self, type_: &Type, value: u64) -> Result<RawValue, BackendError>;
    fn const_null(&mut self, pointer_type: &Type) -> Result<RawValue, BackendError>;
    fn undefined(&mut self, type_: &Type) -> Result<RawValue, BackendError>;
    /// Whether `value` is the undefined sentinel.
    fn is_undefined(&self, value: RawValue) -> bool;

    fn append_block(&mut self, function: RawValue, name: &str) -> Result<BlockId, BackendError>;
    fn position_at_end(&mut self, block: BlockId) -> Result<(), BackendError>;
    fn current_block(&self) -> Option<BlockId>;
    /// Whether the current block already ends with a terminator.
    fn is_terminated(&self) -> bool;
    fn param(&mut self, function: RawValue, index: u32) -> Result<RawValue, BackendError>;

    fn icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError>;
    fn br(&mut self, target: BlockId) -> Result<(), BackendError>;
    fn cond_br(
        &mut self,
        condition: RawValue,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<(), BackendError>;
    fn ret(&mut self, value: Option<RawValue>) -> Result<(), BackendError>;
    fn unreachable(&mut self) -> Result<(), BackendError>;
    fn phi(
        &mut self,
        type_: &Type,
        incoming: &[(RawValue, BlockId)],
    ) -> Result<RawValue, BackendError>;

    fn alloca(&mut self, type_: &Type, name: &str) -> Result<RawValue, BackendError>;
    fn load(&mut self, pointer: RawValue, type_: &Type) -> Result<RawValue, BackendError>;
    fn store(&mut self, value: RawValue, pointer: RawValue) -> Result<(), BackendError>;

    fn bit_cast(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError>;
    fn ptr_to_int(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError>;
    fn cast(
        &mut self,
        opcode: CastOpcode,
        value: RawValue,
        dest: &Type,
    ) -> Result<RawValue, BackendError>;
    fn arithmetic(
        &mut self,
        op: ArithOp,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError>;
    /// Emits a call. Returns `None` for calls whose result is `Unit`.
    fn call(
        &mut self,
        function: RawValue,
        signature: &FunctionType,
        arguments: &[RawValue],
    ) -> Result<Option<RawValue>, BackendError>;
}

/// Module-level operations.
pub trait BackendModule {
    fn declare_function(
        &mut self,
        link_name: &str,
        signature: &FunctionType,
    ) -> Result<RawValue, BackendError>;
    /// Structural self-check. `None` when the module is well formed.
    fn verify(&self) -> Option<String>;
    /// Runs `pipeline`, returning whether the module changed.
    fn run_passes(&mut self, pipeline: &PassPipeline) -> bool;
}

/// Everything a code generation unit needs from a backend.
pub trait Backend: IrBuilder + BackendModule {}

impl<T: IrBuilder + BackendModule> Backend for T {}
