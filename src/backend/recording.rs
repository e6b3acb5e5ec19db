//! An in-memory backend that records what the core emits.
//!
//! Used for dry runs and as the instruction sink of the test-suite: every
//! handle is a plain counter and every instruction is kept, in order, in the
//! block it was emitted into.

use std::collections::HashSet;

use tracing::trace;

use crate::{
    errors::errors::BackendError,
    types::types::{FunctionType, Type},
};

use super::builder::{
    ArithOp, BackendModule, BlockId, CastOpcode, IntPredicate, IrBuilder, Pass, PassPipeline,
    RawValue,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Param {
        result: RawValue,
        function: RawValue,
        index: u32,
    },
    Icmp {
        result: RawValue,
        predicate: IntPredicate,
        lhs: RawValue,
        rhs: RawValue,
    },
    Br {
        target: BlockId,
    },
    CondBr {
        condition: RawValue,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret {
        value: Option<RawValue>,
    },
    Unreachable,
    Phi {
        result: RawValue,
        type_: Type,
        incoming: Vec<(RawValue, BlockId)>,
    },
    Alloca {
        result: RawValue,
        type_: Type,
        name: String,
    },
    Load {
        result: RawValue,
        pointer: RawValue,
        type_: Type,
    },
    Store {
        value: RawValue,
        pointer: RawValue,
    },
    BitCast {
        result: RawValue,
        value: RawValue,
        dest: Type,
    },
    PtrToInt {
        result: RawValue,
        value: RawValue,
        dest: Type,
    },
    Cast {
        result: RawValue,
        opcode: CastOpcode,
        value: RawValue,
        dest: Type,
    },
    Arithmetic {
        result: RawValue,
        op: ArithOp,
        lhs: RawValue,
        rhs: RawValue,
    },
    Call {
        result: Option<RawValue>,
        function: RawValue,
        arguments: Vec<RawValue>,
    },
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Br { .. }
                | Instruction::CondBr { .. }
                | Instruction::Ret { .. }
                | Instruction::Unreachable
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecordedFunction {
    pub handle: RawValue,
    pub link_name: String,
    pub signature: FunctionType,
}

#[derive(Debug, Clone)]
pub struct RecordedBlock {
    pub function: RawValue,
    pub name: String,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub module_name: String,
    pub functions: Vec<RecordedFunction>,
    pub blocks: Vec<RecordedBlock>,
    pub passes_run: Vec<Pass>,
    undefined: HashSet<RawValue>,
    next_value: u32,
    position: Option<BlockId>,
}

impl RecordingBackend {
    pub fn new(module_name: &str) -> Self {
        RecordingBackend {
            module_name: module_name.to_string(),
            ..Default::default()
        }
    }

    /// A backend already positioned inside the entry block of a `Unit()`
    /// function, for emitting free-standing instructions.
    pub fn with_entry_block(module_name: &str) -> Result<Self, BackendError> {
        let mut backend = RecordingBackend::new(module_name);
        let function = backend.declare_function("__entry", &FunctionType::new(Type::Unit, vec![]))?;
        let entry = backend.append_block(function, "entry")?;
        backend.position_at_end(entry)?;
        Ok(backend)
    }

    /// Every recorded instruction, block by block.
    pub fn instructions(&self) -> Vec<&Instruction> {
        self.blocks
            .iter()
            .flat_map(|block| block.instructions.iter())
            .collect()
    }

    pub fn function(&self, link_name: &str) -> Option<&RecordedFunction> {
        self.functions
            .iter()
            .find(|function| function.link_name == link_name)
    }

    fn fresh(&mut self) -> RawValue {
        let value = RawValue(self.next_value);
        self.next_value += 1;
        value
    }

    fn emit(&mut self, instruction: Instruction) -> Result<(), BackendError> {
        let block = self
            .position
            .ok_or_else(|| BackendError::Builder(String::from("no insertion point")))?;
        trace!(?instruction, block = block.0, "emit");
        self.blocks[block.0 as usize].instructions.push(instruction);
        Ok(())
    }

    fn emit_value<F>(&mut self, build: F) -> Result<RawValue, BackendError>
    where
        F: FnOnce(RawValue) -> Instruction,
    {
        let result = self.fresh();
        self.emit(build(result))?;
        Ok(result)
    }

    fn lookup_function(&self, function: RawValue) -> Result<&RecordedFunction, BackendError> {
        self.functions
            .iter()
            .find(|recorded| recorded.handle == function)
            .ok_or(BackendError::InvalidHandle {
                handle: function.0,
                expected: "function",
            })
    }
}

impl IrBuilder for RecordingBackend {
    fn const_int(&mut self, _type_: &Type, _value: u64) -> Result<RawValue, BackendError> {
        Ok(self.fresh())
    }

    fn const_null(&mut self, _pointer_type: &Type) -> Result<RawValue, BackendError> {
        Ok(self.fresh())
    }

    fn undefined(&mut self, _type_: &Type) -> Result<RawValue, BackendError> {
        let value = self.fresh();
        self.undefined.insert(value);
        Ok(value)
    }

    fn is_undefined(&self, value: RawValue) -> bool {
        self.undefined.contains(&value)
    }

    fn append_block(&mut self, function: RawValue, name: &str) -> Result<BlockId, BackendError> {
        self.lookup_function(function)?;
        self.blocks.push(RecordedBlock {
            function,
            name: name.to_string(),
            instructions: vec![],
        });
        Ok(BlockId(self.blocks.len() as u32 - 1))
    }

    fn position_at_end(&mut self, block: BlockId) -> Result<(), BackendError> {
        if block.0 as usize >= self.blocks.len() {
            return Err(BackendError::InvalidHandle {
                handle: block.0,
                expected: "block",
            });
        }
        self.position = Some(block);
        Ok(())
    }

    fn current_block(&self) -> Option<BlockId> {
        self.position
    }

    fn is_terminated(&self) -> bool {
        self.position
            .and_then(|block| self.blocks[block.0 as usize].instructions.last())
            .is_some_and(Instruction::is_terminator)
    }

    fn param(&mut self, function: RawValue, index: u32) -> Result<RawValue, BackendError> {
        let arity = self.lookup_function(function)?.signature.parameter_types.len();
        if index as usize >= arity {
            return Err(BackendError::Builder(format!(
                "parameter {} out of range for {} parameters",
                index, arity
            )));
        }
        self.emit_value(|result| Instruction::Param {
            result,
            function,
            index,
        })
    }

    fn icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Icmp {
            result,
            predicate,
            lhs,
            rhs,
        })
    }

    fn br(&mut self, target: BlockId) -> Result<(), BackendError> {
        self.emit(Instruction::Br { target })
    }

    fn cond_br(
        &mut self,
        condition: RawValue,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<(), BackendError> {
        self.emit(Instruction::CondBr {
            condition,
            then_block,
            else_block,
        })
    }

    fn ret(&mut self, value: Option<RawValue>) -> Result<(), BackendError> {
        self.emit(Instruction::Ret { value })
    }

    fn unreachable(&mut self) -> Result<(), BackendError> {
        self.emit(Instruction::Unreachable)
    }

    fn phi(
        &mut self,
        type_: &Type,
        incoming: &[(RawValue, BlockId)],
    ) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Phi {
            result,
            type_: type_.clone(),
            incoming: incoming.to_vec(),
        })
    }

    fn alloca(&mut self, type_: &Type, name: &str) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Alloca {
            result,
            type_: type_.clone(),
            name: name.to_string(),
        })
    }

    fn load(&mut self, pointer: RawValue, type_: &Type) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Load {
            result,
            pointer,
            type_: type_.clone(),
        })
    }

    fn store(&mut self, value: RawValue, pointer: RawValue) -> Result<(), BackendError> {
        self.emit(Instruction::Store { value, pointer })
    }

    fn bit_cast(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::BitCast {
            result,
            value,
            dest: dest.clone(),
        })
    }

    fn ptr_to_int(&mut self, value: RawValue, dest: &Type) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::PtrToInt {
            result,
            value,
            dest: dest.clone(),
        })
    }

    fn cast(
        &mut self,
        opcode: CastOpcode,
        value: RawValue,
        dest: &Type,
    ) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Cast {
            result,
            opcode,
            value,
            dest: dest.clone(),
        })
    }

    fn arithmetic(
        &mut self,
        op: ArithOp,
        lhs: RawValue,
        rhs: RawValue,
    ) -> Result<RawValue, BackendError> {
        self.emit_value(|result| Instruction::Arithmetic {
            result,
            op,
            lhs,
            rhs,
        })
    }

    fn call(
        &mut self,
        function: RawValue,
        signature: &FunctionType,
        arguments: &[RawValue],
    ) -> Result<Option<RawValue>, BackendError> {
        let result = match signature.return_type {
            Type::Unit | Type::Nothing => None,
            _ => Some(self.fresh()),
        };
        self.emit(Instruction::Call {
            result,
            function,
            arguments: arguments.to_vec(),
        })?;
        Ok(result)
    }
}

impl BackendModule for RecordingBackend {
    fn declare_function(
        &mut self,
        link_name: &str,
        signature: &FunctionType,
    ) -> Result<RawValue, BackendError> {
        if let Some(existing) = self.function(link_name) {
            return Ok(existing.handle);
        }
        let handle = self.fresh();
        self.functions.push(RecordedFunction {
            handle,
            link_name: link_name.to_string(),
            signature: signature.clone(),
        });
        Ok(handle)
    }

    fn verify(&self) -> Option<String> {
        for block in &self.blocks {
            let function = self
                .functions
                .iter()
                .find(|function| function.handle == block.function)
                .map(|function| function.link_name.as_str())
                .unwrap_or("<unknown>");
            match block.instructions.last() {
                Some(last) if last.is_terminator() => {}
                _ => {
                    return Some(format!(
                        "block {} in function {} does not end with a terminator",
                        block.name, function
                    ))
                }
            }
            let terminators = block
                .instructions
                .iter()
                .filter(|instruction| instruction.is_terminator())
                .count();
            if terminators > 1 {
                return Some(format!(
                    "block {} in function {} has {} terminators",
                    block.name, function, terminators
                ));
            }
        }
        None
    }

    fn run_passes(&mut self, pipeline: &PassPipeline) -> bool {
        self.passes_run.extend(pipeline.passes.iter().copied());
        false
    }
}
