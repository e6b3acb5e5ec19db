use crate::{
    backend::builder::PassPipeline,
    types::types::{Prim, Type},
};

/// Settings of one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenOptions {
    /// Name given to the backend module
    pub module_name: String,
    /// The primitive standing in for `size_t`
    pub size_type: Prim,
    /// How many resolution passes a declaration gets before its remaining
    /// unresolved names are reported
    pub max_resolve_rounds: usize,
    /// Passes run by `run_passes`
    pub passes: PassPipeline,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            module_name: String::from("main"),
            size_type: Prim::ULong,
            max_resolve_rounds: 8,
            passes: PassPipeline::standard(),
        }
    }
}

impl CodegenOptions {
    pub fn with_module_name(mut self, module_name: &str) -> Self {
        self.module_name = module_name.to_string();
        self
    }

    pub fn with_size_type(mut self, size_type: Prim) -> Self {
        self.size_type = size_type;
        self
    }

    /// At least one round always runs.
    pub fn with_max_resolve_rounds(mut self, rounds: usize) -> Self {
        self.max_resolve_rounds = rounds.max(1);
        self
    }

    pub fn with_passes(mut self, passes: PassPipeline) -> Self {
        self.passes = passes;
        self
    }

    pub fn size_type(&self) -> Type {
        Type::Prim(self.size_type)
    }
}
