/// AST module
/// The plain-data declarations code generation consumes
///
/// Submodules:
/// - ast: Declaration attributes
/// - statements: Function prototypes and struct declarations
pub mod ast;
pub mod statements;
