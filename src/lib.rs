#![allow(clippy::module_inception)]

use crate::errors::errors::{Diagnostics, Error, ErrorTip};

pub mod ast;
pub mod backend;
pub mod cast;
pub mod codegen;
pub mod errors;
pub mod scope;
pub mod types;
pub mod values;

/// Renders one diagnostic the way a driver prints it:
///
/// ```text
/// Error: UnknownType (Type `Point` is not declared in any enclosing scope)
///  -> Unknown type "Point"
/// ```
pub fn render_error(error: &Error) -> String {
    let header = if let ErrorTip::None = error.get_tip() {
        format!("Error: {}", error.get_error_name())
    } else {
        format!("Error: {} ({})", error.get_error_name(), error.get_tip())
    };
    format!("{}\n -> {}", header, error)
}

/// Renders every diagnostic, in the order they were recorded.
pub fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    diagnostics
        .iter()
        .map(render_error)
        .collect::<Vec<String>>()
        .join("\n")
}
