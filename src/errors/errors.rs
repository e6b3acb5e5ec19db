use std::fmt::Display;

use thiserror::Error;
use tracing::warn;

/// A recoverable user error.
///
/// Recoverable errors never stop code generation: the operation that found
/// them records one in the [`Diagnostics`] sink and substitutes a poison
/// value or type so the rest of the unit can still be checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
}

impl Error {
    pub fn new(error_impl: ErrorImpl) -> Self {
        Error {
            internal_error: error_impl,
        }
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::NoMatchingOverload { .. } => "NoMatchingOverload",
            ErrorImpl::AmbiguousCall { .. } => "AmbiguousCall",
            ErrorImpl::TypeAlreadyDeclared { .. } => "TypeAlreadyDeclared",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnknownType { type_ } => ErrorTip::Suggestion(format!(
                "Type `{}` is not declared in any enclosing scope",
                type_
            )),
            ErrorImpl::VariableNotDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` not declared", variable))
            }
            ErrorImpl::FunctionNotDeclared { .. } => ErrorTip::None,
            ErrorImpl::NoMatchingOverload { candidates, .. } => {
                if candidates.is_empty() {
                    ErrorTip::None
                } else {
                    ErrorTip::Suggestion(format!("Candidates are: {}", candidates.join("; ")))
                }
            }
            ErrorImpl::AmbiguousCall { .. } => ErrorTip::Suggestion(String::from(
                "Add an explicit cast to select one overload",
            )),
            ErrorImpl::TypeAlreadyDeclared { type_ } => {
                ErrorTip::Suggestion(format!("Type `{}` already declared in this scope", type_))
            }
            ErrorImpl::VariableAlreadyDeclared { variable } => ErrorTip::Suggestion(format!(
                "Variable `{}` already declared in this scope",
                variable
            )),
            ErrorImpl::FunctionAlreadyDeclared { function, .. } => ErrorTip::Suggestion(format!(
                "Function `{}` already has an overload with these parameter types",
                function
            )),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = self.internal_error.to_string();
        let mut chars = message.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unknown type {type_:?}")]
    UnknownType { type_: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("no function named {function:?}")]
    FunctionNotDeclared { function: String },
    #[error("no matching function for call to {function:?} with argument types: ({arguments})")]
    NoMatchingOverload {
        function: String,
        arguments: String,
        candidates: Vec<String>,
    },
    #[error("ambiguous call to function {function:?}: {first} and {second} are both applicable")]
    AmbiguousCall {
        function: String,
        first: String,
        second: String,
    },
    #[error("redeclaration of type {type_}")]
    TypeAlreadyDeclared { type_: String },
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("function {function} redeclared with same parameter types: ({parameters})")]
    FunctionAlreadyDeclared { function: String, parameters: String },
}

/// Accumulating sink for recoverable errors.
///
/// A driver prints the list after a full pass and refuses to hand the
/// module to the backend while it is non-empty.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { errors: vec![] }
    }

    pub fn push(&mut self, error: ErrorImpl) {
        warn!(error = %error, "diagnostic recorded");
        self.errors.push(Error::new(error));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Rendered messages, in the order they were recorded.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|error| error.to_string()).collect()
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.errors
    }
}

/// Failure reported by a backend while emitting or lowering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("instruction builder failed: {0}")]
    Builder(String),
    #[error("type {type_} has no backend representation")]
    UnloweredType { type_: String },
    #[error("handle {handle} does not name a {expected}")]
    InvalidHandle { handle: u32, expected: &'static str },
}

/// A request the type system cannot satisfy even in principle.
///
/// These abort code generation of the expression under construction and
/// travel through `Result` rather than the diagnostics list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FatalError {
    #[error("attempt to cast a {from} into {to}")]
    IllegalCast { from: String, to: String },
    #[error("attempt to alter a const reference of type {target}")]
    ConstViolation { target: String },
    #[error("cannot assign to a value of type {target}")]
    NotAssignable { target: String },
    #[error("creating a {modifier} of a reference: {inner}")]
    NestedReference { modifier: &'static str, inner: String },
    #[error("struct {structure} has no member named {member}")]
    NoSuchMember { structure: String, member: String },
    #[error("cannot unify non-primitive types {lhs} and {rhs}")]
    UnsupportedUnify { lhs: String, rhs: String },
    #[error("{name} is not a function, found {found}")]
    NotAFunction { name: String, found: String },
    #[error("attribute \"{attribute}\" is not applicable to {target}")]
    AttributeNotApplicable { attribute: String, target: String },
    #[error("unknown arithmetic instruction {mnemonic}")]
    UnknownArithmetic { mnemonic: String },
    #[error("no function is being defined at this point")]
    NoInsertionPoint,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
