use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::errors::errors::FatalError;

/// A declaration attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Lay struct fields out without padding.
    Packed,
    /// Link a function under its plain name.
    NoMangle,
}

lazy_static! {
    pub static ref ATTRIBUTE_LOOKUP: HashMap<&'static str, Attribute> = {
        let mut map = HashMap::new();
        map.insert("packed", Attribute::Packed);
        map.insert("no_mangle", Attribute::NoMangle);
        map
    };
}

impl Attribute {
    pub fn from_name(name: &str) -> Option<Attribute> {
        ATTRIBUTE_LOOKUP.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Packed => "packed",
            Attribute::NoMangle => "no_mangle",
        }
    }

    /// Fails when this attribute is present on something it does not apply
    /// to.
    pub fn not_applicable_to(self, target: &str) -> FatalError {
        FatalError::AttributeNotApplicable {
            attribute: self.name().to_string(),
            target: target.to_string(),
        }
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fails with the first attribute in `attributes` that is not in `allowed`.
pub(super) fn check_attributes(
    attributes: &[Attribute],
    allowed: &[Attribute],
    target: &str,
) -> Result<(), FatalError> {
    match attributes
        .iter()
        .find(|attribute| !allowed.contains(attribute))
    {
        Some(attribute) => Err(attribute.not_applicable_to(target)),
        None => Ok(()),
    }
}
