use std::fmt::Display;

use crate::{
    errors::errors::FatalError,
    types::types::{FunctionType, Type, TypedName},
};

use super::ast::{check_attributes, Attribute};

/// A function head: name, parameters and return type.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub return_type: Type,
}

impl Prototype {
    /// Creates a new prototype.
    ///
    /// # Arguments
    ///
    /// * `attributes` - Attributes written on the declaration
    /// * `name` - Unqualified function name
    /// * `parameters` - Parameter names and their (possibly unresolved) types
    /// * `return_type` - The declared return type
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::AttributeNotApplicable`] for attributes that
    /// only apply to structs.
    pub fn new(
        attributes: Vec<Attribute>,
        name: &str,
        parameters: Vec<TypedName>,
        return_type: Type,
    ) -> Result<Self, FatalError> {
        check_attributes(&attributes, &[Attribute::NoMangle], &format!("function {}", name))?;
        Ok(Prototype {
            attributes,
            name: name.to_string(),
            parameters,
            return_type,
        })
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.return_type.clone(),
            self.parameters
                .iter()
                .map(|parameter| parameter.type_.clone())
                .collect(),
        )
    }

    /// The name with its signature encoded: `name(P1,P2):Ret`.
    pub fn mangled(&self) -> String {
        format!(
            "{}({}):{}",
            self.name,
            self.parameters
                .iter()
                .map(|parameter| parameter.type_.to_string())
                .collect::<Vec<String>>()
                .join(","),
            self.return_type
        )
    }

    /// The symbol the function is linked under.
    pub fn link_name(&self) -> String {
        if self.has_attribute(Attribute::NoMangle) {
            self.name.clone()
        } else {
            self.mangled()
        }
    }

    /// Rebuilds this prototype with every type passed through `op`.
    pub fn map_types<F>(&self, mut op: F) -> Result<Prototype, FatalError>
    where
        F: FnMut(&Type) -> Result<Type, FatalError>,
    {
        Ok(Prototype {
            attributes: self.attributes.clone(),
            name: self.name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|parameter| parameter.map_type(&mut op))
                .collect::<Result<Vec<TypedName>, FatalError>>()?,
            return_type: op(&self.return_type)?,
        })
    }
}

impl Display for Prototype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}): {}",
            self.name,
            self.parameters
                .iter()
                .map(|parameter| parameter.to_string())
                .collect::<Vec<String>>()
                .join(", "),
            self.return_type
        )
    }
}

/// A struct declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub fields: Vec<TypedName>,
}

impl StructDecl {
    /// # Errors
    ///
    /// Returns [`FatalError::AttributeNotApplicable`] for attributes that
    /// only apply to functions.
    pub fn new(
        attributes: Vec<Attribute>,
        name: &str,
        fields: Vec<TypedName>,
    ) -> Result<Self, FatalError> {
        check_attributes(&attributes, &[Attribute::Packed], &format!("struct {}", name))?;
        Ok(StructDecl {
            attributes,
            name: name.to_string(),
            fields,
        })
    }

    pub fn is_packed(&self) -> bool {
        self.attributes.contains(&Attribute::Packed)
    }

    /// The struct type as written, field types not yet resolved.
    pub fn to_type(&self) -> Type {
        Type::structure(&self.name, self.fields.clone(), self.is_packed())
    }
}
