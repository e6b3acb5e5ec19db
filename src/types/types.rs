use std::{fmt::Display, rc::Rc};

use crate::errors::errors::FatalError;

/// The primitive numeric types, including the 1-bit boolean.
///
/// Every primitive is a singleton: two primitive types are the same type
/// exactly when they are the same variant, so `Short` and `Char` stay
/// distinct even though both are 16-bit signed integrals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    UByte,
    UShort,
    UInt,
    ULong,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 12] = [
        Prim::Boolean,
        Prim::Byte,
        Prim::Short,
        Prim::Char,
        Prim::Int,
        Prim::Long,
        Prim::UByte,
        Prim::UShort,
        Prim::UInt,
        Prim::ULong,
        Prim::Float,
        Prim::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prim::Boolean => "Boolean",
            Prim::Byte => "Byte",
            Prim::Short => "Short",
            Prim::Char => "Char",
            Prim::Int => "Int",
            Prim::Long => "Long",
            Prim::UByte => "UByte",
            Prim::UShort => "UShort",
            Prim::UInt => "UInt",
            Prim::ULong => "ULong",
            Prim::Float => "Float",
            Prim::Double => "Double",
        }
    }

    pub fn bit_size(self) -> u32 {
        match self {
            Prim::Boolean => 1,
            Prim::Byte | Prim::UByte => 8,
            Prim::Short | Prim::Char | Prim::UShort => 16,
            Prim::Int | Prim::UInt | Prim::Float => 32,
            Prim::Long | Prim::ULong | Prim::Double => 64,
        }
    }

    pub fn is_integral(self) -> bool {
        !self.is_real()
    }

    pub fn is_real(self) -> bool {
        matches!(self, Prim::Float | Prim::Double)
    }

    pub fn is_boolean(self) -> bool {
        self == Prim::Boolean
    }

    /// Signedness of an integral. The boolean counts as unsigned so that
    /// widening it zero-extends.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Prim::Byte | Prim::Short | Prim::Char | Prim::Int | Prim::Long
        )
    }

    /// Picks `signed` or `unsigned` depending on this primitive's signedness.
    pub fn fold_sign<T>(self, signed: T, unsigned: T) -> T {
        if self.is_signed() {
            signed
        } else {
            unsigned
        }
    }
}

/// A type of the language.
///
/// Primitives and the `Nothing`/`Unit` markers are compared by identity of
/// their variant; every compound type compares structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Bottom type, implicitly convertible to anything.
    Nothing,
    Unit,
    Prim(Prim),
    Function(Rc<FunctionType>),
    Struct(Rc<StructType>),
    Array(Rc<ArrayType>),
    Reference(Rc<ModifierType>),
    Pointer(Rc<ModifierType>),
    /// A type name used before its definition is known.
    Unresolved(Rc<str>),
}

impl Type {
    pub const BOOLEAN: Type = Type::Prim(Prim::Boolean);
    pub const BYTE: Type = Type::Prim(Prim::Byte);
    pub const SHORT: Type = Type::Prim(Prim::Short);
    pub const CHAR: Type = Type::Prim(Prim::Char);
    pub const INT: Type = Type::Prim(Prim::Int);
    pub const LONG: Type = Type::Prim(Prim::Long);
    pub const UBYTE: Type = Type::Prim(Prim::UByte);
    pub const USHORT: Type = Type::Prim(Prim::UShort);
    pub const UINT: Type = Type::Prim(Prim::UInt);
    pub const ULONG: Type = Type::Prim(Prim::ULong);
    pub const FLOAT: Type = Type::Prim(Prim::Float);
    pub const DOUBLE: Type = Type::Prim(Prim::Double);

    pub fn function(return_type: Type, parameter_types: Vec<Type>) -> Type {
        Type::Function(Rc::new(FunctionType::new(return_type, parameter_types)))
    }

    pub fn structure(name: &str, fields: Vec<TypedName>, packed: bool) -> Type {
        Type::Struct(Rc::new(StructType {
            name: name.to_string(),
            fields,
            packed,
        }))
    }

    pub fn array(element_type: Type, size: u32, is_const: bool) -> Type {
        Type::Array(Rc::new(ArrayType {
            element_type,
            size,
            is_const,
        }))
    }

    pub fn unresolved(name: &str) -> Type {
        Type::Unresolved(Rc::from(name))
    }

    /// Wraps this type in a reference.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::NestedReference`] when `self` is already a
    /// reference.
    pub fn reference(&self, is_const: bool) -> Result<Type, FatalError> {
        Ok(Type::Reference(Rc::new(ModifierType::new(
            "reference",
            self.clone(),
            is_const,
        )?)))
    }

    /// Wraps this type in a pointer. Pointers may point to pointers but
    /// never to references.
    pub fn pointer(&self, is_const: bool) -> Result<Type, FatalError> {
        Ok(Type::Pointer(Rc::new(ModifierType::new(
            "pointer",
            self.clone(),
            is_const,
        )?)))
    }

    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn as_prim(&self) -> Option<Prim> {
        match self {
            Type::Prim(prim) => Some(*prim),
            _ => None,
        }
    }

    pub fn is_prim(&self) -> bool {
        matches!(self, Type::Prim(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionType>> {
        match self {
            Type::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Rc<StructType>> {
        match self {
            Type::Struct(structure) => Some(structure),
            _ => None,
        }
    }

    /// The target of a reference or pointer.
    pub fn as_modifier(&self) -> Option<&ModifierType> {
        match self {
            Type::Reference(modifier) | Type::Pointer(modifier) => Some(modifier),
            _ => None,
        }
    }

    /// Views this type as a pointer, if it can be used as one.
    ///
    /// A pointer is itself; a reference to an array decays to a pointer to
    /// the array's element type with the array's constness.
    pub fn as_pointer(&self) -> Option<Type> {
        match self {
            Type::Pointer(_) => Some(self.clone()),
            Type::Reference(modifier) => match &modifier.orig {
                Type::Array(array) => array.element_type.pointer(array.is_const).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether no `Unresolved` name occurs anywhere inside this type.
    pub fn is_resolved(&self) -> bool {
        let mut names = vec![];
        self.collect_unresolved(&mut names);
        names.is_empty()
    }

    /// Pushes every unresolved name inside this type, outermost first.
    pub fn collect_unresolved(&self, names: &mut Vec<String>) {
        match self {
            Type::Nothing | Type::Unit | Type::Prim(_) => {}
            Type::Unresolved(name) => {
                if !names.iter().any(|known| known.as_str() == &**name) {
                    names.push(name.to_string());
                }
            }
            Type::Function(function) => {
                function.return_type.collect_unresolved(names);
                for parameter in &function.parameter_types {
                    parameter.collect_unresolved(names);
                }
            }
            Type::Struct(structure) => {
                for field in &structure.fields {
                    field.type_.collect_unresolved(names);
                }
            }
            Type::Array(array) => array.element_type.collect_unresolved(names),
            Type::Reference(modifier) | Type::Pointer(modifier) => {
                modifier.orig.collect_unresolved(names)
            }
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Nothing => write!(f, "Nothing"),
            Type::Unit => write!(f, "Unit"),
            Type::Prim(prim) => write!(f, "{}", prim.name()),
            Type::Function(function) => write!(f, "{}", function),
            Type::Struct(structure) => write!(f, "{}", structure.name),
            Type::Array(array) => write!(
                f,
                "[{}{}, {}]",
                if array.is_const { "const " } else { "" },
                array.element_type,
                array.size
            ),
            Type::Reference(modifier) => write!(f, "&{}", modifier),
            Type::Pointer(modifier) => write!(f, "*{}", modifier),
            Type::Unresolved(name) => write!(f, "{}", name),
        }
    }
}

/// A call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub return_type: Type,
    pub parameter_types: Vec<Type>,
}

impl FunctionType {
    pub fn new(return_type: Type, parameter_types: Vec<Type>) -> Self {
        FunctionType {
            return_type,
            parameter_types,
        }
    }

    /// Parameter types joined with `, `.
    pub fn parameter_list(&self) -> String {
        self.parameter_types
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<String>>()
            .join(", ")
    }
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.return_type, self.parameter_list())
    }
}

/// An ordered record of named fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<TypedName>,
    pub packed: bool,
}

impl StructType {
    /// Position of the field called `member`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::NoSuchMember`] naming the struct and the field
    /// when there is no such field.
    pub fn index_of(&self, member: &str) -> Result<usize, FatalError> {
        self.fields
            .iter()
            .position(|field| field.name == member)
            .ok_or_else(|| FatalError::NoSuchMember {
                structure: self.name.clone(),
                member: member.to_string(),
            })
    }

    pub fn field(&self, member: &str) -> Result<&TypedName, FatalError> {
        Ok(&self.fields[self.index_of(member)?])
    }
}

/// A fixed-size array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayType {
    pub element_type: Type,
    pub size: u32,
    pub is_const: bool,
}

/// The payload of a reference or pointer type.
///
/// Only constructible through [`Type::reference`] and [`Type::pointer`],
/// which refuse to wrap a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModifierType {
    orig: Type,
    is_const: bool,
}

impl ModifierType {
    fn new(modifier: &'static str, orig: Type, is_const: bool) -> Result<Self, FatalError> {
        if orig.is_reference() {
            return Err(FatalError::NestedReference {
                modifier,
                inner: orig.to_string(),
            });
        }
        Ok(ModifierType { orig, is_const })
    }

    pub fn orig(&self) -> &Type {
        &self.orig
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }
}

impl Display for ModifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_const {
            write!(f, "const ({})", self.orig)
        } else {
            write!(f, "({})", self.orig)
        }
    }
}

/// A `name: type` pair, used for struct fields and function parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedName {
    pub name: String,
    pub type_: Type,
}

impl TypedName {
    pub fn new(name: &str, type_: Type) -> Self {
        TypedName {
            name: name.to_string(),
            type_,
        }
    }

    pub fn map_type<F>(&self, op: F) -> Result<TypedName, FatalError>
    where
        F: FnOnce(&Type) -> Result<Type, FatalError>,
    {
        Ok(TypedName {
            name: self.name.clone(),
            type_: op(&self.type_)?,
        })
    }
}

impl Display for TypedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.type_)
    }
}

/// The types every top-level scope starts with: the two markers and all
/// primitives.
pub fn default_types() -> Vec<Type> {
    let mut types = vec![Type::Nothing, Type::Unit];
    types.extend(Prim::ALL.iter().map(|prim| Type::Prim(*prim)));
    types
}
