use std::{fmt::Display, rc::Rc};

/// Index of a struct definition in the compilation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub usize);

/// Reference to a struct type. Equality is by identity; the name is only
/// carried along for display.
#[derive(Debug, Clone)]
pub struct StructRef {
    pub id: StructId,
    pub name: Rc<String>,
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub params: Vec<AliasedType>,
    pub vararg: bool,
    pub returns: Box<AliasedType>,
}

/// The closed set of semantic types. Equality is structural; alias names
/// never take part in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Signed integer of the given bit width (8, 16, 32 or 64).
    Int(u32),
    Bool,
    Void,
    Func(FuncType),
    OwnerPointer {
        to: Box<AliasedType>,
        constant: bool,
    },
    SharedPointer {
        to: Box<AliasedType>,
        constant: bool,
    },
    Array {
        of: Box<AliasedType>,
        constant: bool,
        size: Option<u64>,
    },
    Struct(StructRef),
}

impl Type {
    pub fn i32() -> Type {
        Type::Int(32)
    }

    pub fn i64() -> Type {
        Type::Int(64)
    }

    /// May have several simultaneous holders.
    pub fn is_copyable(&self) -> bool {
        match self {
            Type::OwnerPointer { .. } => false,
            Type::Array { of, .. } => of.ty.is_copyable(),
            _ => true,
        }
    }

    /// Read-only view.
    pub fn is_constant(&self) -> bool {
        match self {
            Type::OwnerPointer { constant, .. }
            | Type::SharedPointer { constant, .. }
            | Type::Array { constant, .. } => *constant,
            _ => false,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::OwnerPointer { .. } | Type::SharedPointer { .. })
    }

    /// Pointee and constness of an owner or shared pointer.
    pub fn pointee(&self) -> Option<(&AliasedType, bool)> {
        match self {
            Type::OwnerPointer { to, constant } | Type::SharedPointer { to, constant } => {
                Some((to, *constant))
            }
            _ => None,
        }
    }

    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    pub fn struct_ref(&self) -> Option<&StructRef> {
        match self {
            Type::Struct(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_unsized_array(&self) -> bool {
        matches!(self, Type::Array { size: None, .. })
    }

    /// `const i8[]`, the type of string literals.
    pub fn string() -> Type {
        Type::Array {
            of: Box::new(AliasedType::new(Type::Int(8))),
            constant: true,
            size: None,
        }
    }

    /// Any `i8[]`, constant or not.
    pub fn is_string(&self) -> bool {
        match self {
            Type::Array {
                of, size: None, ..
            } => of.ty == Type::Int(8),
            _ => false,
        }
    }
}

/// Range check for a value stored in a signed integer of `bits` width.
pub fn int_fits(value: i128, bits: u32) -> bool {
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    value >= min && value <= max
}

/// Builtin type names.
pub fn primitive(name: &str) -> Option<Type> {
    Some(match name {
        "i8" => Type::Int(8),
        "i16" => Type::Int(16),
        "i32" => Type::Int(32),
        "i64" => Type::Int(64),
        "bool" => Type::Bool,
        "void" => Type::Void,
        _ => return None,
    })
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = if self.is_constant() { "const " } else { "" };
        match self {
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Func(func) => {
                let mut params: Vec<String> = func.params.iter().map(|p| p.to_string()).collect();
                if func.vararg {
                    params.push(String::from("..."));
                }
                write!(f, "({}): {}", params.join(", "), func.returns)
            }
            Type::OwnerPointer { to, .. } => write!(f, "{}&{}", prefix, to),
            Type::SharedPointer { to, .. } => write!(f, "{}*{}", prefix, to),
            Type::Array { of, size, .. } => match size {
                Some(size) => write!(f, "{}{}[{}]", prefix, of, size),
                None => write!(f, "{}{}[]", prefix, of),
            },
            Type::Struct(reference) => write!(f, "{}", reference.name),
        }
    }
}

/// A type with an optional alias name used only in diagnostics.
#[derive(Debug, Clone)]
pub struct AliasedType {
    pub ty: Type,
    pub alias: Option<Rc<String>>,
}

impl AliasedType {
    pub fn new(ty: Type) -> Self {
        AliasedType { ty, alias: None }
    }

    pub fn aliased(ty: Type, alias: Rc<String>) -> Self {
        AliasedType {
            ty,
            alias: Some(alias),
        }
    }

    pub fn void() -> Self {
        AliasedType::new(Type::Void)
    }

    /// Full description for diagnostics: `Name (aka T)` for aliases.
    pub fn describe(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} (aka {})", alias, self.ty),
            None => self.ty.to_string(),
        }
    }
}

impl PartialEq for AliasedType {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl From<Type> for AliasedType {
    fn from(ty: Type) -> Self {
        AliasedType::new(ty)
    }
}

impl Display for AliasedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}", alias),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// Compile-time value of a constant-folded expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i128),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}
