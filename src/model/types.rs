use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a named type declared in some package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeReference {
    /// Import path of the declaring package (e.g., "k8s.io/api/core/v1")
    pub package_path: String,

    /// Declaration name inside that package (e.g., "Pod")
    pub name: String,
}

impl TypeReference {
    pub fn new(package_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package_path: package_path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package_path, self.name)
    }
}

/// A type expression
///
/// Closed set of variants: every consumer matches exhaustively, so adding a
/// variant is a compile error everywhere it is not yet handled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// `*T`
    Pointer(Box<Type>),

    /// Builtin or otherwise unresolved identifier (`string`, `int64`, `any`)
    Primitive(String),

    /// `map[K]V`
    Map(Box<Type>, Box<Type>),

    /// `[]T` and `[N]T`
    Array(Box<Type>),

    /// Named type in another package
    Reference(TypeReference),

    /// Something the target representation cannot express (func, chan, ...)
    Unrepresentable(String),
}

impl Type {
    pub fn primitive(name: impl Into<String>) -> Self {
        Type::Primitive(name.into())
    }

    pub fn pointer(inner: Type) -> Self {
        Type::Pointer(Box::new(inner))
    }

    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn reference(package_path: impl Into<String>, name: impl Into<String>) -> Self {
        Type::Reference(TypeReference::new(package_path, name))
    }

    pub fn unrepresentable(name: impl Into<String>) -> Self {
        Type::Unrepresentable(name.into())
    }

    /// The reference held directly by this expression, without looking
    /// through pointers or containers
    pub fn as_reference(&self) -> Option<&TypeReference> {
        match self {
            Type::Reference(r) => Some(r),
            Type::Pointer(_)
            | Type::Primitive(_)
            | Type::Map(_, _)
            | Type::Array(_)
            | Type::Unrepresentable(_) => None,
        }
    }

    /// Every reference anywhere inside this expression.
    ///
    /// Diagnostics only: reachability deliberately uses the shallow
    /// [`Type::as_reference`] instead.
    pub fn references(&self) -> Vec<&TypeReference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a TypeReference>) {
        match self {
            Type::Reference(r) => out.push(r),
            Type::Pointer(inner) | Type::Array(inner) => inner.collect_references(out),
            Type::Map(key, value) => {
                key.collect_references(out);
                value.collect_references(out);
            }
            Type::Primitive(_) | Type::Unrepresentable(_) => {}
        }
    }

    /// Name of the first obstruction found inside this expression, if any
    pub fn find_unrepresentable(&self) -> Option<&str> {
        match self {
            Type::Unrepresentable(name) => Some(name),
            Type::Pointer(inner) | Type::Array(inner) => inner.find_unrepresentable(),
            Type::Map(key, value) => key
                .find_unrepresentable()
                .or_else(|| value.find_unrepresentable()),
            Type::Primitive(_) | Type::Reference(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Pointer(inner) => write!(f, "*{}", inner),
            Type::Primitive(name) => f.write_str(name),
            Type::Map(key, value) => write!(f, "map[{}]{}", key, value),
            Type::Array(elem) => write!(f, "[]{}", elem),
            Type::Reference(r) => write!(f, "{}", r),
            Type::Unrepresentable(name) => write!(f, "<{}>", name),
        }
    }
}
