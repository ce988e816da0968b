use super::{Tags, Type, TypeReference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a declaration across all packages of one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationKey {
    /// Package import path
    pub package: String,
    /// Declaration name
    pub name: String,
}

impl DeclarationKey {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Parse `pkg/path.Name`, splitting on the last dot
    pub fn parse(qualified: &str) -> Option<Self> {
        let (package, name) = qualified.rsplit_once('.')?;
        if package.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(package, name))
    }
}

impl From<&TypeReference> for DeclarationKey {
    fn from(r: &TypeReference) -> Self {
        Self::new(r.package_path.clone(), r.name.clone())
    }
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// Kind of declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Struct,
    Alias,
}

impl DeclarationKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeclarationKind::Struct => "struct",
            DeclarationKind::Alias => "alias",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A struct field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name; empty when embedded
    pub name: String,

    /// Documentation comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,

    /// Struct tags
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,

    /// Anonymous field, or one flattened with `json:",inline"`
    #[serde(default)]
    pub embedded: bool,

    /// Field type
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            tags: Tags::new(),
            embedded: false,
            ty,
        }
    }

    pub fn embedded(ty: Type) -> Self {
        Self {
            name: String::new(),
            doc: String::new(),
            tags: Tags::new(),
            embedded: true,
            ty,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// `type Name struct { ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    pub fields: Vec<Field>,
}

impl StructDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// References held directly by field types.
    ///
    /// Only a field whose type *is* a reference counts; `[]pkg.T`,
    /// `*pkg.T` and `map[K]pkg.T` do not.
    pub fn refs(&self) -> Vec<&TypeReference> {
        self.fields
            .iter()
            .filter_map(|f| f.ty.as_reference())
            .collect()
    }
}

/// `type Name T` or `type Name = T` for any non-struct T
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl AliasDeclaration {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            ty,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }
}

/// An exported type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Struct(StructDeclaration),
    Alias(AliasDeclaration),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Struct(s) => &s.name,
            Declaration::Alias(a) => &a.name,
        }
    }

    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Struct(_) => DeclarationKind::Struct,
            Declaration::Alias(_) => DeclarationKind::Alias,
        }
    }

    pub fn doc(&self) -> &str {
        match self {
            Declaration::Struct(s) => &s.doc,
            Declaration::Alias(a) => &a.doc,
        }
    }

    /// Cross-package references this declaration directly declares.
    ///
    /// Local and O(field count). Aliases never report references, even when
    /// their type mentions one.
    pub fn refs(&self) -> Vec<&TypeReference> {
        match self {
            Declaration::Struct(s) => s.refs(),
            Declaration::Alias(_) => Vec::new(),
        }
    }

    /// `(field name, obstruction)` for every part the generator cannot render.
    /// Aliases report an empty field name.
    pub fn unrepresentable(&self) -> Vec<(&str, &str)> {
        match self {
            Declaration::Struct(s) => s
                .fields
                .iter()
                .filter_map(|f| f.ty.find_unrepresentable().map(|u| (f.name.as_str(), u)))
                .collect(),
            Declaration::Alias(a) => a
                .ty
                .find_unrepresentable()
                .map(|u| vec![("", u)])
                .unwrap_or_default(),
        }
    }

    /// Get a display string for this declaration
    pub fn display(&self) -> String {
        format!("{} {}", self.kind().display_name(), self.name())
    }
}

impl From<StructDeclaration> for Declaration {
    fn from(s: StructDeclaration) -> Self {
        Declaration::Struct(s)
    }
}

impl From<AliasDeclaration> for Declaration {
    fn from(a: AliasDeclaration) -> Self {
        Declaration::Alias(a)
    }
}
