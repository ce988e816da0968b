//! Type model: packages, declarations and type expressions
//!
//! Pure data. Every declaration can describe itself (name, kind and the
//! references it directly holds) without any outside context, which is all
//! the reachability engine needs.

mod declaration;
mod tags;
mod types;

pub use declaration::{
    AliasDeclaration, Declaration, DeclarationKey, DeclarationKind, Field, StructDeclaration,
};
pub use tags::Tags;
pub use types::{Type, TypeReference};

use serde::{Deserialize, Serialize};

/// A package and its exported declarations, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique import path
    pub path: String,

    /// Name from the package clause (may differ from the last path element)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Package documentation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,

    /// Declarations in source order
    pub declarations: Vec<Declaration>,
}

impl Package {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: String::new(),
            doc: String::new(),
            declarations: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_declaration(mut self, decl: impl Into<Declaration>) -> Self {
        self.declarations.push(decl.into());
        self
    }

    /// Look up a declaration by name
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name() == name)
    }

    pub fn key(&self, decl: &Declaration) -> DeclarationKey {
        DeclarationKey::new(self.path.clone(), decl.name())
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }
}

/// Total number of declarations across packages
pub fn declaration_count(packages: &[Package]) -> usize {
    packages.iter().map(Package::len).sum()
}
