use super::common::{children_of_kind, descendants, doc_comment, has_token, is_exported, node_text};
use super::ParseError;
use crate::config::Config;
use crate::discovery::{BuildContext, PackageSource};
use crate::model::{
    AliasDeclaration, Declaration, Field, Package, StructDeclaration, Tags, Type, TypeReference,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use tree_sitter::{Node, Parser as TsParser, Tree};

/// Frontend options
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// References substituted with an arbitrary type before they reach the model
    pub mapping: HashMap<TypeReference, Type>,

    /// Turn same-package identifiers naming an exported type into references
    pub resolve_local_types: bool,

    /// Import path -> package clause name, for packages known up front
    pub known_packages: HashMap<String, String>,

    /// Files whose build constraints fail for this platform are skipped
    pub build: BuildContext,
}

impl ParseOptions {
    /// Options for a run driven by `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            mapping: config.mapping(),
            resolve_local_types: config.resolve_local_types,
            known_packages: HashMap::new(),
            build: config.build_context(),
        }
    }
}

/// Go source parser using tree-sitter.
///
/// Stateless apart from its options, so one instance can be shared across
/// threads; each file gets its own tree-sitter parser.
pub struct GoParser {
    options: ParseOptions,
}

/// A parsed file waiting for conversion
struct SourceUnit<'s> {
    path: &'s Path,
    source: &'s str,
    tree: Tree,
}

/// What a type spec turns into
enum SpecKind<'t> {
    Struct(Node<'t>),
    Alias(Node<'t>),
    /// Interfaces and func types never reach the model
    Skipped(&'static str),
}

impl GoParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Read and parse every file of a discovered package
    pub fn parse_package(&self, source: &PackageSource) -> Result<Package, ParseError> {
        let sources = read_sources(source)?;
        self.parse_sources(&source.import_path, &source.dir, &sources)
    }

    /// Import paths used by the buildable files of a package
    pub fn imports(&self, source: &PackageSource) -> Result<BTreeSet<String>, ParseError> {
        let mut imports = BTreeSet::new();

        for (path, contents) in read_sources(source)? {
            if !self.is_buildable(&path, &contents) {
                continue;
            }
            let tree = self.parse_tree(&path, &contents)?;
            for spec in import_specs(tree.root_node()) {
                if let Some(path_node) = spec.child_by_field_name("path") {
                    imports.insert(unquote(node_text(path_node, &contents)));
                }
            }
        }

        Ok(imports)
    }

    fn is_buildable(&self, path: &Path, source: &str) -> bool {
        let build = &self.options.build;
        let buildable = build.matches_file_name(path) && build.matches_source(source);
        if !buildable {
            trace!("Build constraints exclude: {}", path.display());
        }
        buildable
    }

    /// Parse in-memory files that together form one package
    pub fn parse_sources(
        &self,
        import_path: &str,
        dir: &Path,
        sources: &[(PathBuf, String)],
    ) -> Result<Package, ParseError> {
        if sources.is_empty() {
            return Err(ParseError::NoGoFiles {
                dir: dir.to_path_buf(),
            });
        }

        let buildable: Vec<&(PathBuf, String)> = sources
            .iter()
            .filter(|(path, source)| self.is_buildable(path, source))
            .collect();
        if buildable.is_empty() {
            return Err(ParseError::ExcludedByConstraints {
                dir: dir.to_path_buf(),
            });
        }

        debug!("Parsing package {} ({} files)", import_path, buildable.len());

        let mut units = Vec::with_capacity(buildable.len());
        for (path, source) in buildable {
            trace!("Parsing Go file: {}", path.display());
            let tree = self.parse_tree(path, source)?;
            units.push(SourceUnit {
                path,
                source,
                tree,
            });
        }

        let mut package = Package::new(import_path);
        let mut clause_names: Vec<String> = Vec::new();

        for unit in &units {
            let root = unit.tree.root_node();
            for clause in children_of_kind(root, "package_clause") {
                if let Some(ident) = children_of_kind(clause, "package_identifier").first() {
                    let name = node_text(*ident, unit.source).to_string();
                    if !clause_names.contains(&name) {
                        clause_names.push(name);
                    }
                }
                if package.doc.is_empty() {
                    package.doc = doc_comment(clause, unit.source);
                }
            }
        }

        if clause_names.len() > 1 {
            return Err(ParseError::MixedPackages {
                dir: dir.to_path_buf(),
                found: clause_names,
            });
        }
        package.name = clause_names.pop().unwrap_or_default();

        let local_types: HashSet<String> = if self.options.resolve_local_types {
            units.iter().flat_map(|u| self.local_type_names(u)).collect()
        } else {
            HashSet::new()
        };

        let mut seen = HashSet::new();
        for unit in &units {
            let imports = self.file_imports(unit);
            let converter = TypeConverter {
                options: &self.options,
                package_path: import_path,
                local_types: &local_types,
                imports: &imports,
                file: unit.path,
                source: unit.source,
            };

            for decl in converter.declarations(unit.tree.root_node())? {
                if !seen.insert(decl.name().to_string()) {
                    return Err(ParseError::DuplicateDeclaration {
                        package: import_path.to_string(),
                        name: decl.name().to_string(),
                    });
                }
                package.declarations.push(decl);
            }
        }

        debug!("Package {}: {} declarations", import_path, package.len());
        Ok(package)
    }

    fn parse_tree(&self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ParseError::Grammar(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Syntax {
                file: path.to_path_buf(),
                line: 1,
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = descendants(root)
                .find(|n| n.is_error() || n.is_missing())
                .map(|n| n.start_position().row + 1)
                .unwrap_or(1);
            return Err(ParseError::Syntax {
                file: path.to_path_buf(),
                line,
            });
        }

        Ok(tree)
    }

    /// Exported names that will become declarations
    fn local_type_names(&self, unit: &SourceUnit) -> Vec<String> {
        let root = unit.tree.root_node();
        let mut names = Vec::new();

        for decl in children_of_kind(root, "type_declaration") {
            for spec in type_specs(decl) {
                let Some(name) = spec.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name, unit.source);
                if !is_exported(name) {
                    continue;
                }
                if let Some(ty) = spec.child_by_field_name("type") {
                    if !matches!(classify_spec(ty), SpecKind::Skipped(_)) {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names
    }

    /// Qualifier -> import path for one file
    fn file_imports(&self, unit: &SourceUnit) -> HashMap<String, String> {
        let root = unit.tree.root_node();
        let mut explicit = HashMap::new();
        let mut implicit = HashMap::new();

        for spec in import_specs(root) {
            let Some(path_node) = spec.child_by_field_name("path") else {
                continue;
            };
            let path = unquote(node_text(path_node, unit.source));

            match spec.child_by_field_name("name") {
                Some(name) if name.kind() == "package_identifier" => {
                    explicit.insert(node_text(name, unit.source).to_string(), path);
                }
                // `_` and `.` imports introduce no qualifier
                Some(_) => {}
                None => {
                    for qualifier in self.default_qualifiers(&path) {
                        implicit.entry(qualifier).or_insert_with(|| path.clone());
                    }
                }
            }
        }

        implicit.extend(explicit);
        implicit
    }

    /// Qualifiers an unaliased import may be referred to by
    fn default_qualifiers(&self, import_path: &str) -> Vec<String> {
        if let Some(name) = self.options.known_packages.get(import_path) {
            return vec![name.clone()];
        }

        let segments: Vec<&str> = import_path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(&last) = segments.last() else {
            return Vec::new();
        };

        let mut candidates = vec![last.to_string()];

        if is_major_version(last) && segments.len() > 1 {
            candidates.push(segments[segments.len() - 2].to_string());
        }

        for candidate in candidates.clone() {
            let cleaned = clean_package_name(&candidate);
            if !candidates.contains(&cleaned) {
                candidates.push(cleaned);
            }
        }

        candidates
    }
}

/// Converts syntax of one file into model values
struct TypeConverter<'c> {
    options: &'c ParseOptions,
    package_path: &'c str,
    local_types: &'c HashSet<String>,
    imports: &'c HashMap<String, String>,
    file: &'c Path,
    source: &'c str,
}

impl<'c> TypeConverter<'c> {
    fn declarations(&self, root: Node) -> Result<Vec<Declaration>, ParseError> {
        let mut out = Vec::new();

        for decl in children_of_kind(root, "type_declaration") {
            let grouped = has_token(decl, "(");
            for spec in type_specs(decl) {
                let mut doc = doc_comment(spec, self.source);
                if doc.is_empty() && !grouped {
                    doc = doc_comment(decl, self.source);
                }
                if let Some(declaration) = self.type_spec(spec, doc)? {
                    out.push(declaration);
                }
            }
        }

        Ok(out)
    }

    fn type_spec(&self, spec: Node, doc: String) -> Result<Option<Declaration>, ParseError> {
        let (Some(name_node), Some(type_node)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            return Ok(None);
        };

        let name = node_text(name_node, self.source);
        if !is_exported(name) {
            return Ok(None);
        }

        match classify_spec(type_node) {
            SpecKind::Struct(body) => {
                let fields = self.struct_fields(body)?;
                Ok(Some(Declaration::Struct(StructDeclaration {
                    name: name.to_string(),
                    doc,
                    fields,
                })))
            }
            SpecKind::Alias(ty) => Ok(Some(Declaration::Alias(
                AliasDeclaration::new(name, self.convert(ty)?).with_doc(doc),
            ))),
            SpecKind::Skipped(what) => {
                trace!("Skipping {} type {}", what, name);
                Ok(None)
            }
        }
    }

    fn struct_fields(&self, struct_node: Node) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();

        for list in children_of_kind(struct_node, "field_declaration_list") {
            for decl in children_of_kind(list, "field_declaration") {
                let tags = decl
                    .child_by_field_name("tag")
                    .map(|t| Tags::parse(&unquote_tag(node_text(t, self.source))))
                    .unwrap_or_default();

                if tags.json("-") {
                    continue;
                }

                let Some(type_node) = decl.child_by_field_name("type") else {
                    continue;
                };
                let doc = doc_comment(decl, self.source);

                let mut cursor = decl.walk();
                let names: Vec<&str> = decl
                    .children_by_field_name("name", &mut cursor)
                    .map(|n| node_text(n, self.source))
                    .collect();

                if names.is_empty() || tags.json("inline") {
                    let mut ty = self.convert(type_node)?;
                    if names.is_empty() && has_token(decl, "*") {
                        ty = Type::pointer(ty);
                    }
                    fields.push(Field::embedded(ty).with_doc(doc).with_tags(tags));
                    continue;
                }

                for name in names.into_iter().filter(|n| is_exported(n)) {
                    fields.push(
                        Field::new(name, self.convert(type_node)?)
                            .with_doc(doc.clone())
                            .with_tags(tags.clone()),
                    );
                }
            }
        }

        Ok(fields)
    }

    /// Convert a type expression
    fn convert(&self, node: Node) -> Result<Type, ParseError> {
        let ty = match node.kind() {
            "type_identifier" | "identifier" => {
                let name = node_text(node, self.source);
                if self.local_types.contains(name) {
                    Type::reference(self.package_path, name)
                } else {
                    Type::primitive(name)
                }
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => Type::pointer(self.convert(inner)?),
                None => Type::unrepresentable("pointer"),
            },
            "slice_type" | "array_type" => match node.child_by_field_name("element") {
                Some(elem) => Type::array(self.convert(elem)?),
                None => Type::unrepresentable("array"),
            },
            "map_type" => match (
                node.child_by_field_name("key"),
                node.child_by_field_name("value"),
            ) {
                (Some(k), Some(v)) => Type::map(self.convert(k)?, self.convert(v)?),
                _ => Type::unrepresentable("map"),
            },
            "qualified_type" => self.qualified(node)?,
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.convert(inner)?,
                None => Type::unrepresentable("paren"),
            },
            "interface_type" => Type::primitive("any"),
            "function_type" => Type::unrepresentable("func"),
            "channel_type" => Type::unrepresentable("chan"),
            "generic_type" => Type::unrepresentable("generic"),
            "struct_type" => Type::unrepresentable("struct"),
            other => Type::unrepresentable(other),
        };
        Ok(ty)
    }

    fn qualified(&self, node: Node) -> Result<Type, ParseError> {
        let (Some(pkg), Some(name)) = (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) else {
            return Ok(Type::unrepresentable("qualified"));
        };

        let qualifier = node_text(pkg, self.source);
        let Some(package_path) = self.imports.get(qualifier) else {
            return Err(ParseError::UnresolvedQualifier {
                file: self.file.to_path_buf(),
                qualifier: qualifier.to_string(),
            });
        };

        let reference = TypeReference::new(package_path.clone(), node_text(name, self.source));
        if let Some(mapped) = self.options.mapping.get(&reference) {
            trace!("Mapped {} to {}", reference, mapped);
            return Ok(mapped.clone());
        }

        Ok(Type::Reference(reference))
    }
}

/// `type_spec` and `type_alias` children of a type declaration
fn read_sources(source: &PackageSource) -> Result<Vec<(PathBuf, String)>, ParseError> {
    source
        .files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .map(|contents| (path.clone(), contents))
                .map_err(|e| ParseError::Io {
                    path: path.clone(),
                    source: e,
                })
        })
        .collect()
}

/// Every `import_spec` of a file, grouped or not
fn import_specs(root: Node) -> Vec<Node> {
    let mut specs = Vec::new();
    for decl in children_of_kind(root, "import_declaration") {
        specs.extend(children_of_kind(decl, "import_spec"));
        for list in children_of_kind(decl, "import_spec_list") {
            specs.extend(children_of_kind(list, "import_spec"));
        }
    }
    specs
}

fn type_specs(decl: Node) -> Vec<Node> {
    let mut cursor = decl.walk();
    let specs = decl
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "type_spec" | "type_alias"))
        .collect();
    specs
}

fn classify_spec(ty: Node) -> SpecKind {
    match ty.kind() {
        "struct_type" => SpecKind::Struct(ty),
        "interface_type" => SpecKind::Skipped("interface"),
        "function_type" => SpecKind::Skipped("func"),
        _ => SpecKind::Alias(ty),
    }
}

fn unquote(literal: &str) -> String {
    literal.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Tag literals are raw (`` `json:"x"` ``) or interpreted (`"json:\"x\""`)
fn unquote_tag(literal: &str) -> String {
    if let Some(inner) = literal.strip_prefix('"').and_then(|l| l.strip_suffix('"')) {
        inner.replace("\\\"", "\"")
    } else {
        literal.to_string()
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// `yaml.v3` -> `yaml`, `go-cmp` -> `cmp`, `utils-go` -> `utils`
fn clean_package_name(segment: &str) -> String {
    let mut name = segment;
    if let Some((base, version)) = name.rsplit_once('.') {
        if is_major_version(version) {
            name = base;
        }
    }
    let name = name.strip_prefix("go-").unwrap_or(name);
    let name = name.strip_suffix("-go").unwrap_or(name);
    name.replace('-', "_")
}
