//! Model Catalog Adapter
//!
//! Declarative models written as TOML (or built in code), with field types in
//! Python typing notation:
//!
//! ```toml
//! [[model]]
//! name = "User"
//! fields = [
//!     { name = "id", type = "int" },
//!     { name = "profile", type = "Optional[Profile]" },
//!     { name = "posts", type = "list[Post]" },
//! ]
//! ```
//!
//! A field references a model when the innermost type of its expression is
//! the name of a model declared in the same catalog. Model identity is the
//! catalog itself plus the model's [`TypeIndex`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::OnceLock;

use super::{unknown_model, LoadConfig, SchemaAdapter, SchemaFormat};
use crate::erd::{Cardinality, Field, Model};
use crate::error::{ErdError, Result};

/// A field declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A model declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelDef>,
}

/// Position of a model inside its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub usize);

/// A validated set of model declarations
#[derive(Debug)]
pub struct Catalog {
    models: Vec<ModelDef>,
    by_name: HashMap<String, TypeIndex>,
}

impl Catalog {
    /// Build a catalog; model names, and field names within a model, must be
    /// non-empty and unique
    pub fn from_defs(models: Vec<ModelDef>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(models.len());

        for (idx, model) in models.iter().enumerate() {
            let name = model.name.trim();
            if name.is_empty() {
                return Err(ErdError::InvalidFormat(format!(
                    "model #{} has an empty name",
                    idx
                )));
            }
            if by_name.insert(name.to_string(), TypeIndex(idx)).is_some() {
                return Err(ErdError::InvalidFormat(format!(
                    "model `{}` is declared more than once",
                    name
                )));
            }

            let mut field_names = HashSet::with_capacity(model.fields.len());
            for (position, field) in model.fields.iter().enumerate() {
                let field_name = field.name.trim();
                if field_name.is_empty() {
                    return Err(ErdError::InvalidFormat(format!(
                        "field #{} of `{}` has an empty name",
                        position, name
                    )));
                }
                if !field_names.insert(field_name) {
                    return Err(ErdError::InvalidFormat(format!(
                        "field `{}.{}` is declared more than once",
                        name, field_name
                    )));
                }
            }
        }

        Ok(Self { models, by_name })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_defs(file.models)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), models = catalog.len(), "loaded model catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.trim())
    }

    pub fn index_of(&self, name: &str) -> Option<TypeIndex> {
        self.by_name.get(name.trim()).copied()
    }

    pub fn get(&self, index: TypeIndex) -> Option<&ModelDef> {
        self.models.get(index.0)
    }

    /// Wrap the model declared under `name`
    pub fn model(&self, name: &str) -> Result<CatalogModel<'_>> {
        match self.index_of(name) {
            Some(index) => CatalogModel::new(self, index),
            None => Err(unknown_model(name, self.names())),
        }
    }
}

impl SchemaAdapter for Catalog {
    type Model<'a> = CatalogModel<'a> where Self: 'a;

    const FORMAT: SchemaFormat = SchemaFormat::Catalog;

    fn load(path: &Path, _config: &LoadConfig) -> Result<Self> {
        Self::from_file(path)
    }

    fn model(&self, handle: &str) -> Result<Self::Model<'_>> {
        Catalog::model(self, handle)
    }
}

/// A catalog model, identified by catalog address and index
#[derive(Clone, Copy)]
pub struct CatalogModel<'a> {
    catalog: &'a Catalog,
    index: TypeIndex,
    def: &'a ModelDef,
}

impl<'a> CatalogModel<'a> {
    pub fn new(catalog: &'a Catalog, index: TypeIndex) -> Result<Self> {
        let def = catalog.get(index).ok_or_else(|| {
            ErdError::invalid_input(
                format!("a model index below {}", catalog.len()),
                format!("index {}", index.0),
            )
        })?;
        Ok(Self {
            catalog,
            index,
            def,
        })
    }

    pub fn index(&self) -> TypeIndex {
        self.index
    }

    pub fn def(&self) -> &'a ModelDef {
        self.def
    }
}

impl fmt::Debug for CatalogModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogModel")
            .field("index", &self.index.0)
            .field("name", &self.def.name)
            .finish()
    }
}

impl PartialEq for CatalogModel<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.catalog, other.catalog) && self.index == other.index
    }
}

impl Eq for CatalogModel<'_> {}

impl Hash for CatalogModel<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.catalog, state);
        self.index.hash(state);
    }
}

impl<'a> Model for CatalogModel<'a> {
    type Field = CatalogField<'a>;

    fn key(&self) -> &str {
        self.def.name.trim()
    }

    fn name(&self) -> &str {
        self.def.name.trim()
    }

    fn fields(&self) -> Result<Vec<CatalogField<'a>>> {
        (0..self.def.fields.len())
            .map(|position| CatalogField::new(*self, position))
            .collect()
    }
}

/// A field of a catalog model with its parsed type expression
#[derive(Debug, Clone)]
pub struct CatalogField<'a> {
    model: CatalogModel<'a>,
    position: usize,
    def: &'a FieldDef,
    shape: TypeShape,
}

impl<'a> CatalogField<'a> {
    pub fn new(model: CatalogModel<'a>, position: usize) -> Result<Self> {
        let def = model.def.fields.get(position).ok_or_else(|| {
            ErdError::invalid_input(
                format!("a field position of `{}`", model.name()),
                format!("position {}", position),
            )
        })?;
        let shape = parse_type_expr(&def.ty).map_err(|received| {
            ErdError::invalid_input(
                "a type expression",
                format!("{} in `{}.{}`", received, model.name(), def.name),
            )
        })?;
        Ok(Self {
            model,
            position,
            def,
            shape,
        })
    }

    pub fn model(&self) -> CatalogModel<'a> {
        self.model
    }
}

impl PartialEq for CatalogField<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.position == other.position
    }
}

impl Eq for CatalogField<'_> {}

impl Hash for CatalogField<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.hash(state);
        self.position.hash(state);
    }
}

impl<'a> Field for CatalogField<'a> {
    type Target = CatalogModel<'a>;

    fn name(&self) -> &str {
        self.def.name.trim()
    }

    fn type_display(&self) -> String {
        self.def.ty.trim().to_string()
    }

    fn referenced_model(&self) -> Result<Option<CatalogModel<'a>>> {
        let catalog = self.model.catalog;
        match self.shape.target.as_deref().and_then(|name| catalog.index_of(name)) {
            Some(index) => CatalogModel::new(catalog, index).map(Some),
            None => Ok(None),
        }
    }

    fn cardinality(&self) -> Cardinality {
        self.shape.cardinality
    }

    fn is_nullable(&self) -> bool {
        self.shape.nullable
    }
}

// =============================================================================
// Type expressions
// =============================================================================

/// What a type expression boils down to
#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeShape {
    /// Innermost bare name, if any
    target: Option<String>,
    cardinality: Cardinality,
    nullable: bool,
}

impl TypeShape {
    fn opaque(nullable: bool) -> Self {
        Self {
            target: None,
            cardinality: Cardinality::One,
            nullable,
        }
    }
}

fn generic_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\s*\[(.*)\]$").expect("generic type pattern is valid")
    })
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("name pattern is valid")
    })
}

fn is_none(expr: &str) -> bool {
    matches!(expr, "None" | "NoneType" | "null")
}

/// Parse a typing expression; the error is a description of the bad input
fn parse_type_expr(expr: &str) -> std::result::Result<TypeShape, String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err("an empty type".to_string());
    }
    if !brackets_balanced(expr) {
        return Err(format!("unbalanced brackets in `{}`", expr));
    }

    // Forward references: 'Node', "list[Post]"
    if let Some(inner) = strip_quotes(expr) {
        return parse_type_expr(inner);
    }

    let members = split_top_level(expr, '|');
    if members.len() > 1 {
        return parse_union(&members);
    }

    if let Some(caps) = generic_pattern().captures(expr) {
        let ctor = caps[1].rsplit('.').next().unwrap_or(&caps[1]);
        let args = split_top_level(&caps[2], ',');

        return match ctor {
            "Annotated" => parse_type_expr(args[0]),
            "Optional" => {
                let mut inner = parse_type_expr(args[0])?;
                inner.nullable = true;
                Ok(inner)
            }
            "Union" => parse_union(&args),
            "list" | "List" | "Sequence" | "Iterable" | "tuple" | "Tuple" => {
                collection(args[0], Cardinality::Sequence)
            }
            "set" | "Set" | "frozenset" | "FrozenSet" => collection(args[0], Cardinality::Set),
            "dict" | "Dict" | "Mapping" | "MutableMapping" => {
                let value = args.last().copied().unwrap_or_default();
                collection(value, Cardinality::Mapping)
            }
            _ => Ok(TypeShape::opaque(false)),
        };
    }

    if is_none(expr) {
        return Ok(TypeShape::opaque(true));
    }

    if name_pattern().is_match(expr) {
        return Ok(TypeShape {
            target: Some(expr.to_string()),
            cardinality: Cardinality::One,
            nullable: false,
        });
    }

    Err(format!("unrecognized type `{}`", expr))
}

/// Inner text of a `'...'` or `"..."` literal, if `expr` is exactly one
fn strip_quotes(expr: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        expr.strip_prefix(quote)?
            .strip_suffix(quote)
            .filter(|inner| !inner.contains(quote))
    })
}

fn parse_union(members: &[&str]) -> std::result::Result<TypeShape, String> {
    let others: Vec<&str> = members.iter().copied().filter(|m| !is_none(m.trim())).collect();
    let nullable = others.len() < members.len();

    match others.as_slice() {
        [only] => {
            let mut inner = parse_type_expr(only)?;
            inner.nullable |= nullable;
            Ok(inner)
        }
        // Several non-null alternatives: no single target
        _ => Ok(TypeShape::opaque(nullable)),
    }
}

fn collection(item: &str, cardinality: Cardinality) -> std::result::Result<TypeShape, String> {
    let inner = parse_type_expr(item)?;
    Ok(TypeShape {
        target: inner.target,
        cardinality,
        nullable: false,
    })
}

fn brackets_balanced(expr: &str) -> bool {
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on `sep` outside of brackets, trimming each part
fn split_top_level(expr: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(expr[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(expr[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(expr: &str) -> TypeShape {
        parse_type_expr(expr).unwrap()
    }

    #[test]
    fn test_parse_bare_name() {
        let s = shape("Profile");
        assert_eq!(s.target.as_deref(), Some("Profile"));
        assert_eq!(s.cardinality, Cardinality::One);
        assert!(!s.nullable);
    }

    #[test]
    fn test_parse_optional_forms() {
        for expr in ["Optional[Profile]", "Profile | None", "None | Profile", "typing.Optional[Profile]", "Union[Profile, None]"] {
            let s = shape(expr);
            assert_eq!(s.target.as_deref(), Some("Profile"), "{}", expr);
            assert!(s.nullable, "{}", expr);
            assert_eq!(s.cardinality, Cardinality::One, "{}", expr);
        }
    }

    #[test]
    fn test_parse_collections() {
        assert_eq!(shape("list[Post]").cardinality, Cardinality::Sequence);
        assert_eq!(shape("List[Post]").target.as_deref(), Some("Post"));
        assert_eq!(shape("tuple[Post, ...]").target.as_deref(), Some("Post"));
        assert_eq!(shape("frozenset[Tag]").cardinality, Cardinality::Set);

        let map = shape("dict[str, Profile]");
        assert_eq!(map.cardinality, Cardinality::Mapping);
        assert_eq!(map.target.as_deref(), Some("Profile"));
    }

    #[test]
    fn test_parse_optional_collection() {
        let s = shape("Optional[list[Post]]");
        assert_eq!(s.target.as_deref(), Some("Post"));
        assert_eq!(s.cardinality, Cardinality::Sequence);
        assert!(s.nullable);
    }

    #[test]
    fn test_parse_opaque_types() {
        assert_eq!(shape("Literal['a', 'b']").target, None);
        assert_eq!(shape("int | str").target, None);
        assert!(shape("int | str | None").nullable);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_type_expr("").is_err());
        assert!(parse_type_expr("list[Post").is_err());
        assert!(parse_type_expr("list]Post[").is_err());
        assert!(parse_type_expr("not a type").is_err());
    }

    #[test]
    fn test_parse_forward_references() {
        let s = shape("Optional['Node']");
        assert_eq!(s.target.as_deref(), Some("Node"));
        assert!(s.nullable);

        assert_eq!(shape("list[\"Post\"]").cardinality, Cardinality::Sequence);
        assert_eq!(shape("list[\"Post\"]").target.as_deref(), Some("Post"));
        assert_eq!(shape("'list[Post]'").target.as_deref(), Some("Post"));
        assert_eq!(shape("'Profile' | None").target.as_deref(), Some("Profile"));

        assert!(parse_type_expr("''").is_err());
        assert!(parse_type_expr("'Node\"").is_err());
    }

    #[test]
    fn test_parse_annotated() {
        let s = shape("Annotated[Profile, Field(description='x')]");
        assert_eq!(s.target.as_deref(), Some("Profile"));
        assert_eq!(s.cardinality, Cardinality::One);

        let s = shape("Annotated[list[Post], 'meta']");
        assert_eq!(s.target.as_deref(), Some("Post"));
        assert_eq!(s.cardinality, Cardinality::Sequence);
    }

    #[test]
    fn test_quoted_self_and_mutual_references() {
        let catalog = Catalog::from_defs(vec![
            ModelDef::new("Node")
                .field("parent", "Optional['Node']")
                .field("owner", "'Owner'"),
            ModelDef::new("Owner").field("nodes", "list[\"Node\"]"),
        ])
        .unwrap();
        let diagram = crate::erd::discover([catalog.model("Node").unwrap()]).unwrap();

        let labels: Vec<String> = diagram.sorted_edges().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            labels,
            vec!["Node.owner -> Owner", "Node.parent -> Node", "Owner.nodes -> Node"]
        );
    }

    #[test]
    fn test_catalog_rejects_duplicate_fields() {
        let result = Catalog::from_defs(vec![
            ModelDef::new("User")
                .field("profile", "Profile")
                .field("profile", "Profile"),
            ModelDef::new("Profile"),
        ]);
        match result {
            Err(ErdError::InvalidFormat(msg)) => assert!(msg.contains("User.profile")),
            other => panic!("Expected InvalidFormat, got {:?}", other),
        }

        let result = Catalog::from_defs(vec![ModelDef::new("User").field(" ", "int")]);
        assert!(matches!(result, Err(ErdError::InvalidFormat(_))));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("dict[str, int], Post", ','), vec!["dict[str, int]", "Post"]);
        assert_eq!(split_top_level("A | list[B | None]", '|'), vec!["A", "list[B | None]"]);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let result = Catalog::from_defs(vec![ModelDef::new("User"), ModelDef::new("User")]);
        assert!(matches!(result, Err(ErdError::InvalidFormat(_))));

        let result = Catalog::from_defs(vec![ModelDef::new("  ")]);
        assert!(matches!(result, Err(ErdError::InvalidFormat(_))));
    }

    #[test]
    fn test_model_index_out_of_range() {
        let catalog = Catalog::from_defs(vec![ModelDef::new("User")]).unwrap();
        let result = CatalogModel::new(&catalog, TypeIndex(7));
        assert!(matches!(result, Err(ErdError::InvalidInput { .. })));
    }

    #[test]
    fn test_unknown_model_name() {
        let catalog = Catalog::from_defs(vec![ModelDef::new("User"), ModelDef::new("Order")]).unwrap();
        match catalog.model("Usr") {
            Err(ErdError::UnknownModel { suggestions, .. }) => {
                assert_eq!(suggestions, vec!["User".to_string()]);
            }
            other => panic!("Expected UnknownModel, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_is_per_catalog() {
        let defs = vec![ModelDef::new("User")];
        let first = Catalog::from_defs(defs.clone()).unwrap();
        let second = Catalog::from_defs(defs).unwrap();

        assert_eq!(first.model("User").unwrap(), first.model("User").unwrap());
        assert_ne!(first.model("User").unwrap(), second.model("User").unwrap());
    }

    #[test]
    fn test_fields_compare_by_descriptor() {
        let catalog = Catalog::from_defs(vec![
            ModelDef::new("User").field("profile", "Profile").field("id", "int"),
            ModelDef::new("Profile"),
        ])
        .unwrap();
        let user = catalog.model("User").unwrap();

        let first = user.fields().unwrap();
        let second = user.fields().unwrap();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_field_metadata() {
        let catalog = Catalog::from_defs(vec![
            ModelDef::new("User")
                .field("posts", "list[Post]")
                .field("manager", "Optional[User]")
                .field("email", "str"),
            ModelDef::new("Post"),
        ])
        .unwrap();
        let fields = catalog.model("User").unwrap().fields().unwrap();

        assert!(fields[0].is_many());
        assert_eq!(fields[0].type_display(), "list[Post]");
        assert_eq!(fields[0].referenced_model().unwrap().unwrap().name(), "Post");

        assert!(fields[1].is_nullable());
        assert_eq!(fields[1].referenced_model().unwrap().unwrap().name(), "User");

        assert!(fields[2].referenced_model().unwrap().is_none());
    }

    #[test]
    fn test_from_toml() {
        let catalog = Catalog::from_toml_str(
            r#"
            [[model]]
            name = "User"
            fields = [
                { name = "id", type = "int" },
                { name = "profile", type = "Profile" },
            ]

            [[model]]
            name = "Profile"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.index_of("Profile"), Some(TypeIndex(1)));
        assert_eq!(catalog.get(TypeIndex(0)).unwrap().fields.len(), 2);
    }
}
