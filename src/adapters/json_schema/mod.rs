//! JSON Schema Adapter
//!
//! Binds the model contract to JSON Schema documents. A definition is a
//! model when it describes an object (`"type": "object"` or `properties`);
//! its properties are the fields. A property references a model through
//! `$ref`, directly or wrapped in `allOf`, a nullable `anyOf`/`oneOf`, array
//! `items`, or map `additionalProperties`.
//!
//! Definitions are keyed by [`SchemaId`]: the document `$id` (or relative
//! path) for document roots, `<document>#/$defs/<name>` for nested ones.

pub mod loader;

pub use loader::{load_from_directory, load_from_documents, load_from_embedded, load_from_file};

use include_dir::Dir;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

use super::{unknown_model, LoadConfig, SchemaAdapter, SchemaFormat};
use crate::erd::{Cardinality, Field, Model};
use crate::error::{ErdError, Result};

/// Canonical schema identifier
pub type SchemaId = String;

/// One indexed definition (document root or `$defs` entry)
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub id: SchemaId,
    /// `title`, `$defs` key, or file stem
    pub name: String,
    /// Path of the containing document, relative to the load root
    pub path: PathBuf,
    /// Id of the containing document
    pub document: SchemaId,
    pub body: Value,
}

impl SchemaDef {
    /// Object-shaped definitions are models; enums and scalar aliases are not
    pub fn is_model(&self) -> bool {
        is_object_schema(&self.body)
    }
}

/// A loaded collection of JSON Schema definitions
pub struct SchemaSet {
    pub(crate) defs: HashMap<SchemaId, SchemaDef>,

    /// Insertion order (documents sorted by path)
    pub(crate) order: Vec<SchemaId>,

    /// Index: document path -> document $id
    pub(crate) by_path: HashMap<PathBuf, SchemaId>,

    /// Index: name -> list of ids (names can collide!)
    pub(crate) by_name: HashMap<String, Vec<SchemaId>>,

    pub(crate) bundle_hash: String,
}

impl SchemaSet {
    pub fn from_directory(schema_dir: &Path) -> Result<Self> {
        load_from_directory(schema_dir, &LoadConfig::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        load_from_file(path)
    }

    pub fn from_embedded(embedded_dir: &Dir<'_>) -> Result<Self> {
        load_from_embedded(embedded_dir, &LoadConfig::default())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// SHA-256 over the loaded document text
    pub fn bundle_hash(&self) -> &str {
        &self.bundle_hash
    }

    pub fn get(&self, id: &str) -> Option<&SchemaDef> {
        self.defs.get(id)
    }

    /// All definitions in load order
    pub fn definitions(&self) -> impl Iterator<Item = &SchemaDef> {
        self.order.iter().filter_map(|id| self.defs.get(id))
    }

    /// Resolve a query (id, path, or name) to a definition
    pub fn resolve(&self, query: &str) -> Option<&SchemaDef> {
        // Try as direct id
        if let Some(def) = self.defs.get(query) {
            return Some(def);
        }

        // Try as document path
        if let Some(id) = self.by_path.get(Path::new(query)) {
            return self.defs.get(id);
        }

        // Try as name (first match)
        if let Some(ids) = self.by_name.get(query) {
            return ids.first().and_then(|id| self.defs.get(id));
        }

        // Try case-insensitive name match, in load order
        let query_lower = query.to_lowercase();
        self.definitions()
            .find(|def| def.name.to_lowercase() == query_lower)
    }

    /// Wrap the definition named by `query` as a model
    pub fn model(&self, query: &str) -> Result<JsonSchemaModel<'_>> {
        match self.resolve(query) {
            Some(def) => JsonSchemaModel::new(self, def),
            None => Err(unknown_model(
                query,
                self.definitions().filter(|d| d.is_model()).map(|d| d.name.as_str()),
            )),
        }
    }

    /// Resolve a `$ref` written inside `from`
    pub fn resolve_ref(&self, from: &SchemaDef, reference: &str) -> Option<&SchemaDef> {
        let (location, fragment) = match reference.split_once('#') {
            Some((location, fragment)) => (location, fragment),
            None => (reference, ""),
        };

        let document = if location.is_empty() {
            from.document.clone()
        } else if self.defs.contains_key(location) {
            location.to_string()
        } else {
            let path = normalize_ref(location, &from.path);
            self.by_path.get(Path::new(&path))?.clone()
        };

        if fragment.is_empty() || fragment == "/" {
            return self.defs.get(&document);
        }

        // Fragments arrive URI-encoded (`Order%20Line`); ids are stored decoded
        let fragment = urlencoding::decode(fragment).unwrap_or(Cow::Borrowed(fragment));
        self.defs.get(&format!("{}#{}", document, fragment))
    }
}

impl SchemaAdapter for SchemaSet {
    type Model<'a> = JsonSchemaModel<'a> where Self: 'a;

    const FORMAT: SchemaFormat = SchemaFormat::JsonSchema;

    fn load(path: &Path, config: &LoadConfig) -> Result<Self> {
        if path.is_dir() {
            load_from_directory(path, config)
        } else {
            load_from_file(path)
        }
    }

    fn model(&self, handle: &str) -> Result<Self::Model<'_>> {
        SchemaSet::model(self, handle)
    }
}

// =============================================================================
// Model
// =============================================================================

/// A JSON Schema object definition viewed as a model
#[derive(Clone, Copy)]
pub struct JsonSchemaModel<'a> {
    set: &'a SchemaSet,
    def: &'a SchemaDef,
}

impl<'a> JsonSchemaModel<'a> {
    /// Fails with `InvalidInput` unless `def` describes an object
    pub fn new(set: &'a SchemaSet, def: &'a SchemaDef) -> Result<Self> {
        if !def.is_model() {
            return Err(ErdError::invalid_input(
                "an object schema (\"type\": \"object\" or properties)",
                format!("{} schema `{}`", json_kind(&def.body), def.id),
            ));
        }
        Ok(Self { set, def })
    }

    pub fn def(&self) -> &'a SchemaDef {
        self.def
    }

    fn properties(&self) -> Option<&'a Map<String, Value>> {
        self.def.body.get("properties").and_then(|v| v.as_object())
    }

    fn required(&self) -> HashSet<&'a str> {
        self.def
            .body
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for JsonSchemaModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaModel")
            .field("id", &self.def.id)
            .field("name", &self.def.name)
            .finish()
    }
}

impl PartialEq for JsonSchemaModel<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.def.id == other.def.id
    }
}

impl Eq for JsonSchemaModel<'_> {}

impl Hash for JsonSchemaModel<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.def.id.hash(state);
    }
}

impl<'a> Model for JsonSchemaModel<'a> {
    type Field = JsonSchemaField<'a>;

    fn key(&self) -> &str {
        &self.def.id
    }

    fn name(&self) -> &str {
        &self.def.name
    }

    fn fields(&self) -> Result<Vec<JsonSchemaField<'a>>> {
        let Some(properties) = self.properties() else {
            return Ok(Vec::new());
        };
        let required = self.required();

        properties
            .iter()
            .map(|(name, schema)| {
                JsonSchemaField::new(*self, name, schema, required.contains(name.as_str()))
            })
            .collect()
    }
}

// =============================================================================
// Field
// =============================================================================

/// One property of a [`JsonSchemaModel`]
#[derive(Debug, Clone)]
pub struct JsonSchemaField<'a> {
    model: JsonSchemaModel<'a>,
    name: &'a str,
    schema: &'a Value,
    required: bool,
    shape: PropertyShape<'a>,
}

impl<'a> JsonSchemaField<'a> {
    /// Fails with `InvalidInput` unless `schema` is an object or boolean schema
    pub fn new(
        model: JsonSchemaModel<'a>,
        name: &'a str,
        schema: &'a Value,
        required: bool,
    ) -> Result<Self> {
        if !(schema.is_object() || schema.is_boolean()) {
            return Err(ErdError::invalid_input(
                "a property schema (object or boolean)",
                format!(
                    "{} for property `{}` of `{}`",
                    json_kind(schema),
                    name,
                    model.key()
                ),
            ));
        }
        Ok(Self {
            model,
            name,
            schema,
            required,
            shape: PropertyShape::of(schema),
        })
    }

    pub fn model(&self) -> JsonSchemaModel<'a> {
        self.model
    }

    pub fn schema(&self) -> &'a Value {
        self.schema
    }

    /// Listed in the owning schema's `required` array
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The raw `$ref` this property points through, if any
    pub fn reference(&self) -> Option<&'a str> {
        self.shape.reference
    }
}

impl PartialEq for JsonSchemaField<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.name == other.name
    }
}

impl Eq for JsonSchemaField<'_> {}

impl Hash for JsonSchemaField<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.hash(state);
        self.name.hash(state);
    }
}

impl<'a> Field for JsonSchemaField<'a> {
    type Target = JsonSchemaModel<'a>;

    fn name(&self) -> &str {
        self.name
    }

    fn type_display(&self) -> String {
        if self.shape.nullable {
            format!("{} | null", self.shape.display)
        } else {
            self.shape.display.clone()
        }
    }

    fn referenced_model(&self) -> Result<Option<JsonSchemaModel<'a>>> {
        let Some(reference) = self.shape.reference else {
            return Ok(None);
        };

        let set = self.model.set;
        let target = set
            .resolve_ref(self.model.def, reference)
            .ok_or_else(|| ErdError::UnresolvedRef {
                from: format!("{}.{}", self.model.def.id, self.name),
                reference: reference.to_string(),
            })?;

        if !target.is_model() {
            return Ok(None);
        }
        JsonSchemaModel::new(set, target).map(Some)
    }

    fn cardinality(&self) -> Cardinality {
        self.shape.cardinality
    }

    fn is_nullable(&self) -> bool {
        self.shape.nullable
    }
}

// =============================================================================
// Property classification
// =============================================================================

/// What a property schema points at and how many of it
#[derive(Debug, Clone, PartialEq, Eq)]
struct PropertyShape<'a> {
    reference: Option<&'a str>,
    cardinality: Cardinality,
    nullable: bool,
    display: String,
}

impl<'a> PropertyShape<'a> {
    fn scalar(display: impl Into<String>, nullable: bool) -> Self {
        Self {
            reference: None,
            cardinality: Cardinality::One,
            nullable,
            display: display.into(),
        }
    }

    fn of(schema: &'a Value) -> Self {
        let Some(obj) = schema.as_object() else {
            return Self::scalar("any", false);
        };

        let nullable = obj.get("nullable").and_then(|v| v.as_bool()).unwrap_or(false)
            || admits_null(obj.get("type"));

        if let Some(reference) = obj.get("$ref").and_then(|v| v.as_str()) {
            return Self {
                reference: Some(reference),
                cardinality: Cardinality::One,
                nullable,
                display: ref_label(reference),
            };
        }

        // allOf: [{$ref}] is how field-level metadata is attached to a ref
        if let Some([only]) = obj.get("allOf").and_then(|v| v.as_array()).map(Vec::as_slice) {
            return Self::of(only).or_nullable(nullable);
        }

        for key in ["anyOf", "oneOf"] {
            let Some(branches) = obj.get(key).and_then(|v| v.as_array()) else {
                continue;
            };
            let others: Vec<&Value> = branches.iter().filter(|b| !is_null_schema(b)).collect();
            let nullable = nullable || others.len() < branches.len();

            return match others.as_slice() {
                [only] => Self::of(*only).or_nullable(nullable),
                _ => Self::scalar(
                    others
                        .iter()
                        .map(|b| Self::of(*b).display)
                        .collect::<Vec<_>>()
                        .join(" | "),
                    nullable,
                ),
            };
        }

        match primary_type(obj) {
            Some("array") => {
                let items = obj
                    .get("items")
                    .map(Self::of)
                    .unwrap_or_else(|| Self::scalar("any", false));
                let unique = obj.get("uniqueItems").and_then(|v| v.as_bool()).unwrap_or(false);
                let (cardinality, ctor) = if unique {
                    (Cardinality::Set, "set")
                } else {
                    (Cardinality::Sequence, "list")
                };
                Self {
                    reference: items.reference,
                    cardinality,
                    nullable,
                    display: format!("{}[{}]", ctor, items.display),
                }
            }
            Some("object") if !obj.contains_key("properties") => {
                match obj.get("additionalProperties").filter(|v| v.is_object()) {
                    Some(values) => {
                        let values = Self::of(values);
                        Self {
                            reference: values.reference,
                            cardinality: Cardinality::Mapping,
                            nullable,
                            display: format!("map[string, {}]", values.display),
                        }
                    }
                    None => Self::scalar("object", nullable),
                }
            }
            Some(ty) => Self::scalar(ty, nullable),
            None if obj.contains_key("properties") => Self::scalar("object", nullable),
            None if obj.contains_key("enum") => Self::scalar("enum", nullable),
            None if obj.contains_key("const") => Self::scalar("const", nullable),
            None => Self::scalar("any", nullable),
        }
    }

    fn or_nullable(mut self, nullable: bool) -> Self {
        self.nullable |= nullable;
        self
    }
}

/// Whether a schema is an object schema (a model candidate)
fn is_object_schema(schema: &Value) -> bool {
    let Some(obj) = schema.as_object() else {
        return false;
    };
    let typed_object = match obj.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => false,
    };
    typed_object || obj.get("properties").map(|p| p.is_object()).unwrap_or(false)
}

/// First non-null entry of `type`
fn primary_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types.iter().filter_map(|t| t.as_str()).find(|t| *t != "null"),
        _ => None,
    }
}

fn admits_null(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(t)) => t == "null",
        Some(Value::Array(types)) => types.iter().any(|t| t == "null"),
        _ => false,
    }
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").map(|t| t == "null").unwrap_or(false)
}

/// Short label for a `$ref`: last pointer token, else the file stem
fn ref_label(reference: &str) -> String {
    match reference.split_once('#') {
        Some((_, fragment)) if !fragment.trim_matches('/').is_empty() => fragment
            .rsplit('/')
            .next()
            .unwrap_or(fragment)
            .replace("~1", "/")
            .replace("~0", "~"),
        Some((location, _)) => loader::file_stem_name(Path::new(location)),
        None => loader::file_stem_name(Path::new(reference)),
    }
}

fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(obj) => match obj.get("type").and_then(|t| t.as_str()) {
            Some(ty) => format!("\"{}\"", ty),
            None if obj.contains_key("enum") => "enum".to_string(),
            None => "untyped".to_string(),
        },
    }
}

/// Normalize a relative file `$ref` against the referencing document path
fn normalize_ref(ref_str: &str, current_path: &Path) -> String {
    if ref_str.starts_with("http://") || ref_str.starts_with("https://") {
        return ref_str.to_string();
    }

    let parent = current_path.parent().unwrap_or(Path::new(""));
    let resolved = parent.join(ref_str);

    let mut components = Vec::new();
    for component in resolved.components() {
        match component {
            Component::ParentDir => {
                components.pop();
            }
            Component::Normal(s) => {
                components.push(s.to_string_lossy().to_string());
            }
            _ => {}
        }
    }

    components.join("/")
}
