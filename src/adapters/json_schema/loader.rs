//! Schema Loading
//!
//! Loads JSON Schema documents from the filesystem, an embedded directory,
//! or memory, and indexes every document root and `$defs`/`definitions`
//! entry as a definition.

use include_dir::Dir;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{SchemaDef, SchemaId, SchemaSet};
use crate::adapters::LoadConfig;
use crate::error::{ErdError, Result};

/// Keys under which nested definitions live
const DEFINITION_KEYS: [&str; 2] = ["$defs", "definitions"];

/// Accumulates documents, then freezes into a [`SchemaSet`]
#[derive(Default)]
struct SetBuilder {
    defs: HashMap<SchemaId, SchemaDef>,
    order: Vec<SchemaId>,
    by_path: HashMap<PathBuf, SchemaId>,
    by_name: HashMap<String, Vec<SchemaId>>,
    hasher: Sha256,
    documents: usize,
}

impl SetBuilder {
    fn add_document(&mut self, relative_path: PathBuf, content: &str, json: Value) -> Result<()> {
        self.hasher.update(content.as_bytes());
        self.documents += 1;

        let doc_id = json
            .get("$id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| path_key(&relative_path));

        for key in DEFINITION_KEYS {
            if let Some(nested) = json.get(key).and_then(|v| v.as_object()) {
                for (name, body) in nested {
                    let id = format!("{}#/{}/{}", doc_id, key, escape_pointer(name));
                    let display = body
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or(name.as_str())
                        .to_string();
                    self.insert(SchemaDef {
                        id,
                        name: display,
                        path: relative_path.clone(),
                        document: doc_id.clone(),
                        body: body.clone(),
                    })?;
                }
            }
        }

        let name = json
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| file_stem_name(&relative_path));

        self.by_path.insert(relative_path.clone(), doc_id.clone());
        self.insert(SchemaDef {
            id: doc_id.clone(),
            name,
            path: relative_path,
            document: doc_id,
            body: json,
        })
    }

    fn insert(&mut self, def: SchemaDef) -> Result<()> {
        if self.defs.contains_key(&def.id) {
            return Err(ErdError::InvalidFormat(format!(
                "duplicate schema id `{}` in {}",
                def.id,
                def.path.display()
            )));
        }
        debug!(id = %def.id, name = %def.name, "indexed definition");
        self.by_name.entry(def.name.clone()).or_default().push(def.id.clone());
        self.order.push(def.id.clone());
        self.defs.insert(def.id.clone(), def);
        Ok(())
    }

    fn finish(self) -> SchemaSet {
        let bundle_hash = format!("{:x}", self.hasher.finalize());
        info!(
            documents = self.documents,
            definitions = self.defs.len(),
            "loaded schema set"
        );
        SchemaSet {
            defs: self.defs,
            order: self.order,
            by_path: self.by_path,
            by_name: self.by_name,
            bundle_hash,
        }
    }
}

/// Load schemas from a filesystem directory
pub fn load_from_directory(schema_dir: &Path, config: &LoadConfig) -> Result<SchemaSet> {
    let mut builder = SetBuilder::default();

    for entry in WalkDir::new(schema_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative_path = path.strip_prefix(schema_dir)?.to_path_buf();
        if !config.accepts(&path_key(&relative_path)) {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let json: Value = serde_json::from_str(&content).map_err(|e| {
            ErdError::InvalidFormat(format!("failed to parse JSON in {}: {}", path.display(), e))
        })?;

        builder.add_document(relative_path, &content, json)?;
    }

    Ok(builder.finish())
}

/// Load a single schema document (typically a bundle with `$defs`)
pub fn load_from_file(path: &Path) -> Result<SchemaSet> {
    let content = fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&content).map_err(|e| {
        ErdError::InvalidFormat(format!("failed to parse JSON in {}: {}", path.display(), e))
    })?;
    let relative_path = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf());

    let mut builder = SetBuilder::default();
    builder.add_document(relative_path, &content, json)?;
    Ok(builder.finish())
}

/// Load schemas from an embedded directory (compiled via `include_dir!`)
///
/// Files that are not valid JSON are skipped with a warning.
pub fn load_from_embedded(embedded_dir: &Dir<'_>, config: &LoadConfig) -> Result<SchemaSet> {
    let mut files: Vec<(&Path, &str)> = Vec::new();
    collect_embedded_files(embedded_dir, &mut files);
    files.sort_by(|a, b| a.0.cmp(b.0));

    let mut builder = SetBuilder::default();
    for (path, content) in files {
        if !config.accepts(&path_key(path)) {
            continue;
        }
        let json: Value = match serde_json::from_str(content) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparseable schema");
                continue;
            }
        };
        builder.add_document(path.to_path_buf(), content, json)?;
    }

    Ok(builder.finish())
}

/// Load already-parsed documents, keyed by their relative path
pub fn load_from_documents<I, P>(documents: I) -> Result<SchemaSet>
where
    I: IntoIterator<Item = (P, Value)>,
    P: Into<PathBuf>,
{
    let mut builder = SetBuilder::default();
    for (path, json) in documents {
        let content = serde_json::to_string(&json)?;
        builder.add_document(path.into(), &content, json)?;
    }
    Ok(builder.finish())
}

/// Recursively collect JSON files from embedded directory
fn collect_embedded_files<'a>(dir: &'a Dir<'a>, files: &mut Vec<(&'a Path, &'a str)>) {
    for file in dir.files() {
        let path = file.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            if let Some(content) = file.contents_utf8() {
                files.push((path, content));
            }
        }
    }

    for subdir in dir.dirs() {
        collect_embedded_files(subdir, files);
    }
}

/// Forward-slash form of a relative path, used as default id and filter key
pub(crate) fn path_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `entities/user.schema.json` -> `user`
pub(crate) fn file_stem_name(path: &Path) -> String {
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    file_name
        .trim_end_matches(".json")
        .trim_end_matches(".schema")
        .to_string()
}

/// RFC 6901 escaping for a single pointer token
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
