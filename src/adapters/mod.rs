//! Schema Adapters
//!
//! Each adapter binds the [`Model`]/[`Field`](crate::erd::Field) contract to
//! one schema framework. Callers pick the framework explicitly with a
//! [`SchemaFormat`] tag; the tag maps to the pipeline that loads the input,
//! runs discovery and renders the result.

pub mod catalog;
pub mod json_schema;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::erd::{discover, Diagram, Model};
use crate::error::{ErdError, Result};
use crate::render::{render, OutputFormat, RenderOptions};

pub use catalog::Catalog;
pub use json_schema::SchemaSet;

/// Maximum number of "did you mean" suggestions for an unknown root
const MAX_SUGGESTIONS: usize = 3;

/// Framework tag used to select an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaFormat {
    /// JSON Schema documents (files, directories, `$defs` bundles)
    JsonSchema,
    /// Declarative TOML model catalog
    Catalog,
}

impl SchemaFormat {
    /// Guess the framework from an input path
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(SchemaFormat::JsonSchema);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(SchemaFormat::JsonSchema),
            Some("toml") => Some(SchemaFormat::Catalog),
            _ => None,
        }
    }

    /// The load → discover → render function for this framework
    pub fn pipeline(self) -> DiagramPipeline {
        match self {
            SchemaFormat::JsonSchema => run_pipeline::<SchemaSet> as DiagramPipeline,
            SchemaFormat::Catalog => run_pipeline::<Catalog> as DiagramPipeline,
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaFormat::JsonSchema => write!(f, "json-schema"),
            SchemaFormat::Catalog => write!(f, "catalog"),
        }
    }
}

/// Configuration for schema loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// Skip files matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Only load files matching these path prefixes
    pub include_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                "target/".to_string(),
                ".git/".to_string(),
                "node_modules/".to_string(),
            ],
            include_prefixes: Vec::new(),
        }
    }
}

impl LoadConfig {
    /// Whether a relative path passes the include/skip filters
    pub fn accepts(&self, relative: &str) -> bool {
        if !self.include_prefixes.is_empty()
            && !self.include_prefixes.iter().any(|p| relative.starts_with(p))
        {
            return false;
        }
        !self.skip_prefixes.iter().any(|p| relative.starts_with(p))
    }
}

/// A schema framework that can wrap its definitions as [`Model`]s
pub trait SchemaAdapter: Sized {
    type Model<'a>: Model
    where
        Self: 'a;

    const FORMAT: SchemaFormat;

    fn load(path: &Path, config: &LoadConfig) -> Result<Self>;

    /// Wrap the definition named by `handle` as a model
    fn model(&self, handle: &str) -> Result<Self::Model<'_>>;

    /// Wrap every root, then run one discovery pass across all of them
    fn create_diagram<S: AsRef<str>>(&self, roots: &[S]) -> Result<Diagram<Self::Model<'_>>> {
        if roots.is_empty() {
            return Err(ErdError::NoRoots);
        }
        let models = roots
            .iter()
            .map(|root| self.model(root.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        discover(models)
    }
}

/// Output of a [`DiagramPipeline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub text: String,
    pub model_count: usize,
    pub edge_count: usize,
    pub fingerprint: String,
}

/// Load `input`, discover from `roots`, render in `format`
pub type DiagramPipeline =
    fn(&Path, &[String], &LoadConfig, OutputFormat, &RenderOptions) -> Result<RenderedDiagram>;

fn run_pipeline<A: SchemaAdapter>(
    input: &Path,
    roots: &[String],
    load: &LoadConfig,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<RenderedDiagram> {
    let adapter = A::load(input, load)?;
    let diagram = adapter.create_diagram(roots)?;
    let text = render(&diagram, format, options)?;

    Ok(RenderedDiagram {
        text,
        model_count: diagram.model_count(),
        edge_count: diagram.edge_count(),
        fingerprint: diagram.fingerprint(),
    })
}

/// Build an [`ErdError::UnknownModel`] with fuzzy suggestions
pub(crate) fn unknown_model<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> ErdError {
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, &str)> = candidates
        .into_iter()
        .filter_map(|c| matcher.fuzzy_match(c, query).map(|score| (score, c)))
        .collect();

    // Score descending, then name for ties
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);

    ErdError::UnknownModel {
        query: query.to_string(),
        suggestions: scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, c)| c.to_string())
            .collect(),
    }
}
