//! Diagram Rendering
//!
//! Turns a discovered [`Diagram`] into text. Every renderer walks
//! [`Diagram::sorted_models`] and [`Diagram::sorted_edges`], so the same
//! diagram always renders to the same bytes.

mod dot;
mod json;
mod mermaid;

pub use dot::to_dot;
pub use json::{build_erd_json, to_json, EdgeJson, ErdJson, ErdStats, FieldJson, ModelJson};
pub use mermaid::to_mermaid;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::erd::{Diagram, Field, Model};
use crate::error::{ErdError, Result};

/// Output format for a rendered diagram
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Mermaid erDiagram
    #[default]
    Mermaid,
    /// Graphviz DOT with one table per model
    Dot,
    /// JSON for programmatic use
    Json,
}

impl FromStr for OutputFormat {
    type Err = ErdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mermaid" | "mmd" => Ok(OutputFormat::Mermaid),
            "dot" | "graphviz" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ErdError::InvalidFormat(format!(
                "unknown output format `{}` (valid: mermaid, dot, json)",
                s
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Dot => write!(f, "dot"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mermaid => "mmd",
            OutputFormat::Dot => "dot",
            OutputFormat::Json => "json",
        }
    }

    /// Guess the format from an output file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mmd" | "mermaid" => Some(OutputFormat::Mermaid),
            "dot" | "gv" => Some(OutputFormat::Dot),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Layout direction (DOT `rankdir`, Mermaid ignores it)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Direction {
    /// Left to right
    #[default]
    #[value(name = "LR", alias = "lr")]
    LR,
    /// Top to bottom
    #[value(name = "TB", alias = "tb")]
    TB,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LR => write!(f, "LR"),
            Direction::TB => write!(f, "TB"),
        }
    }
}

/// Options shared by all renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit field rows inside each model
    pub show_fields: bool,
    pub direction: Direction,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_fields: true,
            direction: Direction::default(),
        }
    }
}

/// Render `diagram` in the requested format
pub fn render<M: Model>(
    diagram: &Diagram<M>,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<String> {
    match format {
        OutputFormat::Mermaid => to_mermaid(diagram, options),
        OutputFormat::Dot => to_dot(diagram, options),
        OutputFormat::Json => to_json(diagram),
    }
}

/// Identifier-safe node names, unique even when display names collide
pub(crate) struct NodeIds<'d, M: Model> {
    ids: HashMap<&'d M, String>,
}

impl<'d, M: Model> NodeIds<'d, M> {
    pub(crate) fn new(diagram: &'d Diagram<M>) -> Self {
        let mut ids = HashMap::with_capacity(diagram.model_count());
        let mut used: HashSet<String> = HashSet::new();

        for model in diagram.sorted_models() {
            let base = sanitize_id(model.name());
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            ids.insert(model, candidate);
        }

        Self { ids }
    }

    pub(crate) fn get(&self, model: &M) -> &str {
        self.ids.get(model).map(String::as_str).unwrap_or("_")
    }
}

/// `(model key, field name)` pairs that produced at least one edge
pub(crate) fn reference_fields<M: Model>(diagram: &Diagram<M>) -> HashSet<(&str, &str)> {
    diagram
        .edges()
        .iter()
        .map(|e| (e.source.key(), e.source_field.name()))
        .collect()
}

/// Alphanumerics and underscores only; never empty, never starts with a digit
pub(crate) fn sanitize_id(s: &str) -> String {
    let mut id: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if id.is_empty() || id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}
