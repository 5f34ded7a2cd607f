//! Entity-Relationship Core
//!
//! The capability contract every schema adapter implements ([`Model`],
//! [`Field`]), the value types discovery produces ([`Edge`], [`Diagram`]),
//! and the discovery walk itself (see [`discovery`]).
//!
//! Adapters decide identity at their own boundary: a [`Model`] compares and
//! hashes by the definition it describes (its [`Model::key`]), never by the
//! wrapper instance. Two wrappers around the same definition are the same
//! node, which is what lets discovery terminate on recursive schemas.

pub mod discovery;

pub use discovery::{discover, Discovery};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::error::Result;

/// How many values of the target a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// A single value
    #[default]
    One,
    /// Ordered collection (list, array, tuple)
    Sequence,
    /// Unordered collection of unique values
    Set,
    /// String-keyed map; the value side is the referenced type
    Mapping,
}

impl Cardinality {
    pub fn is_many(self) -> bool {
        !matches!(self, Cardinality::One)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::Sequence => "sequence",
            Cardinality::Set => "set",
            Cardinality::Mapping => "mapping",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed member of a [`Model`]
///
/// Equality and hashing follow the underlying field descriptor (owning model
/// plus field name), so two enumerations of the same model yield equal fields.
pub trait Field: Clone + Eq + Hash + fmt::Debug {
    /// The model type this field may point to
    type Target: Model;

    fn name(&self) -> &str;

    /// Human-readable type label, e.g. `list[Profile]`. Rendering only.
    fn type_display(&self) -> String;

    /// The model this field references, if its declared type is a model of
    /// the same framework. `Ok(None)` means the field contributes no edge.
    fn referenced_model(&self) -> Result<Option<Self::Target>>;

    fn cardinality(&self) -> Cardinality;

    fn is_many(&self) -> bool {
        self.cardinality().is_many()
    }

    fn is_nullable(&self) -> bool;
}

/// A read-only view over one structured-data type definition
///
/// Implementations must keep `Eq`/`Hash` consistent with [`Model::key`].
pub trait Model: Clone + Eq + Hash + fmt::Debug {
    type Field: Field<Target = Self>;

    /// Stable identifier of the underlying definition, unique per adapter
    fn key(&self) -> &str;

    /// Display name used as the node label
    fn name(&self) -> &str;

    /// Declared fields, enumerated fresh on every call
    fn fields(&self) -> Result<Vec<Self::Field>>;
}

/// A directed, field-attributed reference from one model to another
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<M: Model> {
    pub source: M,
    pub source_field: M::Field,
    pub target: M,
}

impl<M: Model> Edge<M> {
    pub fn new(source: M, source_field: M::Field, target: M) -> Self {
        Self {
            source,
            source_field,
            target,
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.source == self.target
    }

    fn sort_key(&self) -> (&str, &str, &str, &str, &str) {
        (
            self.source.name(),
            self.source.key(),
            self.source_field.name(),
            self.target.name(),
            self.target.key(),
        )
    }
}

impl<M: Model> fmt::Display for Edge<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}",
            self.source.name(),
            self.source_field.name(),
            self.target.name()
        )
    }
}

/// The immutable result of discovery: a set of models and a set of edges
///
/// Only discovery builds a `Diagram`, so every edge endpoint is always a
/// member of `models`. Iteration order of the sets is unspecified; renderers
/// use [`Diagram::sorted_models`] and [`Diagram::sorted_edges`].
#[derive(Debug, Clone)]
pub struct Diagram<M: Model> {
    models: HashSet<M>,
    edges: HashSet<Edge<M>>,
}

impl<M: Model> PartialEq for Diagram<M> {
    fn eq(&self, other: &Self) -> bool {
        self.models == other.models && self.edges == other.edges
    }
}

impl<M: Model> Eq for Diagram<M> {}

impl<M: Model> Diagram<M> {
    pub(crate) fn new(models: HashSet<M>, edges: HashSet<Edge<M>>) -> Self {
        debug_assert!(edges
            .iter()
            .all(|e| models.contains(&e.source) && models.contains(&e.target)));
        Self { models, edges }
    }

    pub fn models(&self) -> &HashSet<M> {
        &self.models
    }

    pub fn edges(&self) -> &HashSet<Edge<M>> {
        &self.edges
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, model: &M) -> bool {
        self.models.contains(model)
    }

    /// Find a model by display name (first in sorted order if names collide)
    pub fn find(&self, name: &str) -> Option<&M> {
        self.sorted_models().into_iter().find(|m| m.name() == name)
    }

    /// Outgoing edges of a model, sorted
    pub fn edges_from(&self, model: &M) -> Vec<&Edge<M>> {
        self.sorted_edges()
            .into_iter()
            .filter(|e| &e.source == model)
            .collect()
    }

    /// Incoming edges of a model, sorted
    pub fn edges_to(&self, model: &M) -> Vec<&Edge<M>> {
        self.sorted_edges()
            .into_iter()
            .filter(|e| &e.target == model)
            .collect()
    }

    /// Models ordered by name, then key
    pub fn sorted_models(&self) -> Vec<&M> {
        let mut models: Vec<&M> = self.models.iter().collect();
        models.sort_by(|a, b| (a.name(), a.key()).cmp(&(b.name(), b.key())));
        models
    }

    /// Edges ordered by source, field name, then target
    pub fn sorted_edges(&self) -> Vec<&Edge<M>> {
        let mut edges: Vec<&Edge<M>> = self.edges.iter().collect();
        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        edges
    }

    /// Export as a petgraph graph (nodes are models, edge weights the source fields)
    pub fn to_graph(&self) -> DiGraph<M, M::Field> {
        let mut graph = DiGraph::with_capacity(self.models.len(), self.edges.len());
        let mut indices: HashMap<&M, NodeIndex> = HashMap::with_capacity(self.models.len());

        for model in self.sorted_models() {
            indices.insert(model, graph.add_node(model.clone()));
        }

        for edge in self.sorted_edges() {
            if let (Some(&from), Some(&to)) = (indices.get(&edge.source), indices.get(&edge.target)) {
                graph.add_edge(from, to, edge.source_field.clone());
            }
        }

        graph
    }

    /// SHA-256 over the sorted model keys and edge triples
    ///
    /// Value-equal diagrams always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for model in self.sorted_models() {
            hasher.update(b"model\t");
            hasher.update(model.key().as_bytes());
            hasher.update(b"\n");
        }
        for edge in self.sorted_edges() {
            hasher.update(b"edge\t");
            hasher.update(edge.source.key().as_bytes());
            hasher.update(b"\t");
            hasher.update(edge.source_field.name().as_bytes());
            hasher.update(b"\t");
            hasher.update(edge.target.key().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}
