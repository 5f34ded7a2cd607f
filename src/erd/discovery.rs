//! Model Discovery
//!
//! Depth-first, memoized walk from one or more root models. Every reachable
//! model is visited exactly once; every field that references a model becomes
//! one [`Edge`]. Both accumulators are sets, so cycles terminate and diamonds
//! collapse.

use std::collections::HashSet;
use tracing::{debug, info};

use super::{Diagram, Edge, Field, Model};
use crate::error::{ErdError, Result};

/// Accumulators for a single discovery pass
///
/// Share one `Discovery` across several roots to merge them into a single
/// diagram; separate passes never interfere with each other.
#[derive(Debug)]
pub struct Discovery<M: Model> {
    seen_models: HashSet<M>,
    seen_edges: HashSet<Edge<M>>,
}

impl<M: Model> Default for Discovery<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Discovery<M> {
    pub fn new() -> Self {
        Self {
            seen_models: HashSet::new(),
            seen_edges: HashSet::new(),
        }
    }

    /// Visit a model and everything reachable from it
    ///
    /// Returns the model so callers can use it as an edge target. Errors from
    /// the adapter propagate unchanged; the accumulators are then unusable
    /// and should be dropped with the pass.
    pub fn visit(&mut self, model: M) -> Result<M> {
        // Must come before field recursion, or self-referential schemas never return.
        if self.seen_models.contains(&model) {
            return Ok(model);
        }

        debug!(model = model.name(), key = model.key(), "discovered model");
        self.seen_models.insert(model.clone());

        for field in model.fields()? {
            let Some(referenced) = field.referenced_model()? else {
                continue;
            };

            let target = self.visit(referenced)?;
            debug!(
                source = model.name(),
                field = field.name(),
                target = target.name(),
                "recorded edge"
            );
            self.seen_edges.insert(Edge::new(model.clone(), field, target));
        }

        Ok(model)
    }

    pub fn is_seen(&self, model: &M) -> bool {
        self.seen_models.contains(model)
    }

    pub fn model_count(&self) -> usize {
        self.seen_models.len()
    }

    pub fn edge_count(&self) -> usize {
        self.seen_edges.len()
    }

    /// Freeze the accumulators into a diagram
    pub fn finish(self) -> Diagram<M> {
        Diagram::new(self.seen_models, self.seen_edges)
    }
}

/// Discover the diagram reachable from `roots`
///
/// All roots share one pair of accumulators, so models referenced from
/// several roots appear once. Fails with [`ErdError::NoRoots`] when `roots`
/// is empty.
pub fn discover<M, I>(roots: I) -> Result<Diagram<M>>
where
    M: Model,
    I: IntoIterator<Item = M>,
{
    let mut discovery = Discovery::new();
    let mut root_count = 0usize;

    for root in roots {
        root_count += 1;
        discovery.visit(root)?;
    }

    if root_count == 0 {
        return Err(ErdError::NoRoots);
    }

    let diagram = discovery.finish();
    info!(
        roots = root_count,
        models = diagram.model_count(),
        edges = diagram.edge_count(),
        "discovery complete"
    );
    Ok(diagram)
}
