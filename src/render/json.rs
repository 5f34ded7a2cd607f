//! JSON format output for ERD data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::erd::{Cardinality, Diagram, Field, Model};
use crate::error::Result;

/// JSON representation of a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErdJson {
    pub fingerprint: String,
    pub models: Vec<ModelJson>,
    pub edges: Vec<EdgeJson>,
    pub stats: ErdStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelJson {
    pub key: String,
    pub name: String,
    pub fields: Vec<FieldJson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldJson {
    pub name: String,
    #[serde(rename = "type")]
    pub type_display: String,
    pub cardinality: Cardinality,
    pub nullable: bool,
    /// Key of the referenced model, when the field produced an edge
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub references: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeJson {
    pub source: String,
    pub source_key: String,
    pub field: String,
    pub target: String,
    pub target_key: String,
    pub cardinality: Cardinality,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErdStats {
    pub model_count: usize,
    pub field_count: usize,
    pub edge_count: usize,
    pub self_references: usize,
}

/// Generate pretty-printed JSON
pub fn to_json<M: Model>(diagram: &Diagram<M>) -> Result<String> {
    let erd = build_erd_json(diagram)?;
    Ok(serde_json::to_string_pretty(&erd)?)
}

/// Build the JSON structure
pub fn build_erd_json<M: Model>(diagram: &Diagram<M>) -> Result<ErdJson> {
    let targets: HashMap<(&str, &str), &str> = diagram
        .edges()
        .iter()
        .map(|e| ((e.source.key(), e.source_field.name()), e.target.key()))
        .collect();

    let mut field_count = 0;
    let mut models = Vec::with_capacity(diagram.model_count());

    for model in diagram.sorted_models() {
        let fields: Vec<FieldJson> = model
            .fields()?
            .iter()
            .map(|field| FieldJson {
                name: field.name().to_string(),
                type_display: field.type_display(),
                cardinality: field.cardinality(),
                nullable: field.is_nullable(),
                references: targets
                    .get(&(model.key(), field.name()))
                    .map(|key| key.to_string()),
            })
            .collect();

        field_count += fields.len();
        models.push(ModelJson {
            key: model.key().to_string(),
            name: model.name().to_string(),
            fields,
        });
    }

    let edges: Vec<EdgeJson> = diagram
        .sorted_edges()
        .into_iter()
        .map(|e| EdgeJson {
            source: e.source.name().to_string(),
            source_key: e.source.key().to_string(),
            field: e.source_field.name().to_string(),
            target: e.target.name().to_string(),
            target_key: e.target.key().to_string(),
            cardinality: e.source_field.cardinality(),
            nullable: e.source_field.is_nullable(),
        })
        .collect();

    let self_references = diagram
        .edges()
        .iter()
        .filter(|e| e.is_self_reference())
        .count();

    Ok(ErdJson {
        fingerprint: diagram.fingerprint(),
        stats: ErdStats {
            model_count: models.len(),
            field_count,
            edge_count: edges.len(),
            self_references,
        },
        models,
        edges,
    })
}
