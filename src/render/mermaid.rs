//! Mermaid erDiagram format output.

use super::{reference_fields, NodeIds, RenderOptions};
use crate::erd::{Diagram, Field, Model};
use crate::error::Result;

/// Generate a Mermaid erDiagram
pub fn to_mermaid<M: Model>(diagram: &Diagram<M>, options: &RenderOptions) -> Result<String> {
    let ids = NodeIds::new(diagram);
    let references = reference_fields(diagram);
    let mut output = String::from("erDiagram\n");

    for model in diagram.sorted_models() {
        let id = ids.get(model);
        let fields = if options.show_fields {
            model.fields()?
        } else {
            Vec::new()
        };

        if fields.is_empty() {
            output.push_str(&format!("    {}\n", id));
            continue;
        }

        output.push_str(&format!("    {} {{\n", id));
        for field in &fields {
            let ty = escape_mermaid_type(&field.type_display());
            let name = super::sanitize_id(field.name());
            if references.contains(&(model.key(), field.name())) {
                output.push_str(&format!("        {} {} FK\n", ty, name));
            } else {
                output.push_str(&format!("        {} {}\n", ty, name));
            }
        }
        output.push_str("    }\n");
    }

    let edges = diagram.sorted_edges();
    if !edges.is_empty() {
        output.push('\n');
    }

    for edge in edges {
        output.push_str(&format!(
            "    {} }}o--{} {} : \"{}\"\n",
            ids.get(&edge.source),
            target_marker(&edge.source_field),
            ids.get(&edge.target),
            edge.source_field.name().replace('"', "'")
        ));
    }

    Ok(output)
}

/// Right-hand crow's-foot marker for the target side
fn target_marker<F: Field>(field: &F) -> &'static str {
    if field.is_many() {
        "o{"
    } else if field.is_nullable() {
        "o|"
    } else {
        "||"
    }
}

/// Mermaid attribute types are single words; brackets are allowed
fn escape_mermaid_type(s: &str) -> String {
    let ty: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '[' | ']' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if ty.is_empty() {
        "any".to_string()
    } else {
        ty
    }
}
