//! Graphviz DOT format output for ERD diagrams.

use std::collections::HashMap;

use super::{reference_fields, Direction, NodeIds, RenderOptions};
use crate::erd::{Diagram, Field, Model};
use crate::error::Result;

/// Generate DOT output with one HTML-table node per model
pub fn to_dot<M: Model>(diagram: &Diagram<M>, options: &RenderOptions) -> Result<String> {
    let ids = NodeIds::new(diagram);
    let references = reference_fields(diagram);
    let mut output = String::new();

    output.push_str("digraph ERD {\n");
    output.push_str("  graph [pad=\"0.5\", nodesep=\"1\", ranksep=\"1.5\"];\n");

    let rankdir = match options.direction {
        Direction::LR => "LR",
        Direction::TB => "TB",
    };
    output.push_str(&format!("  rankdir={};\n", rankdir));

    if options.show_fields {
        output.push_str("  node [shape=none, margin=0];\n");
    } else {
        output.push_str("  node [shape=box, style=rounded];\n");
    }
    output.push_str("  edge [arrowtail=none];\n\n");

    // (model key, field name) -> port row
    let mut ports: HashMap<(String, String), usize> = HashMap::new();

    for model in diagram.sorted_models() {
        let id = quote_id(ids.get(model));
        if !options.show_fields {
            output.push_str(&format!("  {} [label=\"{}\"];\n", id, escape_dot_string(model.name())));
            continue;
        }

        let fields = model.fields()?;
        let mut rows = Vec::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            ports.insert((model.key().to_string(), field.name().to_string()), position);
            let is_reference = references.contains(&(model.key(), field.name()));
            rows.push(field_row(position, field, is_reference));
        }

        output.push_str(&format!(
            "  {} [label=<{}>];\n",
            id,
            table_label(model.name(), &rows)
        ));
    }

    let edges = diagram.sorted_edges();
    if !edges.is_empty() {
        output.push('\n');
    }

    for edge in edges {
        let mut attrs: Vec<String> = Vec::new();
        if edge.source_field.is_many() {
            attrs.push("arrowhead=crow".to_string());
        }
        if edge.source_field.is_nullable() {
            attrs.push("style=dashed".to_string());
        }

        let source = quote_id(ids.get(&edge.source));
        let target = quote_id(ids.get(&edge.target));
        let port = ports.get(&(
            edge.source.key().to_string(),
            edge.source_field.name().to_string(),
        ));
        let from = match port {
            Some(row) => format!("{}:f{}", source, row),
            None => {
                attrs.insert(
                    0,
                    format!("label=\"{}\"", escape_dot_string(edge.source_field.name())),
                );
                source
            }
        };

        if attrs.is_empty() {
            output.push_str(&format!("  {} -> {};\n", from, target));
        } else {
            output.push_str(&format!(
                "  {} -> {} [{}];\n",
                from,
                target,
                attrs.join(", ")
            ));
        }
    }

    output.push_str("}\n");
    Ok(output)
}

fn field_row<F: Field>(position: usize, field: &F, is_reference: bool) -> String {
    let name = if is_reference {
        format!("<I>{}</I>", escape_html(field.name()))
    } else {
        escape_html(field.name())
    };
    format!(
        "<TR><TD ALIGN=\"LEFT\" PORT=\"f{}\">{}</TD><TD ALIGN=\"LEFT\"><FONT COLOR=\"#4a5568\">{}</FONT></TD></TR>",
        position,
        name,
        escape_html(&field.type_display())
    )
}

fn table_label(name: &str, rows: &[String]) -> String {
    let mut html = String::new();
    html.push_str("<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"4\">");
    html.push_str(&format!(
        "<TR><TD BGCOLOR=\"#4a5568\" COLSPAN=\"2\"><FONT COLOR=\"white\"><B>{}</B></FONT></TD></TR>",
        escape_html(name)
    ));
    for row in rows {
        html.push_str(row);
    }
    html.push_str("</TABLE>");
    html
}

/// Node ids are always quoted; `node`, `edge` and `graph` are keywords in any case
fn quote_id(id: &str) -> String {
    format!("\"{}\"", escape_dot_string(id))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
