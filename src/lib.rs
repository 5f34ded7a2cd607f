//! Schema ERD
//!
//! Builds entity-relationship diagrams from structured schema definitions.
//! Starting from one or more root models, discovery follows every field that
//! references another model and collects the reachable models and the
//! field-attributed edges between them.
//!
//! ## Features
//!
//! - **Framework-agnostic core**: discovery only sees the [`Model`]/[`Field`]
//!   contract, so any schema framework can plug in through an adapter
//! - **Cycle-safe**: self references and mutual references terminate
//! - **Explicit adapter selection**: a [`SchemaFormat`] tag maps to its
//!   pipeline, no global registration
//! - **Deterministic output**: Mermaid, Graphviz DOT, and JSON renderers
//!
//! ## Architecture
//!
//! ```text
//! input ──► adapter (json_schema | catalog) ──► root Models
//!                                                  │
//!                                                  ▼
//!                                   discovery (DFS, seen set)
//!                                                  │
//!                                                  ▼
//!                              Diagram { models, edges } ──► render
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_erd::adapters::catalog::{Catalog, ModelDef};
//! use schema_erd::{discover, render, OutputFormat, RenderOptions};
//!
//! let catalog = Catalog::from_defs(vec![
//!     ModelDef::new("User").field("profile", "Optional[Profile]"),
//!     ModelDef::new("Profile").field("user", "User"),
//! ])?;
//!
//! let diagram = discover([catalog.model("User")?])?;
//! assert_eq!(diagram.model_count(), 2);
//! assert_eq!(diagram.edge_count(), 2);
//!
//! let text = render(&diagram, OutputFormat::Mermaid, &RenderOptions::default())?;
//! assert!(text.contains("User }o--o| Profile"));
//! # Ok::<(), schema_erd::ErdError>(())
//! ```

pub mod adapters;
pub mod config;
pub mod erd;
pub mod error;
pub mod render;

pub use adapters::{DiagramPipeline, LoadConfig, RenderedDiagram, SchemaAdapter, SchemaFormat};
pub use config::ErdConfig;
pub use erd::{discover, Cardinality, Diagram, Discovery, Edge, Field, Model};
pub use error::{ErdError, Result};
pub use render::{render, Direction, OutputFormat, RenderOptions};
