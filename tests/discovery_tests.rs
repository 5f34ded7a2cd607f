//! Discovery Tests
//!
//! Runs discovery through both adapters over the fixtures in
//! `tests/fixtures/` and checks the resulting diagrams.

use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use schema_erd::adapters::catalog::{Catalog, ModelDef};
use schema_erd::adapters::json_schema::SchemaSet;
use schema_erd::{
    discover, Cardinality, Diagram, Discovery, ErdError, Field, LoadConfig, Model, SchemaAdapter,
};

static EMBEDDED_BLOG: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/tests/fixtures/json_schema/blog");

fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn model_names<M: Model>(diagram: &Diagram<M>) -> Vec<String> {
    diagram
        .sorted_models()
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

fn edge_labels<M: Model>(diagram: &Diagram<M>) -> Vec<String> {
    diagram.sorted_edges().iter().map(|e| e.to_string()).collect()
}

const BLOG_EDGES: [&str; 6] = [
    "Post.author -> User",
    "Post.related -> Post",
    "Post.tags -> Tag",
    "Profile.user -> User",
    "User.posts -> Post",
    "User.profile -> Profile",
];

// =============================================================================
// JSON Schema
// =============================================================================

#[test]
fn test_json_schema_blog_from_user() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
    let diagram = set.create_diagram(&["User"]).unwrap();

    assert_eq!(model_names(&diagram), vec!["Post", "Profile", "Tag", "User"]);
    assert_eq!(edge_labels(&diagram), BLOG_EDGES);
}

#[test]
fn test_json_schema_edge_metadata() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
    let diagram = set.create_diagram(&["User"]).unwrap();
    let user = diagram.find("User").unwrap();

    let edges = diagram.edges_from(user);
    let posts = edges.iter().find(|e| e.source_field.name() == "posts").unwrap();
    assert_eq!(posts.source_field.cardinality(), Cardinality::Sequence);
    assert_eq!(posts.source_field.type_display(), "list[post]");
    assert!(!posts.source_field.is_nullable());

    let profile = edges.iter().find(|e| e.source_field.name() == "profile").unwrap();
    assert!(profile.source_field.is_nullable());
    assert!(!profile.source_field.is_many());
    assert!(!profile.source_field.is_required());

    let post = diagram.find("Post").unwrap();
    let tags = diagram
        .edges_from(post)
        .into_iter()
        .find(|e| e.source_field.name() == "tags")
        .unwrap();
    assert_eq!(tags.source_field.cardinality(), Cardinality::Set);
    assert_eq!(tags.target.key(), "entities/post.schema.json#/$defs/Tag");
}

#[test]
fn test_json_schema_enum_reference_is_not_an_edge() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
    let diagram = set.create_diagram(&["Post"]).unwrap();

    assert!(diagram.find("Status").is_none());
    assert!(!edge_labels(&diagram).iter().any(|e| e.starts_with("Post.status")));

    // Still visible to renderers as a plain field
    let post = diagram.find("Post").unwrap();
    let status = post.fields().unwrap().into_iter().find(|f| f.name() == "status").unwrap();
    assert_eq!(status.type_display(), "status");
}

#[test]
fn test_json_schema_unreachable_models_excluded() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
    let diagram = set.create_diagram(&["User"]).unwrap();
    assert!(diagram.find("Comment").is_none());

    let with_comment = set.create_diagram(&["Comment"]).unwrap();
    assert_eq!(with_comment.model_count(), 5);
    assert!(edge_labels(&with_comment).contains(&"Comment.post -> Post".to_string()));
}

#[test]
fn test_json_schema_bundle_diamond() {
    let set = SchemaSet::from_file(&fixture("json_schema/order_bundle.json")).unwrap();
    let diagram = set.create_diagram(&["Order"]).unwrap();

    assert_eq!(
        model_names(&diagram),
        vec!["Address", "Customer", "Money", "Order", "OrderLine"]
    );
    assert_eq!(
        edge_labels(&diagram),
        vec![
            "Customer.home -> Address",
            "Order.billing -> Address",
            "Order.customer -> Customer",
            "Order.lines -> OrderLine",
            "Order.prices -> Money",
            "Order.shipping -> Address",
            "OrderLine.order -> Order",
        ]
    );

    let address = diagram.find("Address").unwrap();
    assert_eq!(diagram.edges_to(address).len(), 3);
    assert_eq!(address.key(), "urn:shop:order#/$defs/Address");
}

#[test]
fn test_json_schema_bundle_field_shapes() {
    let set = SchemaSet::from_file(&fixture("json_schema/order_bundle.json")).unwrap();
    let order = set.model("Order").unwrap();
    let fields = order.fields().unwrap();

    let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "customer", "billing", "shipping", "lines", "prices"]);

    let shipping = &fields[3];
    assert!(shipping.is_nullable());
    assert_eq!(shipping.type_display(), "Address | null");

    let prices = &fields[5];
    assert_eq!(prices.cardinality(), Cardinality::Mapping);
    assert_eq!(prices.type_display(), "map[string, Money]");
}

#[test]
fn test_json_schema_roots_merge_into_one_diagram() {
    let set = SchemaSet::from_file(&fixture("json_schema/order_bundle.json")).unwrap();
    let from_order = set.create_diagram(&["Order"]).unwrap();
    let from_parts = set.create_diagram(&["Customer", "OrderLine"]).unwrap();

    assert_eq!(from_order, from_parts);
    assert_eq!(from_order.fingerprint(), from_parts.fingerprint());
}

#[test]
fn test_json_schema_embedded_matches_directory() {
    let embedded = SchemaSet::from_embedded(&EMBEDDED_BLOG).unwrap();
    let on_disk = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();

    assert_eq!(embedded.len(), on_disk.len());
    assert_eq!(embedded.bundle_hash(), on_disk.bundle_hash());

    let a = embedded.create_diagram(&["User"]).unwrap();
    let b = on_disk.create_diagram(&["User"]).unwrap();
    assert_eq!(edge_labels(&a), edge_labels(&b));
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn test_json_schema_include_prefixes() {
    let config = LoadConfig {
        include_prefixes: vec!["enums/".to_string()],
        ..LoadConfig::default()
    };
    let set = SchemaSet::load(&fixture("json_schema/blog"), &config).unwrap();
    assert_eq!(set.len(), 1);

    match set.create_diagram(&["User"]) {
        Err(ErdError::UnknownModel { query, .. }) => assert_eq!(query, "User"),
        other => panic!("Expected UnknownModel, got {:?}", other.map(|d| d.model_count())),
    }
}

#[test]
fn test_json_schema_unresolved_ref_propagates() {
    let set = SchemaSet::from_directory(&fixture("json_schema/broken")).unwrap();

    match set.create_diagram(&["Invoice"]) {
        Err(ErdError::UnresolvedRef { from, reference }) => {
            assert_eq!(from, "dangling.schema.json.payer");
            assert_eq!(reference, "party.schema.json");
        }
        other => panic!("Expected UnresolvedRef, got {:?}", other.map(|d| d.model_count())),
    }
}

#[test]
fn test_json_schema_rejects_non_model_root() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
    assert!(matches!(set.model("Status"), Err(ErdError::InvalidInput { .. })));
    assert!(matches!(
        set.create_diagram(&["User", "Status"]),
        Err(ErdError::InvalidInput { .. })
    ));
}

#[test]
fn test_json_schema_unknown_root_suggests() {
    let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();

    match set.model("Usr") {
        Err(ErdError::UnknownModel { suggestions, .. }) => {
            assert!(suggestions.contains(&"User".to_string()));
            assert!(suggestions.len() <= 3);
        }
        other => panic!("Expected UnknownModel, got {:?}", other.map(|m| m.key().to_string())),
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[test]
fn test_catalog_blog_matches_json_schema_shape() {
    let catalog = Catalog::from_file(&fixture("catalog/blog.toml")).unwrap();
    let diagram = catalog.create_diagram(&["User"]).unwrap();

    assert_eq!(model_names(&diagram), vec!["Post", "Profile", "Tag", "User"]);
    assert_eq!(edge_labels(&diagram), BLOG_EDGES);

    let post = diagram.find("Post").unwrap();
    let kinds: Vec<(String, Cardinality)> = diagram
        .edges_from(post)
        .iter()
        .map(|e| (e.source_field.name().to_string(), e.source_field.cardinality()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("author".to_string(), Cardinality::One),
            ("related".to_string(), Cardinality::Sequence),
            ("tags".to_string(), Cardinality::Set),
        ]
    );
}

#[test]
fn test_catalog_malformed_type_propagates() {
    let catalog = Catalog::from_defs(vec![
        ModelDef::new("User").field("profile", "Profile"),
        ModelDef::new("Profile").field("tags", "list[Tag"),
    ])
    .unwrap();

    // User itself is fine; the failure surfaces while walking into Profile
    assert!(catalog.model("User").unwrap().fields().is_ok());
    assert!(matches!(
        catalog.create_diagram(&["User"]),
        Err(ErdError::InvalidInput { .. })
    ));
}

// =============================================================================
// Core properties
// =============================================================================

#[test]
fn test_mutual_reference_scenario() {
    let catalog = Catalog::from_defs(vec![
        ModelDef::new("User").field("id", "int").field("profile", "Profile"),
        ModelDef::new("Profile").field("bio", "str").field("owner", "User"),
    ])
    .unwrap();
    let diagram = discover([catalog.model("User").unwrap()]).unwrap();

    assert_eq!(model_names(&diagram), vec!["Profile", "User"]);
    assert_eq!(
        edge_labels(&diagram),
        vec!["Profile.owner -> User", "User.profile -> Profile"]
    );
}

#[test]
fn test_repeated_discovery_is_value_equal() {
    let first = {
        let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
        let diagram = set.create_diagram(&["User"]).unwrap();
        (edge_labels(&diagram), diagram.fingerprint())
    };
    let second = {
        let set = SchemaSet::from_directory(&fixture("json_schema/blog")).unwrap();
        let diagram = set.create_diagram(&["User"]).unwrap();
        (edge_labels(&diagram), diagram.fingerprint())
    };

    assert_eq!(first, second);
}

#[test]
fn test_shared_discovery_across_roots() {
    let catalog = Catalog::from_file(&fixture("catalog/blog.toml")).unwrap();
    let mut discovery = Discovery::new();

    discovery.visit(catalog.model("Tag").unwrap()).unwrap();
    assert_eq!(discovery.model_count(), 1);

    discovery.visit(catalog.model("Comment").unwrap()).unwrap();
    let diagram = discovery.finish();

    assert_eq!(diagram.model_count(), 5);
    assert_eq!(
        diagram.edges().iter().filter(|e| e.target.name() == "Tag").count(),
        1
    );
}

#[test]
fn test_no_roots() {
    let catalog = Catalog::from_file(&fixture("catalog/blog.toml")).unwrap();
    let roots: [&str; 0] = [];
    assert!(matches!(catalog.create_diagram(&roots), Err(ErdError::NoRoots)));
}
