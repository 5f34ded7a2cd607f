//! Schema ERD CLI
//!
//! Discovers the models reachable from one or more roots and prints the
//! diagram as Mermaid, Graphviz DOT, or JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use schema_erd::{Direction, ErdConfig, OutputFormat, SchemaFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-erd")]
#[command(version, about = "Generate entity-relationship diagrams from schema definitions")]
struct Cli {
    /// Schema directory, JSON Schema file, or TOML model catalog
    input: PathBuf,

    /// Root model (id, path, or name); repeat for several roots
    #[arg(short, long = "root", required = true)]
    roots: Vec<String>,

    /// Schema framework (detected from the input path by default)
    #[arg(long, value_enum)]
    schema_format: Option<SchemaFormat>,

    /// Output format (defaults to the output extension, then config)
    #[arg(short = 't', long = "to", value_enum)]
    to: Option<OutputFormat>,

    /// Write the diagram here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Omit field rows, draw models as plain boxes
    #[arg(long)]
    no_fields: bool,

    /// Layout direction for DOT output
    #[arg(long, value_enum)]
    direction: Option<Direction>,

    /// Extra config file, layered over erd.toml and the user config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ErdConfig::load_from(cli.config.as_deref()).context("failed to load config")?;

    // CLI flags win over config
    if let Some(format) = cli.schema_format {
        config.input.format = Some(format);
    }
    if cli.no_fields {
        config.render.show_fields = false;
    }
    if let Some(direction) = cli.direction {
        config.render.direction = direction;
    }

    let schema_format = match config.input.format.or_else(|| SchemaFormat::detect(&cli.input)) {
        Some(format) => format,
        None => bail!(
            "cannot tell the schema format of {}; pass --schema-format",
            cli.input.display()
        ),
    };

    let output_format = cli
        .to
        .or_else(|| {
            cli.output
                .as_ref()
                .and_then(|p| p.extension())
                .and_then(|e| e.to_str())
                .and_then(OutputFormat::from_extension)
        })
        .unwrap_or(config.render.format);

    let pipeline = schema_format.pipeline();
    let rendered = pipeline(
        &cli.input,
        &cli.roots,
        &config.load_config(),
        output_format,
        &config.render_options(),
    )
    .with_context(|| format!("failed to build diagram from {}", cli.input.display()))?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered.text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "✅ {} models, {} edges ({}) -> {}",
                rendered.model_count,
                rendered.edge_count,
                output_format,
                path.display()
            );
        }
        None => {
            print!("{}", rendered.text);
            eprintln!(
                "✅ {} models, {} edges ({})",
                rendered.model_count, rendered.edge_count, output_format
            );
        }
    }

    Ok(())
}
