use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use erdview::svg::SvgRenderer;
use erdview::viewport::Size;
use erdview::{Diagram, EngineConfig, Schema};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "erdview",
    about = "Render and explore ER diagrams of database schemas",
    version
)]
struct Cli {
    /// Engine configuration (JSON); defaults apply for missing keys
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the diagram to SVG
    Render {
        schema: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Layout file previously written by `erdview layout`
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
        /// Zoom so every table is on screen
        #[arg(long)]
        fit: bool,
        /// Only lay out tables matching this search term
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Print the shortest relationship path between two tables
    Path {
        schema: PathBuf,
        from: String,
        to: String,
    },
    /// Print CREATE TABLE for one table
    Ddl { schema: PathBuf, table: String },
    /// Write a fresh layout snapshot
    Layout {
        schema: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erdview=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Render {
            schema,
            output,
            layout,
            width,
            height,
            fit,
            search,
        } => {
            let mut diagram = Diagram::new(load_schema(&schema)?, config);
            diagram.resize(Size::new(width, height));
            if let Some(term) = search {
                diagram.search_input(&term, 0);
                diagram.flush_filter();
            }
            if let Some(path) = layout {
                let input = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let applied = diagram
                    .import_layout(&input)
                    .with_context(|| format!("Failed to import {}", path.display()))?;
                info!(applied, "applied layout file");
            }
            if fit {
                diagram.fit_view();
            }
            let svg = SvgRenderer::from_config(diagram.config()).render(&diagram.frame(0));
            write_output(output.as_deref(), &svg)
        }
        Command::Path { schema, from, to } => {
            let diagram = Diagram::new(load_schema(&schema)?, config);
            for id in [&from, &to] {
                if !diagram.schema().contains(id) {
                    bail!("Unknown table: {}", id);
                }
            }
            let path = diagram.shortest_path(&from, &to);
            if path.is_empty() {
                println!("No connection between {} and {}", from, to);
            } else {
                let hops: Vec<&str> = path.iter().map(|t| t.as_str()).collect();
                println!("{}", hops.join(" -> "));
            }
            Ok(())
        }
        Command::Ddl { schema, table } => {
            let diagram = Diagram::new(load_schema(&schema)?, config);
            let ddl = diagram
                .ddl(&table)
                .with_context(|| format!("Unknown table: {}", table))?;
            print!("{}", ddl);
            Ok(())
        }
        Command::Layout { schema, output } => {
            let diagram = Diagram::new(load_schema(&schema)?, config);
            let json = diagram.export_layout(Utc::now())?;
            write_output(output.as_deref(), &json)
        }
    }
}

fn load_schema(path: &Path) -> Result<Schema> {
    let input =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Schema::from_json(&input).with_context(|| format!("Failed to load {}", path.display()))
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => print!("{}", content),
    }
    Ok(())
}
