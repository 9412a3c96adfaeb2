//! Command-line inspector for BoardWire document snapshots.
//!
//! Loads a Loro snapshot from disk and prints query results as JSON.

use anyhow::{Context, Result};
use boardwire_core::query::{
    objects_at_point, objects_contained_in_rect, objects_in_rect, objects_in_view_in_z_order, objects_in_z_order,
    ordered_views, z_order,
};
use boardwire_core::{BoardDocument, DocumentConfig, Object, SceneSource, ViewId, absolute_bounds};
use clap::{Parser, Subcommand};
use kurbo::{Point, Rect};
use serde_json::{Value, json};
use std::path::PathBuf;

/// Inspect a BoardWire snapshot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot file exported with `BoardDocument::export_snapshot`
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Document configuration (JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record counts and presentation order
    Summary,
    /// Visible nodes in paint order
    Zorder,
    /// Objects under a canvas point, topmost first
    At { x: f64, y: f64 },
    /// Objects touching (or with --contained, inside) a rectangle
    Rect {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        #[arg(long)]
        contained: bool,
    },
    /// Objects inside a view, in paint order
    View { id: String },
    /// Every stored object record as compact JSON
    Dump,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DocumentConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DocumentConfig::default(),
    };

    let bytes = std::fs::read(&cli.snapshot)
        .with_context(|| format!("Failed to read snapshot {}", cli.snapshot.display()))?;
    let doc = BoardDocument::from_snapshot(&bytes, &config).context("Failed to import snapshot")?;
    log::info!(
        "Loaded {} ({} objects, {} containers, {} views)",
        cli.snapshot.display(),
        doc.object_count(),
        doc.container_count(),
        doc.view_count()
    );

    let output = run(&doc, &cli.command)?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

fn run(doc: &BoardDocument, command: &Command) -> Result<Value> {
    Ok(match command {
        Command::Summary => {
            let views: Vec<Value> = ordered_views(doc)?
                .iter()
                .map(|view| json!({ "id": view.id, "name": view.name }))
                .collect();
            json!({
                "peer": doc.peer_id(),
                "objects": doc.object_count(),
                "containers": doc.container_count(),
                "views": views,
                "root_children": doc.root_children().len(),
            })
        }
        Command::Zorder => {
            let nodes: Vec<Value> = z_order(doc)?
                .iter()
                .map(|node| json!({ "tag": node.tag(), "id": node.id_str() }))
                .collect();
            json!({ "nodes": nodes, "objects": describe_all(doc, &objects_in_z_order(doc)?)? })
        }
        Command::At { x, y } => {
            let hits = objects_at_point(doc, Point::new(*x, *y))?;
            json!({ "hits": describe_all(doc, &hits)? })
        }
        Command::Rect { x0, y0, x1, y1, contained } => {
            let rect = Rect::new(*x0, *y0, *x1, *y1);
            let found = if *contained {
                objects_contained_in_rect(doc, rect)?
            } else {
                objects_in_rect(doc, rect)?
            };
            json!({ "objects": describe_all(doc, &found)? })
        }
        Command::View { id } => {
            let id = ViewId::new(id.as_str());
            if doc.view(&id)?.is_none() {
                anyhow::bail!("No view with id {}", id);
            }
            json!({ "view": id, "objects": describe_all(doc, &objects_in_view_in_z_order(doc, &id)?)? })
        }
        Command::Dump => {
            let mut records = serde_json::Map::new();
            for id in doc.object_ids() {
                if let Some(record) = doc.stored_object(&id) {
                    records.insert(id.to_string(), record.to_json());
                }
            }
            json!({ "objects": records })
        }
    })
}

fn describe_all(doc: &BoardDocument, objects: &[Object]) -> Result<Vec<Value>> {
    objects.iter().map(|object| describe(doc, object)).collect()
}

fn describe(doc: &BoardDocument, object: &Object) -> Result<Value> {
    let bounds = absolute_bounds(doc, &object.id)?.map(|b| [b.x0, b.y0, b.x1, b.y1]);
    Ok(json!({
        "id": object.id,
        "kind": object.geometry.kind_name(),
        "parent": object.parent,
        "bounds": bounds,
    }))
}
