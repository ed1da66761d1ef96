//! CLI front end: `train` builds templates and hash tables from a template
//! list; `detect` runs the cascade over one scene frame against trained data.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tless_detect::dataset::{load_and_train_templates, load_scene_frame};
use tless_detect::detect::{detect as run_detect, train_hash_tables, Criteria, HashTable, Template};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tless", about = "Textureless rigid object detection in RGB-D scenes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train templates and hash tables from a template list file.
    ///
    /// `indices`, if given, restricts training to those 0-based line
    /// indices in `templates_list` (matching `train <templatesList>
    /// <outDir> [indices...]`); omitted, every listed template is trained.
    Train {
        templates_list: PathBuf,
        out_dir: PathBuf,
        indices: Vec<usize>,
    },
    /// Detect objects in one scene frame against previously trained data.
    Detect {
        trained_dir: PathBuf,
        scene_dir: PathBuf,
        frame: String,
    },
}

fn train(templates_list: PathBuf, out_dir: PathBuf, indices: Vec<usize>) -> tless_detect::error::Result<()> {
    let mut criteria = Criteria::default();

    info!(path = %templates_list.display(), indices = ?indices, "loading and training templates");
    let templates = load_and_train_templates(&templates_list, &criteria, &indices)?;
    info!(count = templates.len(), "trained templates");

    let smallest = templates
        .iter()
        .map(|t| (t.object_bb.width, t.object_bb.height))
        .min_by_key(|&(w, h)| w * h)
        .unwrap_or((0, 0));
    criteria = criteria.with_smallest_template_size(smallest);

    let tables = train_hash_tables(&templates, &criteria);
    info!(count = tables.len(), "trained hash tables");

    std::fs::create_dir_all(&out_dir)
        .map_err(|e| tless_detect::error::Error::IoFailure(format!("creating {}: {e}", out_dir.display())))?;

    let templates_json = serde_json::to_string(&templates)?;
    std::fs::write(out_dir.join("templates.json"), templates_json)
        .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?;

    let tables_json = serde_json::to_string(&tables)?;
    std::fs::write(out_dir.join("hash_tables.json"), tables_json)
        .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?;

    let criteria_json = serde_json::to_string(&criteria)?;
    std::fs::write(out_dir.join("criteria.json"), criteria_json)
        .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?;

    Ok(())
}

fn detect_frame(
    trained_dir: PathBuf,
    scene_dir: PathBuf,
    frame: String,
) -> tless_detect::error::Result<()> {
    let criteria: Criteria = serde_json::from_str(
        &std::fs::read_to_string(trained_dir.join("criteria.json"))
            .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?,
    )?;
    let templates: Vec<Template> = serde_json::from_str(
        &std::fs::read_to_string(trained_dir.join("templates.json"))
            .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?,
    )?;
    let tables: Vec<HashTable> = serde_json::from_str(
        &std::fs::read_to_string(trained_dir.join("hash_tables.json"))
            .map_err(|e| tless_detect::error::Error::IoFailure(e.to_string()))?,
    )?;

    let (color, depth) = load_scene_frame(&scene_dir, &frame)?;
    let detections = run_detect(&color, &depth, &templates, &tables, &criteria)?;

    for d in &detections {
        println!(
            "{{\"template_id\":{},\"x\":{},\"y\":{},\"width\":{},\"height\":{},\"score\":{:.4}}}",
            d.template_id, d.bbox.x, d.bbox.y, d.bbox.width, d.bbox.height, d.score
        );
    }
    info!(count = detections.len(), "detections emitted");

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Train { templates_list, out_dir, indices } => train(templates_list, out_dir, indices),
        Command::Detect { trained_dir, scene_dir, frame } => detect_frame(trained_dir, scene_dir, frame),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
