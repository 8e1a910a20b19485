use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ifc_takeoff::aggregate::{aggregate, SortColumn, SortState};
use ifc_takeoff::classification::file::{read_store, write_store};
use ifc_takeoff::classification::{ClassificationAdapter, OverrideDraft, Scope};
use ifc_takeoff::config::TakeoffConfig;
use ifc_takeoff::export::{export_csv, export_json};
use ifc_takeoff::highlight::{
    scene_elements, HighlightInput, HighlightMode, HighlightSnapshot, HighlightSynchronizer,
};
use ifc_takeoff::model::{ClassificationKey, MetadataGraph, TakeoffReport, UnitKind};
use ifc_takeoff::scene::{InMemoryScene, SceneLookup};

#[derive(Parser, Debug)]
#[command(name = "ifc-takeoff")]
#[command(about = "IFC Takeoff - classify elements and measure quantities from IFC metadata")]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate the model into category / type / tag groups
    Report {
        /// Path to the metadata JSON file
        file: PathBuf,

        /// Scene snapshot with bounding boxes, for geometric fallback
        #[arg(long, value_name = "FILE")]
        scene: Option<PathBuf>,

        /// Export to CSV (optional output path)
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Export to JSON (optional output path)
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Sort element groups by tag, count, length, area, volume or mass
        #[arg(long)]
        sort: Option<SortColumn>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Create or update the classification of one type
    Classify {
        /// Path to the metadata JSON file
        file: PathBuf,

        /// JSON file holding override rows
        #[arg(long, value_name = "FILE")]
        store: PathBuf,

        #[arg(long)]
        scene: Option<PathBuf>,

        /// IFC category, e.g. IfcWall
        #[arg(long)]
        category: String,

        /// Resolved type name
        #[arg(long = "type")]
        type_name: String,

        /// Preferred unit: UT, ML, M2, M3 or KG
        #[arg(long, default_value = "UT")]
        unit: UnitKind,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        chapter: Option<String>,

        #[arg(long)]
        subchapter: Option<String>,

        #[arg(long)]
        subsubchapter: Option<String>,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Apply a highlight mode to a scene snapshot
    Highlight {
        /// Path to the metadata JSON file
        file: PathBuf,

        #[arg(long, value_name = "FILE")]
        scene: PathBuf,

        #[arg(long, value_name = "FILE")]
        store: PathBuf,

        #[arg(long, value_enum)]
        mode: ModeArg,

        /// Where to write the updated scene snapshot and highlight state
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Args, Debug)]
struct ScopeArgs {
    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    center: Option<String>,

    #[arg(long)]
    version: Option<String>,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        Scope {
            project_id: self.project.clone(),
            center_id: self.center.clone(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Normal,
    Highlight,
    OnlyEdited,
    HideEdited,
    AcceptedBudget,
}

impl From<ModeArg> for HighlightMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Normal => HighlightMode::Normal,
            ModeArg::Highlight => HighlightMode::Highlight,
            ModeArg::OnlyEdited => HighlightMode::OnlyEdited,
            ModeArg::HideEdited => HighlightMode::HideEdited,
            ModeArg::AcceptedBudget => HighlightMode::AcceptedBudget,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => TakeoffConfig::load(path)?,
        None => TakeoffConfig::default(),
    };

    match cli.command {
        Command::Report {
            file,
            scene,
            csv,
            json,
            sort,
            desc,
        } => {
            let graph = MetadataGraph::load(&file)?;
            let scene = scene.map(InMemoryScene::load).transpose()?;
            let report = match &scene {
                Some(s) => aggregate(&graph, Some(&lookup(s, &config))),
                None => aggregate::<InMemoryScene>(&graph, None),
            };

            if let Some(csv_path) = &csv {
                export_csv(&report, csv_path)?;
                println!("Exported to CSV: {}", csv_path.display());
            }

            if let Some(json_path) = &json {
                export_json(&report, json_path)?;
                println!("Exported to JSON: {}", json_path.display());
            }

            if csv.is_some() || json.is_some() {
                return Ok(());
            }

            let mut state = SortState::new();
            if let Some(column) = sort {
                state.click(column);
                if desc {
                    state.click(column);
                }
            }
            print_report(&report, &state);
        }

        Command::Classify {
            file,
            store,
            scene,
            category,
            type_name,
            unit,
            name,
            description,
            chapter,
            subchapter,
            subsubchapter,
            scope,
        } => {
            let graph = MetadataGraph::load(&file)?;
            let scene = scene.map(InMemoryScene::load).transpose()?;
            let adapter = ClassificationAdapter::new(read_store(&store)?);

            let draft = OverrideDraft {
                key: ClassificationKey::new(category, type_name),
                custom_name: name,
                description,
                preferred_unit: unit,
                chapter_id: chapter,
                subchapter_id: subchapter,
                subsubchapter_id: subsubchapter,
            };
            let version = scope.version.as_deref();
            let row = match &scene {
                Some(s) => {
                    adapter
                        .save(draft, &scope.scope(), version, &graph, Some(&lookup(s, &config)))
                        .await?
                }
                None => {
                    adapter
                        .save::<InMemoryScene>(draft, &scope.scope(), version, &graph, None)
                        .await?
                }
            };

            write_store(&store, adapter.store())?;
            println!(
                "{} / {} -> {} [{}] {:.3} {} over {} elements",
                row.category,
                row.type_name,
                row.code.as_deref().unwrap_or("-"),
                row.display_order,
                row.measured_value,
                row.preferred_unit.symbol(),
                row.element_count
            );
        }

        Command::Highlight {
            file,
            scene,
            store,
            mode,
            output,
            scope,
        } => {
            let graph = MetadataGraph::load(&file)?;
            let mut snapshot = HighlightSnapshot::load(&scene)?;
            let adapter = ClassificationAdapter::new(read_store(&store)?);
            let edited = adapter
                .edited_keys(&scope.scope(), scope.version.as_deref())
                .await?;

            let elements = scene_elements(&graph, &lookup(&snapshot.scene, &config));
            let acceptance = |chapter: &str| config.is_chapter_accepted(chapter);
            let input = HighlightInput {
                elements: &elements,
                edited: &edited,
                acceptance: &acceptance,
            };

            // Originals saved by the previous run are restored first.
            let mut sync = HighlightSynchronizer::resume(
                config.palette(),
                std::mem::take(&mut snapshot.highlight_state),
            );
            sync.set_mode(mode.into(), &input, &mut snapshot.scene);
            println!(
                "{:?}: {} of {} elements affected",
                sync.mode(),
                sync.state().affected().len(),
                elements.len()
            );

            snapshot.highlight_state = sync.into_state();
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&output, json)?;
        }
    }

    Ok(())
}

fn lookup<'a>(scene: &'a InMemoryScene, config: &'a TakeoffConfig) -> SceneLookup<'a, InMemoryScene> {
    let model_id = config.model_id.as_deref().or(scene.model_id.as_deref());
    SceneLookup::new(scene, model_id).with_separator(&config.id_separator)
}

fn print_report(report: &TakeoffReport, sort: &SortState) {
    println!(
        "IFC Takeoff | {} categories | {} types | {} elements",
        report.categories.len(),
        report.total_types(),
        report.total_elements()
    );

    for category in &report.categories {
        println!("\n{} ({})", category.category, category.totals.count);
        for element_type in &category.types {
            let t = &element_type.totals;
            println!(
                "  {}  {} u | {:.2} m | {:.2} m² | {:.3} m³ | {:.1} kg",
                element_type.type_name, t.count, t.length, t.area, t.volume, t.mass
            );
            for group in sort.apply(&element_type.groups) {
                let q = &group.quantities;
                println!(
                    "    {:<16} {:>5} {:>10.2} {:>10.2} {:>10.3} {:>10.1}",
                    group.tag, q.count, q.length, q.area, q.volume, q.mass
                );
            }
        }
    }
}
