use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use wardrobe::config::{Overrides, WardrobeConfig};
use wardrobe::{images, logging, score_looks, Library, NewWardrobeItem, ScoreOutcome};

#[derive(Parser, Debug)]
#[command(name = "wardrobe", about = "Manage the local wardrobe and score looks against it")]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides WARDROBE_DB and config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Photo directory (overrides WARDROBE_IMAGES and config)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a photographed garment
    Add {
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        color: String,
        /// Photo path relative to the image directory
        #[arg(long)]
        image: String,
    },
    /// List wardrobe items
    List {
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Remove an item and its photo
    Remove {
        id: i64,
        /// Leave the photo file in place
        #[arg(long)]
        keep_image: bool,
    },
    /// Ownership ratio of one look
    Score { look_id: i64 },
    /// Ownership ratio of every look in the catalog
    ScoreAll,
    /// Products making up a look
    Look { look_id: i64 },
    /// Report photos without items and items without photos
    Prune {
        /// Delete orphaned photo files
        #[arg(long)]
        delete: bool,
    },
    /// List database tables
    Tables,
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    look_id: i64,
    ratio: f64,
    tier: wardrobe::OwnershipTier,
    #[serde(flatten)]
    outcome: &'a ScoreOutcome,
}

impl<'a> ScoreReport<'a> {
    fn new(look_id: i64, outcome: &'a ScoreOutcome) -> Self {
        Self {
            look_id,
            ratio: outcome.ratio(),
            tier: outcome.tier(),
            outcome,
        }
    }

    fn line(&self) -> String {
        match self.outcome {
            ScoreOutcome::Scored { matched, total } => format!(
                "look {}: {}/{} owned ({:.3}, tier {:?})",
                self.look_id, matched, total, self.ratio, self.tier
            ),
            ScoreOutcome::Degraded { reason } => {
                format!("look {}: unavailable ({})", self.look_id, reason)
            }
        }
    }
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = WardrobeConfig::load(&Overrides {
        config_file: cli.config.clone(),
        database_path: cli.db.clone(),
        image_dir: cli.images.clone(),
    })?;
    logging::init(&config.log_filter);

    // The app cannot function without its database
    let library = Library::open_with_seed(
        &config.database_path,
        config.catalog_bundle.as_deref(),
        config.busy_timeout,
    )
    .context("Failed to initialize database. Check permissions and disk space.")?;

    match cli.command {
        Command::Add { kind, color, image } => {
            let item = library.wardrobe().insert(&NewWardrobeItem::new(&kind, &color, image))?;
            print(cli.json, &item, || format!("added item {}", item.id))?;
        }
        Command::List { kind, color } => {
            let items = library
                .wardrobe()
                .fetch_filtered(kind.as_deref(), color.as_deref())?;
            print(cli.json, &items, || {
                items
                    .iter()
                    .map(|item| {
                        format!(
                            "{:>5}  {:<12} {:<10} {}  {}",
                            item.id,
                            item.kind,
                            item.color,
                            item.created_at.format("%Y-%m-%d %H:%M"),
                            item.image_path
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::Remove { id, keep_image } => {
            let item = library.wardrobe().get(id)?;
            let removed = library.wardrobe().delete(id)?;
            if let (Some(item), false) = (&item, keep_image) {
                images::remove_image(&config.image_dir, &item.image_path)?;
            }
            print(cli.json, &removed, || {
                if removed {
                    format!("removed item {}", id)
                } else {
                    format!("item {} was not in the wardrobe", id)
                }
            })?;
        }
        Command::Score { look_id } => {
            let outcome = library.scorer().score_ownership(look_id);
            let report = ScoreReport::new(look_id, &outcome);
            print(cli.json, &report, || report.line())?;
        }
        Command::ScoreAll => {
            let look_ids = library.catalog().look_ids();
            let results = score_looks(
                library.path().to_path_buf(),
                look_ids,
                config.busy_timeout,
            )
            .await;
            let reports: Vec<ScoreReport<'_>> = results
                .iter()
                .map(|(look_id, outcome)| ScoreReport::new(*look_id, outcome))
                .collect();
            print(cli.json, &reports, || {
                reports
                    .iter()
                    .map(ScoreReport::line)
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::Look { look_id } => {
            let products = library.catalog().products_for_look(look_id);
            print(cli.json, &products, || {
                products
                    .iter()
                    .map(|p| {
                        format!(
                            "{:>5}  {:<24} {:<12} {:<10} {}",
                            p.id,
                            p.name.as_deref().unwrap_or("-"),
                            p.kind.as_deref().unwrap_or("-"),
                            p.color.as_deref().unwrap_or("-"),
                            p.price.map(|price| format!("{price:.2}")).unwrap_or_default()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::Prune { delete } => {
            let items = library.wardrobe().fetch_all()?;
            let missing = images::missing(&config.image_dir, &items);
            let orphans = images::orphans(&config.image_dir, &items);

            if delete {
                for path in &orphans {
                    std::fs::remove_file(path)
                        .with_context(|| format!("Failed to delete {}", path.display()))?;
                }
                tracing::info!("Deleted {} orphaned photos", orphans.len());
            }

            let report = serde_json::json!({ "missing_images": &missing, "orphaned_files": &orphans });
            print(cli.json, &report, || {
                format!(
                    "{} items without photo, {} orphaned photos{}",
                    missing.len(),
                    orphans.len(),
                    if delete { " (deleted)" } else { "" }
                )
            })?;
        }
        Command::Tables => {
            let tables = library.table_names()?;
            print(cli.json, &tables, || tables.join("\n"))?;
        }
    }

    Ok(())
}
