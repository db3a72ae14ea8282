//! Breadcast admin tool
//!
//! **Usage:**
//! ```bash
//! breadcast-admin add-recipe <name> <json-cid> <image-cid>
//! breadcast-admin pin-file <path>
//! breadcast-admin prerender [<name>...]
//! breadcast-admin working-set [--unpin --yes]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use breadcast_common::cid::is_valid_cid;
use breadcast_common::config::{Settings, SettingsOverrides};
use breadcast_common::recipe_files::{
    load_json_or_default, load_recipe_set, load_rendered_recipe_set, save_json_pretty, ReloadingFile,
};
use breadcast_common::working_set::{active_content_ids, compare, PINNED_FILES_LIMIT};
use breadcast_common::RecipeSetEntry;
use breadcast_frames::prerender::prerender_recipe;
use breadcast_frames::render::{Renderer, SvgRenderer};
use breadcast_frames::source::{LiveSource, RecipeSource};
use breadcast_frames::startup::open_pinning_store;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Delay between unpin calls, keeps bulk unpinning under the API rate limit
const UNPIN_DELAY: Duration = Duration::from_millis(333);

#[derive(Parser, Debug)]
#[command(name = "breadcast-admin")]
#[command(about = "Manage Breadcast recipe sets and pinned content")]
#[command(version)]
struct Cli {
    /// Base folder holding breadcast.toml and the environment folders
    #[arg(short, long, env = "BREADCAST_BASE_DIR", global = true)]
    base_dir: Option<PathBuf>,

    /// Environment folder under the base folder
    #[arg(short, long, env = "BREADCAST_ENV", global = true)]
    env: Option<String>,

    /// Pinata API token
    #[arg(long, env = "PINATA_JWT", hide_env_values = true, global = true)]
    pinata_jwt: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a recipe to recipes.json
    AddRecipe {
        /// Name to file the recipe under
        name: String,
        /// Content identifier of the recipe JSON document
        json_cid: String,
        /// Content identifier of the background image
        image_cid: String,
    },
    /// Upload and pin a local file
    PinFile {
        path: PathBuf,
    },
    /// Render and pin every frame of the named recipes (all when none given)
    Prerender {
        names: Vec<String>,
    },
    /// Compare pinned content with what the recipe sets reference
    WorkingSet {
        /// Unpin everything the recipe sets no longer reference
        #[arg(long)]
        unpin: bool,

        /// Confirm unpinning
        #[arg(long, requires = "unpin")]
        yes: bool,

        /// Pinned file allowance of the pinning plan
        #[arg(long, default_value_t = PINNED_FILES_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "breadcast_admin=info,breadcast_frames=info,breadcast_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(SettingsOverrides {
        base_dir: cli.base_dir,
        env_name: cli.env,
        pinata_jwt: cli.pinata_jwt,
        ..Default::default()
    })
    .context("Failed to resolve configuration")?;

    match cli.cmd {
        Command::AddRecipe {
            name,
            json_cid,
            image_cid,
        } => add_recipe(&settings, name, json_cid, image_cid).await,
        Command::PinFile { path } => pin_file(&settings, &path).await,
        Command::Prerender { names } => prerender(&settings, names).await,
        Command::WorkingSet { unpin, yes, limit } => working_set(&settings, unpin, yes, limit).await,
    }
}

async fn add_recipe(settings: &Settings, name: String, json_cid: String, image_cid: String) -> Result<()> {
    for cid in [&json_cid, &image_cid] {
        if !is_valid_cid(cid) {
            bail!("'{}' is not a valid CID", cid);
        }
    }

    let path = settings.recipe_set_path();
    let mut recipe_set = load_recipe_set(&path).await?;
    if recipe_set.contains_key(&name) {
        bail!("'{}' already exists in the recipe set", name);
    }

    recipe_set.insert(name.clone(), RecipeSetEntry { json_cid, image_cid });
    save_json_pretty(&path, &recipe_set).await?;
    info!("Added {} to {}", name, path.display());
    Ok(())
}

async fn pin_file(settings: &Settings, path: &Path) -> Result<()> {
    let store = open_pinning_store(settings)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("'{}' could not be read", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let cid = store.put(&name, bytes).await?;
    println!("File pinned successfully. CID: {}", cid);
    Ok(())
}

async fn prerender(settings: &Settings, names: Vec<String>) -> Result<()> {
    let store = open_pinning_store(settings)?;
    let recipe_set = load_recipe_set(&settings.recipe_set_path()).await?;
    let rendered_path = settings.rendered_recipes_path();
    let mut rendered = load_rendered_recipe_set(&rendered_path).await?;

    let selected: Vec<(String, RecipeSetEntry)> = if names.is_empty() {
        recipe_set.iter().map(|(n, e)| (n.clone(), e.clone())).collect()
    } else {
        names
            .iter()
            .map(|name| {
                recipe_set
                    .get(name)
                    .map(|entry| (name.clone(), entry.clone()))
                    .with_context(|| format!("'{}' is not in the recipe set", name))
            })
            .collect::<Result<_>>()?
    };
    if selected.is_empty() {
        println!("No recipe to render");
        return Ok(());
    }

    let source = LiveSource::new(
        ReloadingFile::from_value(settings.recipe_set_path(), recipe_set),
        Arc::clone(&store),
    );
    let renderer: Arc<dyn Renderer> = Arc::new(SvgRenderer::new(Arc::clone(&store), settings.fonts_dir.as_deref()));

    for (name, entry) in selected {
        let recipe = source
            .recipe(&entry.json_cid)
            .await?
            .with_context(|| format!("'{}' could not be loaded", name))?;

        let result = prerender_recipe(
            &entry.json_cid,
            &recipe,
            Arc::clone(&renderer),
            Arc::clone(&store),
            rendered.get(&entry.json_cid),
        )
        .await
        .with_context(|| format!("Prerendering '{}' failed", name))?;

        println!("{}: {} frames pinned", name, result.asset_cids.len());
        rendered.insert(entry.json_cid.clone(), result);
        // Saved per recipe so an interrupted run keeps finished work
        save_json_pretty(&rendered_path, &rendered).await?;
    }
    Ok(())
}

async fn working_set(settings: &Settings, unpin: bool, yes: bool, limit: usize) -> Result<()> {
    let store = open_pinning_store(settings)?;
    let recipe_set = load_recipe_set(&settings.recipe_set_path()).await?;
    let rendered = load_rendered_recipe_set(&settings.rendered_recipes_path()).await?;
    let pinned_assets_path = settings.pinned_assets_path();
    let mut pinned_assets: BTreeMap<String, String> = load_json_or_default(&pinned_assets_path).await?;

    let active = active_content_ids(&recipe_set, &rendered, &pinned_assets);
    let pinned = store.list().await?;
    let report = compare(&active, &pinned, limit);

    println!("You currently have {} total pinned files", report.pinned_total);
    if report.over_limit() > 0 {
        println!(
            "Which is {} too many files pinned compared to the limit {}",
            report.over_limit(),
            report.limit
        );
    }
    if !report.pinned_active.is_empty() {
        println!(
            "{} / {} ({:.2}%) are referenced in your recipe sets.",
            report.pinned_active.len(),
            report.pinned_total,
            report.active_percentage()
        );
    }
    if !report.pinned_inactive.is_empty() {
        println!(
            "You currently have {} pinned files which are not in your working set.",
            report.pinned_inactive.len()
        );
    }
    if !report.unpinned_active.is_empty() {
        println!(
            "You also currently have {} unpinned files in your working set:",
            report.unpinned_active.len()
        );
        for cid in &report.unpinned_active {
            println!("{}", cid);
        }
    }

    if !unpin || report.pinned_inactive.is_empty() {
        return Ok(());
    }
    if !yes {
        bail!(
            "Refusing to unpin {} files without --yes; this cannot be undone",
            report.pinned_inactive.len()
        );
    }

    let mut unpinned = BTreeSet::new();
    for cid in &report.pinned_inactive {
        tokio::time::sleep(UNPIN_DELAY).await;
        match store.delete(cid).await {
            Ok(()) => {
                unpinned.insert(cid.clone());
            }
            Err(e) => warn!("Failed to unpin {}: {}", cid, e),
        }
    }
    println!("{} files have been unpinned.", unpinned.len());

    // Unpinned images leave the serve-time ledger too
    let before = pinned_assets.len();
    pinned_assets.retain(|_, cid| !unpinned.contains(cid));
    if pinned_assets.len() != before {
        save_json_pretty(&pinned_assets_path, &pinned_assets).await?;
        info!(
            "Dropped {} entries from {}",
            before - pinned_assets.len(),
            pinned_assets_path.display()
        );
    }
    Ok(())
}
