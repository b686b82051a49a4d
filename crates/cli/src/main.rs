mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardcat_core::{
    load_config, metrics, validate_config, Catalog, CatalogItem, Config, SearchFilters,
    SessionState,
};

use cli::{BrowseArgs, Cli, Command, SearchArgs};

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "shardcat.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(cli.config.as_deref(), cli.root.clone())?;
    info!(root = ?config.catalog.root, max_cached_shards = config.cache.max_cached_shards, "Configuration loaded");

    let catalog = Catalog::from_config(&config);
    catalog
        .initialize()
        .await
        .with_context(|| format!("Failed to open catalog at {:?}", config.catalog.root))?;

    match cli.command {
        Command::Categories { adult } => {
            let categories = catalog.categories(adult)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for c in &categories {
                    println!(
                        "{:<32} {:>7} items  {:>3} pages{}",
                        c.category_id,
                        c.total_count,
                        c.page_count,
                        if c.is_adult { "  [adult]" } else { "" }
                    );
                }
            }
        }
        Command::Browse(args) => browse(&catalog, &args, cli.json).await?,
        Command::Search(args) => search(&catalog, &args, cli.json).await?,
        Command::Adult { category } => {
            let page = catalog
                .load_adult(&category)
                .await
                .with_context(|| format!("Failed to load adult items of {}", category))?;
            print_items(page.items.iter(), page.len(), cli.json)?;
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>, root: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };
    if let Some(root) = root {
        config.catalog.root = root;
    }
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn browse(catalog: &Catalog, args: &BrowseArgs, json: bool) -> Result<()> {
    let mut view = catalog
        .select_category(&args.category)
        .await
        .with_context(|| format!("Failed to open category {}", args.category))?;
    for _ in 1..args.pages {
        view = catalog.load_more().await.context("Failed to load next page")?;
    }

    let session = catalog.session();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "session": session,
                "items": view.iter().take(args.limit).collect::<Vec<_>>(),
                "total": view.len(),
            })
        );
    } else {
        println!(
            "{}: {} items from {}/{} pages ({:?})",
            args.category,
            view.len(),
            session.pages_loaded,
            session.total_pages,
            session.state
        );
        print_items(view.iter().take(args.limit), view.len(), false)?;
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&catalog.cache_stats())?);
        print!("{}", metrics::gather_text());
    }
    Ok(())
}

async fn search(catalog: &Catalog, args: &SearchArgs, json: bool) -> Result<()> {
    for category in &args.warm {
        catalog
            .select_category(category)
            .await
            .with_context(|| format!("Failed to warm category {}", category))?;
        while catalog.session().state != SessionState::Exhausted {
            catalog.load_more().await?;
        }
    }

    let filters = SearchFilters {
        content_type: args.content_type,
        include_adult: Some(args.adult),
        genre: args.genre.clone(),
        min_rating: args.min_rating,
        category: None,
    };
    let results = catalog.search(&args.query, &filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for c in &results.categories {
        println!("category  {} ({})", c.display_name, c.category_id);
    }
    for hit in &results.items {
        println!("{:<24} {}", hit.category_id, describe(&hit.item));
    }
    println!(
        "{} items from {} resident pages{}",
        results.items.len(),
        results.scanned_shards,
        if results.truncated { " (truncated)" } else { "" }
    );
    Ok(())
}

fn print_items<'a>(
    items: impl Iterator<Item = &'a CatalogItem>,
    total: usize,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&items.collect::<Vec<_>>())?);
        return Ok(());
    }
    let mut shown = 0;
    for item in items {
        println!("  {}", describe(item));
        shown += 1;
    }
    if shown < total {
        println!("  ... {} more", total - shown);
    }
    Ok(())
}

fn describe(item: &CatalogItem) -> String {
    let mut line = format!("[{}] {}", item.content_type.as_str(), item.name);
    if let Some(rating) = item.rating() {
        line.push_str(&format!("  {:.1}", rating));
    }
    if !item.genres().is_empty() {
        line.push_str(&format!("  {}", item.genres().join(", ")));
    }
    line
}
