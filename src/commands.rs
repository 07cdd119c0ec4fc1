//! Command handlers for the filegate CLI.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use filegate_core::records::{split_url_key, validate_category_name, validate_filename};
use filegate_core::{
    AccessController, AccessOptions, CategoryRecord, Decision, FileRecord, Quota, RecordStore,
    SqliteStore, SystemClock, UrlRecord, url_key,
};
use tracing::{info, warn};

use crate::cli::{
    CategoryAction, Command, ConfigAction, FileAction, TargetArgs, UrlAction, UrlSetArgs,
};
use crate::config::{EffectiveConfig, LoadedConfig};

/// Runs every command that needs the record store.
pub async fn run(command: Command, store: Arc<SqliteStore>, options: AccessOptions) -> Result<()> {
    match command {
        Command::Check(target) => run_check(store, options, &target).await,
        Command::RecordDownload(target) => run_record_download(store, options, &target).await,
        Command::Category { action } => run_category(store.as_ref(), action).await,
        Command::File { action } => run_file(store.as_ref(), action).await,
        Command::Url { action } => run_url(store.as_ref(), action).await,
        Command::Config {
            action: ConfigAction::Show,
        } => bail!("`config show` does not use the record store"),
    }
}

async fn run_check(
    store: Arc<SqliteStore>,
    options: AccessOptions,
    target: &TargetArgs,
) -> Result<()> {
    let access = AccessController::with_clock(store, SystemClock, options);
    match access.decide(&target.category, &target.filename).await {
        Decision::Allow => println!("allowed"),
        Decision::Deny(reason) => println!("denied ({reason})"),
    }
    Ok(())
}

async fn run_record_download(
    store: Arc<SqliteStore>,
    options: AccessOptions,
    target: &TargetArgs,
) -> Result<()> {
    let access = AccessController::with_clock(store, SystemClock, options);
    let report = access.downloaded(&target.category, &target.filename).await;
    println!(
        "url={} category={} file={}",
        report.url, report.category, report.file
    );
    if report.url_disabled {
        println!(
            "quota used up: {} is now disabled",
            url_key(&target.category, &target.filename)
        );
    }
    Ok(())
}

async fn run_category(store: &SqliteStore, action: CategoryAction) -> Result<()> {
    match action {
        CategoryAction::Set {
            name,
            description,
            public,
        } => {
            validate_category_name(&name)?;
            let mut category = store
                .get_category(&name)
                .await?
                .unwrap_or_else(|| CategoryRecord::new(name.clone()));
            if let Some(description) = description {
                category.description = description;
            }
            if let Some(public) = public {
                category.public = public;
            }
            store.set_category(&name, &category).await?;
            info!(category = %name, "category saved");
            println!("category '{name}' saved");
        }
        CategoryAction::Show { name } => {
            let Some(category) = store.get_category(&name).await? else {
                bail!("category '{name}' not found");
            };
            println!("{}", serde_json::to_string_pretty(&category)?);
        }
        CategoryAction::List { public } => {
            let categories = if public {
                store.list_public_categories().await?
            } else {
                store.list_categories().await?
            };
            for category in categories {
                println!(
                    "{}\tpublic={}\tdownloads={}",
                    category.name, category.public, category.stats.num_downloads
                );
            }
        }
        CategoryAction::Delete { name } => {
            if !store.delete_category(&name).await? {
                bail!("category '{name}' not found");
            }
            println!("category '{name}' deleted");
        }
    }
    Ok(())
}

async fn run_file(store: &SqliteStore, action: FileAction) -> Result<()> {
    match action {
        FileAction::Set { name, size, md5 } => {
            validate_filename(&name)?;
            let mut file = store
                .get_file(&name)
                .await?
                .unwrap_or_else(|| FileRecord::new(name.clone()));
            if let Some(size) = size {
                file.size = size;
            }
            if let Some(md5) = md5 {
                file.md5 = md5;
            }
            store.set_file(&name, &file).await?;
            info!(file = %name, "file record saved");
            println!("file '{name}' saved");
        }
        FileAction::Show { name } => {
            let Some(file) = store.get_file(&name).await? else {
                bail!("file '{name}' not found");
            };
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
        FileAction::List => {
            for file in store.list_files().await? {
                println!(
                    "{}\tsize={}\tdownloads={}",
                    file.name, file.size, file.stats.num_downloads
                );
            }
        }
        FileAction::Delete { name } => {
            if !store.delete_file(&name).await? {
                bail!("file '{name}' not found");
            }
            println!("file '{name}' deleted");
        }
    }
    Ok(())
}

async fn run_url(store: &SqliteStore, action: UrlAction) -> Result<()> {
    match action {
        UrlAction::Set(args) => save_url(store, args).await?,
        UrlAction::Show(args) => {
            let key = parse_url_key(&args.key)?;
            let Some(url) = store.get_url(&key).await? else {
                bail!("url '{key}' not found");
            };
            println!("{}", serde_json::to_string_pretty(&url)?);
        }
        UrlAction::List => {
            for url in store.list_urls().await? {
                println!(
                    "{}\tenabled={}\tremaining={}\tdownloads={}",
                    url.name,
                    url.config.enabled,
                    url.config.count_remaining,
                    url.stats.num_downloads
                );
            }
        }
        UrlAction::Delete(args) => {
            let key = parse_url_key(&args.key)?;
            if !store.delete_url(&key).await? {
                bail!("url '{key}' not found");
            }
            println!("url '{key}' deleted");
        }
    }
    Ok(())
}

/// Checks a `category/filename` argument and returns it as a store key.
fn parse_url_key(key: &str) -> Result<String> {
    let (category, filename) = split_url_key(key).with_context(|| {
        format!("invalid url key '{key}'\n  Suggestion: Use the form category/filename")
    })?;
    validate_category_name(category)?;
    validate_filename(filename)?;
    Ok(url_key(category, filename))
}

/// Upserts a URL, keeping its stats and any policy field not given on the command line.
async fn save_url(store: &SqliteStore, args: UrlSetArgs) -> Result<()> {
    let TargetArgs { category, filename } = args.target;
    validate_category_name(&category)?;
    validate_filename(&filename)?;

    let key = url_key(&category, &filename);
    let mut url = store
        .get_url(&key)
        .await
        .with_context(|| format!("Failed to read url '{key}'"))?
        .unwrap_or_else(|| UrlRecord::new(category.clone(), filename.clone()));

    if let Some(description) = args.description {
        url.description = description;
    }
    if let Some(enabled) = args.enabled {
        url.config.enabled = enabled;
    }
    if let Some(count) = args.count {
        url.config.count_remaining = Quota::Remaining(count);
    } else if args.unlimited {
        url.config.count_remaining = Quota::Unlimited;
    }
    if args.start.is_some() {
        url.config.start_time = args.start;
    }
    if args.end.is_some() {
        url.config.end_time = args.end;
    }

    if store.get_category(&category).await?.is_none() {
        warn!(category = %category, "url refers to a category that does not exist");
    }
    if store.get_file(&filename).await?.is_none() {
        warn!(file = %filename, "url refers to a file that does not exist");
    }

    store.set_url(&key, &url).await?;
    info!(url_key = %key, "url saved");
    println!("url '{key}' saved");
    Ok(())
}

/// Prints the effective configuration and where it came from.
pub fn show_config(loaded: &LoadedConfig, effective: &EffectiveConfig) {
    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file() {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("db_path = {}", effective.db_path.display());
    println!("db_max_connections = {}", effective.database.max_connections);
    println!("db_busy_timeout_ms = {}", effective.database.busy_timeout_ms);
    println!("serialize_updates = {}", effective.access.serialize_updates);
    println!(
        "verbosity = {}",
        loaded
            .config
            .as_ref()
            .and_then(|c| c.verbosity)
            .map_or("default", |v| v.as_str())
    );
}
