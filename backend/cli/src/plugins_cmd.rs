//! Plugin subcommands
//!
//! Each command returns whether the operation succeeded; `main` turns that
//! into the exit code.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};

use plugsmith_core::ScaffoldResult;
use plugsmith_plugins::{PluginEntry, PluginOpResult, PluginService, ValidationError};

use crate::terminal_output::{note_error, note_info, note_success, note_warn, render_table, Column};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    Init,
    Content,
    Register,
    All,
}

#[derive(Subcommand)]
pub enum PluginCommands {
    /// Validate a plugin entry JSON file
    Validate { file: PathBuf },
    /// Validate a whole manifest JSON file
    ValidateManifest { file: PathBuf },
    /// Scaffold a plugin from an entry JSON file
    Scaffold {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "all")]
        phase: Phase,
    },
    /// Re-run registration after a suspected timeout
    Recover { file: PathBuf },
    /// List plugins in the workspace manifest
    List,
    /// Show one plugin
    Show { slug: String },
    /// Remove a plugin from the manifest
    Remove { slug: String },
    /// Enable a plugin
    Enable { slug: String },
    /// Disable a plugin
    Disable { slug: String },
}

pub async fn run(service: &PluginService, cmd: PluginCommands) -> Result<bool> {
    match cmd {
        PluginCommands::Validate { file } => {
            let candidate = read_json(&file).await?;
            Ok(report_validation(service.validate_entry(&candidate).map(|e| e.slug)))
        }
        PluginCommands::ValidateManifest { file } => {
            let candidate = read_json(&file).await?;
            let result = service
                .validate_manifest(&candidate)
                .map(|m| format!("{} plugin(s)", m.len()));
            Ok(report_validation(result))
        }
        PluginCommands::Scaffold { file, phase } => {
            let Some(entry) = read_entry(service, &file).await? else {
                return Ok(false);
            };
            scaffold(service, &entry, phase).await
        }
        PluginCommands::Recover { file } => {
            let Some(entry) = read_entry(service, &file).await? else {
                return Ok(false);
            };
            let outcome = service.recover_registration(&entry).await;
            print_progress(&outcome.progress);
            Ok(report_result(&entry.slug, "recovery", &outcome.result))
        }
        PluginCommands::List => {
            if !sync(service).await {
                return Ok(false);
            }
            list(&service.get_plugins().await);
            Ok(true)
        }
        PluginCommands::Show { slug } => {
            if !sync(service).await {
                return Ok(false);
            }
            match service.get_plugin(&slug).await {
                Some(entry) => {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                    Ok(true)
                }
                None => {
                    note_error(&format!("plugin '{slug}' not found"));
                    Ok(false)
                }
            }
        }
        PluginCommands::Remove { slug } => mutate(service, "Removed", service.remove_plugin(&slug)).await,
        PluginCommands::Enable { slug } => mutate(service, "Enabled", service.enable_plugin(&slug)).await,
        PluginCommands::Disable { slug } => mutate(service, "Disabled", service.disable_plugin(&slug)).await,
    }
}

async fn scaffold(service: &PluginService, entry: &PluginEntry, phase: Phase) -> Result<bool> {
    let result = match phase {
        Phase::Init => service.scaffold_init(entry).await,
        Phase::Content => service.scaffold_content(entry).await,
        Phase::Register => service.register_plugin(entry).await,
        Phase::All => {
            let outcome = service.scaffold(entry).await;
            print_progress(&outcome.progress);
            outcome.result
        }
    };
    let label = format!("{phase:?}").to_lowercase();
    Ok(report_result(&entry.slug, &label, &result))
}

async fn read_json(file: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", file.display()))
}

async fn read_entry(service: &PluginService, file: &Path) -> Result<Option<PluginEntry>> {
    let candidate = read_json(file).await?;
    match service.validate_entry(&candidate) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
            print_issues(&e);
            Ok(None)
        }
    }
}

async fn sync(service: &PluginService) -> bool {
    let loaded = service.sync_from_disk().await;
    if let Some(error) = &loaded.error {
        note_error(error);
    }
    loaded.success
}

/// Load the manifest, apply one registry mutation, write it back.
async fn mutate(
    service: &PluginService,
    verb: &str,
    op: impl std::future::Future<Output = PluginOpResult>,
) -> Result<bool> {
    if !sync(service).await {
        return Ok(false);
    }
    let result = op.await;
    let Some(plugin) = result.plugin.filter(|_| result.success) else {
        note_error(result.error.as_deref().unwrap_or("operation failed"));
        return Ok(false);
    };
    let saved = service.persist().await;
    if !saved.success {
        note_error(saved.error.as_deref().unwrap_or("could not write manifest"));
        return Ok(false);
    }
    note_success(&format!("{verb} {}", plugin.slug));
    Ok(true)
}

fn report_validation(result: Result<String, ValidationError>) -> bool {
    match result {
        Ok(summary) => {
            note_success(&format!("valid: {summary}"));
            true
        }
        Err(e) => {
            print_issues(&e);
            false
        }
    }
}

fn print_issues(err: &ValidationError) {
    for issue in &err.issues {
        note_error(&format!("{}: {}", issue.path, issue.message));
    }
}

fn print_progress(lines: &[String]) {
    for line in lines {
        note_info(line);
    }
}

fn report_result(slug: &str, phase: &str, result: &ScaffoldResult) -> bool {
    let detail = result.error.as_deref().unwrap_or("");
    match (result.success, result.is_partial()) {
        (true, false) => note_success(&format!("{slug}: {phase} ok")),
        (true, true) => note_warn(&format!("{slug}: {phase} partially succeeded: {detail}")),
        (false, _) => note_error(&format!("{slug}: {phase} failed: {detail}")),
    }
    result.success
}

fn list(plugins: &[PluginEntry]) {
    if plugins.is_empty() {
        note_info("No plugins registered.");
        return;
    }
    let columns = vec![
        Column::left("Slug"),
        Column::left("Name"),
        Column::left("Enabled"),
        Column::left("Location"),
        Column::left("Source"),
    ];
    let rows: Vec<Vec<String>> = plugins
        .iter()
        .map(|p| {
            vec![
                p.slug.clone(),
                p.name.clone(),
                if p.enabled { "yes" } else { "no" }.to_string(),
                p.location().to_string(),
                p.source.target().to_string(),
            ]
        })
        .collect();
    print!("{}", render_table(&columns, &rows));
}
