//! One-shot maintenance commands

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use colored::Colorize;

use super::CliError;
use crate::analytics::{EventSink, EventTracker, RollupManager};
use crate::api::jwt::get_jwt_service;
use crate::config::{DEFAULT_CONFIG_PATH, StaticConfig};
use crate::services::UserService;
use crate::storage::{SeaOrmStorage, StorageFactory};

async fn open_storage() -> Result<Arc<SeaOrmStorage>, CliError> {
    StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))
}

/// 连接数据库；迁移在连接建立时执行
pub async fn migrate() -> Result<(), CliError> {
    let storage = open_storage().await?;
    println!(
        "{} Database migrations applied ({})",
        "✓".bold().green(),
        storage.backend_name()
    );
    Ok(())
}

pub async fn create_admin(username: &str, email: &str, password: &str) -> Result<(), CliError> {
    let storage = open_storage().await?;
    let sink: Arc<dyn EventSink> = storage.clone();
    let users = UserService::new(storage, EventTracker::disabled(sink), get_jwt_service());

    let profile = users.create_admin(username, email, password).await?;
    println!(
        "{} Staff user {} (id {})",
        "✓".bold().green(),
        profile.username.cyan(),
        profile.id
    );
    Ok(())
}

pub fn parse_rollup_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CliError::ParseError(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

pub async fn rollup(date: Option<&str>) -> Result<(), CliError> {
    let date = date.map(parse_rollup_date).transpose()?;
    let storage = open_storage().await?;
    let rollup = RollupManager::new(storage);

    match date {
        Some(date) => {
            let stats = rollup.update_daily_stats(date).await?;
            let popular = rollup.update_popular_content().await?;
            println!(
                "{} {}: {} comments, {} likes, {} uploads; {} popular entries",
                "✓".bold().green(),
                date,
                stats.comments_created,
                stats.comments_liked,
                stats.files_uploaded,
                popular
            );
        }
        None => {
            let report = rollup.run_periodic().await?;
            println!(
                "{} yesterday: {} comments, today: {} comments; {} popular entries, {} events processed",
                "✓".bold().green(),
                report.yesterday_comments,
                report.today_comments,
                report.popular_entries,
                report.events_marked_processed
            );
        }
    }
    Ok(())
}

pub fn generate_config(output_path: Option<&str>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or(DEFAULT_CONFIG_PATH);
    if Path::new(path).exists() && !force {
        return Err(CliError::CommandError(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| CliError::CommandError(format!("Failed to write {}: {}", path, e)))?;
    println!(
        "{} Sample configuration written to {}",
        "✓".bold().green(),
        path.cyan()
    );
    Ok(())
}
