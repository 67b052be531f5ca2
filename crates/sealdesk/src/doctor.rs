// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdesk doctor` command implementation.
//!
//! Runs diagnostic checks against the Sealdesk environment to identify
//! configuration issues, storage problems, and missing credentials.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colored::Colorize;
use sealdesk_config::SealdeskConfig;
use sealdesk_core::SealdeskError;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>, start: Instant) -> Self {
        Self::finish(name, CheckStatus::Pass, message, start)
    }

    fn warn(name: &str, message: impl Into<String>, start: Instant) -> Self {
        Self::finish(name, CheckStatus::Warn, message, start)
    }

    fn fail(name: &str, message: impl Into<String>, start: Instant) -> Self {
        Self::finish(name, CheckStatus::Fail, message, start)
    }

    fn finish(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }

    fn render(&self, use_color: bool) -> String {
        let ms = self.duration.as_millis();
        if use_color {
            let (symbol, message) = match self.status {
                CheckStatus::Pass => ("✓".green(), self.message.normal()),
                CheckStatus::Warn => ("!".yellow(), self.message.yellow()),
                CheckStatus::Fail => ("✗".red(), self.message.red()),
            };
            format!("    {symbol} {:<20} {message} ({ms}ms)", self.name)
        } else {
            let tag = match self.status {
                CheckStatus::Pass => "[OK]  ",
                CheckStatus::Warn => "[WARN]",
                CheckStatus::Fail => "[FAIL]",
            };
            format!("    {tag} {:<20} {} ({ms}ms)", self.name, self.message)
        }
    }
}

/// Run the `sealdesk doctor` command.
///
/// With `--plain`, disables colored output.
pub async fn run_doctor(config: &SealdeskConfig, plain: bool) -> Result<(), SealdeskError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_channels(config),
        check_topics(config),
        check_base_url(config),
        check_database(&config.storage.database_path).await,
        check_storage_root(&config.storage.storage_root),
        check_credentials(),
    ];

    println!();
    println!("  sealdesk doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", result.render(use_color));
    }

    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }

    println!();

    Ok(())
}

/// Check that the operating channels are configured.
fn check_channels(config: &SealdeskConfig) -> CheckResult {
    let start = Instant::now();
    let mut missing = Vec::new();
    if config.channels.log_channel.is_empty() {
        missing.push("channels.log_channel");
    }
    if config.channels.thread_channel.is_empty() {
        missing.push("channels.thread_channel");
    }

    if missing.is_empty() {
        CheckResult::pass("Channels", "configured", start)
    } else {
        CheckResult::fail("Channels", format!("not set: {}", missing.join(", ")), start)
    }
}

/// Check that at least one topic exists for the ticket menu.
fn check_topics(config: &SealdeskConfig) -> CheckResult {
    let start = Instant::now();
    if config.topics.is_empty() {
        CheckResult::warn(
            "Topics",
            "no topics configured; no tickets can be opened",
            start,
        )
    } else {
        CheckResult::pass("Topics", format!("{} configured", config.topics.len()), start)
    }
}

/// Check that ticket URLs can be built.
fn check_base_url(config: &SealdeskConfig) -> CheckResult {
    let start = Instant::now();
    if config.storage.exposed_base_url.is_empty() {
        CheckResult::warn(
            "Base URL",
            "storage.exposed_base_url not set; ticket URLs will be relative",
            start,
        )
    } else {
        CheckResult::pass("Base URL", config.storage.exposed_base_url.clone(), start)
    }
}

/// Check the ticket database file exists and answers queries.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return CheckResult::warn(
            "Database",
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => return CheckResult::fail("Database", format!("open failed: {e}"), start),
    };

    let query_result: Result<(), tokio_rusqlite::Error> = conn
        .call(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await;

    match query_result {
        Ok(()) => CheckResult::pass("Database", "connected", start),
        Err(e) => CheckResult::fail("Database", format!("query failed: {e}"), start),
    }
}

/// Check the archive directory exists and is writable.
fn check_storage_root(storage_root: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(storage_root);

    if !path.is_dir() {
        return CheckResult::warn(
            "Storage root",
            format!("not found: {storage_root} (will be created by serve)"),
            start,
        );
    }

    let probe = path.join(".sealdesk-doctor-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult::pass("Storage root", "writable", start)
        }
        Err(e) => CheckResult::fail("Storage root", format!("not writable: {e}"), start),
    }
}

/// Check the platform credentials are present in the environment.
fn check_credentials() -> CheckResult {
    let start = Instant::now();
    let missing: Vec<&str> = [
        "SEALDESK_BOT_TOKEN",
        "SEALDESK_APPLICATION_ID",
        "SEALDESK_PUBLIC_KEY",
    ]
    .into_iter()
    .filter(|name| std::env::var(name).is_err())
    .collect();

    if missing.is_empty() {
        CheckResult::pass("Credentials", "present", start)
    } else {
        CheckResult::warn(
            "Credentials",
            format!("not set: {}", missing.join(", ")),
            start,
        )
    }
}
