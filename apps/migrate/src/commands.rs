//! `migrate` and `status` command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docferry_auth::{OAuthConfig, OAuthTokenProvider, TokenProvider};
use docferry_checkpoint::{CaseStatus, CheckpointDocument, CheckpointStore};
use docferry_migration::{Migrator, RunSummary};
use docferry_model::load_mappings;
use docferry_schedule::SystemClock;
use tracing::info;

use crate::config::Config;
use crate::providers::{ClioDestination, DropboxSource};

/// Runs every mapping entry through the migrator.
pub async fn migrate(
    config: &Config,
    mapping: Option<PathBuf>,
    ignore_schedule: bool,
) -> anyhow::Result<RunSummary> {
    let mapping_path = mapping.unwrap_or_else(|| config.mapping_path.clone());
    let mappings = load_mappings(&mapping_path)
        .with_context(|| format!("loading mapping {}", mapping_path.display()))?;
    info!(path = %mapping_path.display(), cases = mappings.len(), "mapping loaded");

    let window = if ignore_schedule {
        info!("off-peak schedule ignored");
        None
    } else {
        config.window()?
    };

    let dropbox_tokens: Arc<dyn TokenProvider> = Arc::new(OAuthTokenProvider::new(OAuthConfig {
        token_url: format!("{}/oauth2/token", config.dropbox.api_url.trim_end_matches('/')),
        client_id: config.dropbox.client_id.clone(),
        client_secret: config.dropbox.client_secret.clone(),
        token_path: config.dropbox.token_path.clone(),
        retry: config.retry(),
    })?);
    let clio_tokens: Arc<dyn TokenProvider> = Arc::new(OAuthTokenProvider::new(OAuthConfig {
        token_url: format!("{}/oauth/token", config.clio.base_url.trim_end_matches('/')),
        client_id: config.clio.client_id.clone(),
        client_secret: config.clio.client_secret.clone(),
        token_path: config.clio.token_path.clone(),
        retry: config.retry(),
    })?);

    let source = DropboxSource::new(
        docferry_dropbox::Client::new(dropbox_tokens)?
            .with_api_url(&config.dropbox.api_url)
            .with_retry(config.critical_retry()),
    );
    let destination = ClioDestination::new(
        docferry_clio::Client::new(clio_tokens)?
            .with_base_url(&config.clio.base_url)
            .with_retry(config.critical_retry()),
    );

    let checkpoint = CheckpointStore::open(&config.checkpoint_path)?;
    let clock = SystemClock;
    let mut migrator = Migrator::new(&source, &destination, &clock, checkpoint)
        .with_window(window)
        .with_settings(config.settings());

    Ok(migrator.run(&mappings).await)
}

/// Loads the checkpoint and renders per-case progress.
pub fn status(config: &Config) -> anyhow::Result<String> {
    let store = CheckpointStore::open(&config.checkpoint_path)?;
    Ok(render_status(store.document()))
}

fn render_status(doc: &CheckpointDocument) -> String {
    if doc.cases.is_empty() {
        return "no cases recorded\n".to_string();
    }

    let mut out = String::new();
    for (case, record) in &doc.cases {
        let status = match record.status {
            CaseStatus::InProgress => "in progress",
            CaseStatus::Completed if record.failed_files().next().is_some() => {
                "completed with failures"
            }
            CaseStatus::Completed => "completed",
        };
        let failed: Vec<_> = record.failed_files().collect();
        out.push_str(&format!(
            "{case}: {status} ({} uploaded, {} failed)\n",
            record.completed_file_count(),
            failed.len()
        ));
        for (file, file_record) in failed {
            out.push_str(&format!(
                "    {file}: {}\n",
                file_record.error_message.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    out
}

/// One-line summary printed after a run.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = format!(
        "{} completed, {} already done, {} failed; files: {} uploaded, {} skipped, {} failed\n",
        summary.completed,
        summary.already_completed,
        summary.failed_cases.len(),
        summary.files_uploaded,
        summary.files_skipped,
        summary.files_failed
    );
    for (case, error) in &summary.failed_cases {
        out.push_str(&format!("    {case}: {error}\n"));
    }
    out
}
