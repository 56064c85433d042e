//! Builds the config, storage, question bank and session controller that
//! the commands share.

use std::sync::Arc;

use anyhow::{Context, Result};

use elevenplus_core::config::{load_config_from, AppConfig};
use elevenplus_core::events::TracingSink;
use elevenplus_core::model::{QuestionBank, Subject};
use elevenplus_core::parser::{load_question_bank, DirectorySource};
use elevenplus_core::session::SessionController;
use elevenplus_core::storage::{FileStore, Storage};

use crate::GlobalArgs;

/// Config with the command-line overrides applied.
pub fn config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = load_config_from(global.config.as_deref())?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &global.storage_dir {
        config.storage_dir = dir.clone();
    }
    Ok(config)
}

pub fn storage(config: &AppConfig) -> Storage {
    Storage::new(Arc::new(FileStore::new(&config.storage_dir))).with_history_cap(config.history_cap)
}

/// Load every subject's bank. Failure here is fatal.
pub async fn bank(config: &AppConfig) -> Result<Arc<QuestionBank>> {
    let source = DirectorySource::new(&config.data_dir);
    tracing::debug!("loading question bank from {}", config.data_dir.display());
    let bank = load_question_bank(&source, &Subject::ALL)
        .await
        .with_context(|| {
            format!(
                "failed to load question bank from {} (run `elevenplus init` for a sample)",
                config.data_dir.display()
            )
        })?;
    Ok(Arc::new(bank))
}

fn build(config: &AppConfig, bank: Arc<QuestionBank>) -> SessionController {
    SessionController::new(bank, storage(config))
        .with_events(Arc::new(TracingSink))
        .with_config(config.session_config())
}

/// A controller over the loaded bank, not yet resumed.
pub async fn controller(global: &GlobalArgs) -> Result<SessionController> {
    let config = config(global)?;
    let bank = bank(&config).await?;
    Ok(build(&config, bank))
}

/// A controller with the saved session restored, if there is one.
pub async fn resumed(global: &GlobalArgs) -> Result<SessionController> {
    let mut controller = controller(global).await?;
    if controller.resume().is_none() {
        tracing::debug!("no saved test to restore");
    }
    Ok(controller)
}

/// A controller for history-only commands; no question bank is needed.
pub fn history_controller(global: &GlobalArgs) -> Result<SessionController> {
    let config = config(global)?;
    Ok(build(&config, Arc::new(QuestionBank::default())))
}
