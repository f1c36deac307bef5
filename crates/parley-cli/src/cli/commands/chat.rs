//! Chat command handler: startup wiring and TUI handoff.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use parley_core::config::{Config, paths};
use parley_core::providers::{AdapterSettings, ProviderKind, resolve_adapter};
use parley_core::session::Session;
use parley_core::store::{ConversationStore, FileStore};
use parley_core::models;
use tracing_subscriber::EnvFilter;

/// Command-line overrides for the configured provider/model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
}

pub async fn run(config: &Config, overrides: &Overrides<'_>) -> Result<()> {
    // File logging only: the TUI owns the terminal. The guard must stay
    // alive for the whole session.
    let _log_guard = init_logging()?;

    let provider_name = overrides.provider.unwrap_or(&config.provider);
    let model = effective_model(config, overrides, provider_name);

    let provider_config = ProviderKind::from_id(provider_name)
        .map(|kind| config.providers.get(kind))
        .cloned()
        .unwrap_or_default();
    let settings = AdapterSettings {
        api_key: provider_config.effective_api_key(),
        base_url: provider_config.effective_base_url(),
        max_tokens: config.max_tokens,
    };

    // Startup errors (unknown provider, construction failure) abort here;
    // per-turn errors stay inside the session.
    let adapter = resolve_adapter(provider_name, &model, settings)
        .context("resolve provider")?;
    let kind = adapter.kind();

    let store = FileStore::open(paths::conversations_dir()).context("open conversation store")?;
    let conversation = store
        .create_conversation(kind.id(), &model)
        .context("create conversation")?;

    // Pre-TUI info goes to stderr; the alternate screen replaces it.
    let mut err = std::io::stderr();
    writeln!(err, "parley · {} · {}", kind.label(), model)?;
    writeln!(err, "conversation {}", conversation.id)?;
    err.flush()?;

    tracing::info!(provider = %kind, model = %model, conversation = %conversation.id, "chat session starting");

    let mut session = Session::new(Arc::new(adapter), Arc::new(store), conversation.id);
    parley_tui::run_interactive_chat(&mut session, kind.label(), &model)
        .context("interactive chat failed")?;

    Ok(())
}

/// Picks the model: explicit flag, else config, unless the provider was
/// switched on the command line without a model (the configured model
/// would belong to the wrong vendor, so fall back to the catalog default).
fn effective_model(config: &Config, overrides: &Overrides<'_>, provider_name: &str) -> String {
    if let Some(model) = overrides.model {
        return model.to_string();
    }
    if overrides.provider.is_some()
        && let Some(kind) = ProviderKind::from_id(provider_name)
        && models::find(&config.model).is_none_or(|m| m.provider != kind)
    {
        return models::default_model(kind).id.to_string();
    }
    config.model.clone()
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let dir = paths::logs_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, "parley.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
