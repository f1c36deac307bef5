//! Conversation listing and replay.

use anyhow::{Context, Result};
use parley_core::config::paths;
use parley_core::store::{ConversationId, FileStore};

pub fn list() -> Result<()> {
    let store = FileStore::open(paths::conversations_dir()).context("open conversation store")?;
    let conversations = store.list_conversations().context("list conversations")?;

    if conversations.is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }

    for meta in conversations {
        println!(
            "{}  {}/{}  {}",
            meta.id,
            meta.provider,
            meta.model,
            meta.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let store = FileStore::open(paths::conversations_dir()).context("open conversation store")?;
    let messages = store
        .read_messages(&ConversationId::from(id))
        .context("read conversation")?;

    for message in messages {
        println!("{}: {}", message.role, message.content);
        println!();
    }
    Ok(())
}
