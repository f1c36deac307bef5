//! Model catalog listing.

use anyhow::Result;
use parley_core::models;
use parley_core::providers::ProviderKind;

pub fn list() -> Result<()> {
    for kind in ProviderKind::all() {
        println!(
            "{} ({}) · credential: {}",
            kind.label(),
            kind.id(),
            kind.api_key_env_var()
        );
        for model in models::for_provider(*kind) {
            println!("  {:<24} {}", model.id, model.label);
        }
        println!();
    }
    Ok(())
}
