//! Config command handlers.

use anyhow::Result;
use parley_core::config::{Config, paths};

pub fn path() -> Result<()> {
    println!("{}", paths::config_path().display());
    Ok(())
}

pub fn init() -> Result<()> {
    let path = paths::config_path();
    if Config::init(&path)? {
        println!("Wrote {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}
