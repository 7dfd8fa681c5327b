use clap::Subcommand;
use mend_snapshot::MendPaths;
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. budget.max_files)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

/// Read config from `.mend/config.json`. Returns empty map if file doesn't exist.
fn read_config(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn write_config(
    path: &Path,
    map: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(map)?)?;
    Ok(())
}

/// Parse a CLI value string into the most specific JSON type.
fn parse_value(value: &str) -> serde_json::Value {
    if value == "true" {
        return serde_json::Value::Bool(true);
    }
    if value == "false" {
        return serde_json::Value::Bool(false);
    }
    if let Ok(n) = value.parse::<u64>() {
        return serde_json::Value::from(n);
    }
    serde_json::Value::String(value.to_string())
}

fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);
    let mut map = read_config(&paths.config_json)?;
    map.insert(key.to_string(), parse_value(value));
    write_config(&paths.config_json, &map)?;
    println!("{key} = {value}");
    Ok(())
}

fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);
    let map = read_config(&paths.config_json)?;
    match map.get(key) {
        Some(value) => println!("{value}"),
        None => println!("(unset)"),
    }
    Ok(())
}

fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);
    let map = read_config(&paths.config_json)?;
    for (key, value) in &map {
        println!("{key} = {value}");
    }
    Ok(())
}
