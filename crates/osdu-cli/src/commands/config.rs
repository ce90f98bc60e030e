//! `osdu config` command implementation
//!
//! Reads and writes the layered configuration.

use super::new_table;
use crate::config::{CliConfig, ConfigItem, CONFIG_CLIENT_SECRET, CONFIG_REFRESH_TOKEN};
use crate::error::Result;
use colored::Colorize;

const SECRET_KEYS: &[&str] = &[CONFIG_CLIENT_SECRET, CONFIG_REFRESH_TOKEN];

/// Print the effective value of a key
pub fn get(config: &CliConfig, section: &str, key: &str) -> Result<()> {
    println!("{}", config.get(section, key)?);
    Ok(())
}

/// Persist a value to the configuration file
pub fn set(config: &mut CliConfig, section: &str, key: &str, value: &str) -> Result<()> {
    config.set(section, key, value)?;
    println!(
        "{} Set {}.{} in {}",
        "✓".green(),
        section,
        key.to_lowercase(),
        config.config_path().display()
    );

    let env_var = config.env_var_name(section, key);
    if config.get_opt(section, key).as_deref() != Some(value) {
        println!(
            "{} {} is set and overrides this value",
            "ℹ".cyan(),
            env_var
        );
    }
    Ok(())
}

/// Show every effective value of a section with its source
pub fn list(config: &CliConfig, section: &str) -> Result<()> {
    let items = config.items(section);
    if items.is_empty() {
        println!("No configuration found for section '{}'.", section);
        println!("Run 'osdu config set <key> <value>' to add one.");
        return Ok(());
    }

    println!("{}", format!("[{}]", section).cyan().bold());
    println!("{}", render_items(&items));
    Ok(())
}

fn render_items(items: &[ConfigItem]) -> String {
    let mut table = new_table(vec!["Key", "Value", "Source"]);

    for item in items {
        table.add_row(vec![
            item.name.clone(),
            display_value(&item.name, &item.value),
            item.source.to_string(),
        ]);
    }

    table.to_string()
}

/// Hide secrets, keeping only a short prefix
fn display_value(key: &str, value: &str) -> String {
    if !SECRET_KEYS.contains(&key) {
        return value.to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}****", prefix)
}
