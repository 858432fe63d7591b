//! `dermascan config`

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use super::common::print_json;
use crate::Config;

#[derive(Serialize)]
struct ConfigEntry<'a> {
    value: &'a str,
    source: &'a str,
}

pub fn execute_config_command(config: &Config, json: bool) -> Result<()> {
    let effective = config.effective_config();

    if json {
        let entries: BTreeMap<&str, ConfigEntry<'_>> = effective
            .iter()
            .map(|(key, (value, source))| {
                (
                    key.as_str(),
                    ConfigEntry {
                        value,
                        source,
                    },
                )
            })
            .collect();
        return print_json(&entries);
    }

    let width = effective.keys().map(String::len).max().unwrap_or(0);
    println!("Effective configuration:");
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value}  ({source})");
    }
    Ok(())
}
