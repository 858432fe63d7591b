//! `dermascan classes`

use anyhow::Result;

use super::common::print_json;
use crate::cli::labels;
use crate::{Config, DermaError, from_config};

pub async fn execute_classes_command(config: &Config, json: bool) -> Result<()> {
    let gateways = from_config(config).map_err(DermaError::from)?;
    let classes = gateways.analysis.classes().await.map_err(DermaError::from)?;

    if json {
        return print_json(&classes);
    }

    println!("{} classes:", classes.len());
    for class in &classes {
        println!(
            "  {}",
            labels::class_name(&class.label, class.localized_label.as_deref())
        );
    }
    Ok(())
}
