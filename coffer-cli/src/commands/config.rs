use anyhow::{Context, Result};
use serde_json::Value;

use crate::output::{print_value, OutputFormat};
use crate::settings::Settings;

/// Look up a dotted property (`storage.bucket`) in the settings tree.
fn lookup(settings: &Settings, property: Option<&str>) -> Result<Value> {
    let root = serde_json::to_value(settings)?;
    let Some(property) = property.filter(|p| !p.is_empty()) else {
        return Ok(root);
    };

    property
        .split('.')
        .try_fold(&root, |node, key| node.get(key))
        .cloned()
        .with_context(|| format!("unknown settings property '{}'", property))
}

/// Print every setting, or a single property.
pub fn run_get(settings: &Settings, property: Option<&str>, format: OutputFormat) -> Result<()> {
    let value = lookup(settings, property)?;
    print_value(format, &value)
}
