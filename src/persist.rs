//! TOML persistence for override data: patch values into an existing file
//! while preserving its comments and formatting.
//!
//! Uses `toml_edit`. Keys missing from the new data are removed; `Null`
//! values are not representable in TOML and are dropped.

use crate::error::SetmanError;
use crate::value::{Data, Value};

/// Pure function: rewrite the TOML document `content` (empty when the file
/// does not exist yet) so that it holds exactly `data`.
pub fn write_document(content: Option<&str>, data: &Data) -> Result<String, SetmanError> {
    let mut doc: toml_edit::DocumentMut =
        content
            .unwrap_or_default()
            .parse()
            .map_err(|e: toml_edit::TomlError| SetmanError::Serialize {
                format: "toml".into(),
                reason: e.to_string(),
            })?;

    patch_table(doc.as_table_mut(), data);
    Ok(doc.to_string())
}

fn patch_table(table: &mut toml_edit::Table, data: &Data) {
    let stale: Vec<String> = table
        .iter()
        .map(|(key, _)| key.to_string())
        .filter(|key| !data.get(key).is_some_and(|v| !v.is_null()))
        .collect();
    for key in stale {
        table.remove(&key);
    }

    for (key, value) in data {
        match value {
            Value::Null => {}
            Value::Map(nested) => {
                if !table.get(key).is_some_and(toml_edit::Item::is_table) {
                    table.insert(key, toml_edit::Item::Table(toml_edit::Table::new()));
                }
                if let Some(sub) = table.get_mut(key).and_then(toml_edit::Item::as_table_mut) {
                    patch_table(sub, nested);
                }
            }
            scalar => {
                if let Some(v) = to_toml_edit_value(scalar) {
                    match table.get_mut(key).and_then(toml_edit::Item::as_value_mut) {
                        // Keep the decor (comments, spacing) of the existing value.
                        Some(existing) => {
                            let decor = existing.decor().clone();
                            *existing = v;
                            *existing.decor_mut() = decor;
                        }
                        None => {
                            table.insert(key, toml_edit::value(v));
                        }
                    }
                }
            }
        }
    }
}

/// Decimals are written as strings to keep their precision.
fn to_toml_edit_value(value: &Value) -> Option<toml_edit::Value> {
    Some(match value {
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Decimal(d) => d.to_string().into(),
        Value::String(s) => s.as_str().into(),
        Value::Null | Value::Map(_) => return None,
    })
}
