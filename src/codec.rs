// 12.0 codec.rs: portable formats for import and export.
// csv: header row, `id` then the domain's documented columns, every field quoted.
// json: array of objects, `id` plus payload fields. bookkeeping never leaves the engine.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::domains::{Column, ColumnKind};
use crate::engine::{ConfigError, RowError};
use crate::item::ConfigItem;
use crate::types::ItemId;

pub const ID_COLUMN: &str = "id";

/// A decoded row: optional id plus the payload fields as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub id: Option<ItemId>,
    pub fields: Value,
}

impl RawRow {
    /// Split an incoming JSON object into id and payload fields.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("row must be a JSON object".to_string());
        };
        let id = match fields.remove(ID_COLUMN) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(ItemId::new(s)),
            Some(other) => return Err(format!("id must be a string, got {other}")),
        };
        Ok(Self {
            id,
            fields: Value::Object(fields),
        })
    }
}

fn payload_object<P: Serialize>(item: &ConfigItem<P>) -> Result<Map<String, Value>, ConfigError> {
    match serde_json::to_value(&item.payload)? {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::Export(format!(
            "payload of {} serialized to {other}, expected an object",
            item.id
        ))),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

pub fn encode_csv<'a, P: Serialize + 'a>(
    items: impl Iterator<Item = &'a ConfigItem<P>>,
    columns: &[Column],
    delimiter: u8,
) -> Result<Vec<u8>, ConfigError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    let header: Vec<&str> = std::iter::once(ID_COLUMN)
        .chain(columns.iter().map(|c| c.name))
        .collect();
    writer.write_record(&header)?;

    for item in items {
        let fields = payload_object(item)?;
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(item.id.as_str().to_string());
        record.extend(columns.iter().map(|c| cell(fields.get(c.name))));
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ConfigError::Export(e.to_string()))
}

pub fn encode_json<'a, P: Serialize + 'a>(
    items: impl Iterator<Item = &'a ConfigItem<P>>,
    pretty: bool,
) -> Result<Vec<u8>, ConfigError> {
    let mut rows = Vec::new();
    for item in items {
        let mut object = payload_object(item)?;
        object.insert(ID_COLUMN.to_string(), Value::String(item.id.as_str().to_string()));
        rows.push(Value::Object(object));
    }
    let bytes = if pretty {
        serde_json::to_vec_pretty(&rows)?
    } else {
        serde_json::to_vec(&rows)?
    };
    Ok(bytes)
}

fn parse_cell(raw: &str, kind: ColumnKind) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match kind {
        ColumnKind::Text => Ok(Value::String(raw.to_string())),
        ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{raw}' is not an integer")),
        ColumnKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(format!("'{raw}' is not a boolean")),
        },
        ColumnKind::Json => serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}")),
    }
}

/// Decode CSV rows. a bad header fails the whole file; a bad row only fails that row.
pub fn decode_csv(bytes: &[u8], columns: &[Column], delimiter: u8) -> Result<Vec<Result<RawRow, RowError>>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();
    let id_index = headers.get(ID_COLUMN).copied();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let label = format!("row {}", index + 1);
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                rows.push(Err(RowError::new(&label, e.to_string())));
                continue;
            }
        };

        let id = id_index
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ItemId::from);

        let mut fields = Map::new();
        let mut failure = None;
        for column in columns {
            let Some(raw) = headers.get(column.name).and_then(|&i| record.get(i)) else {
                continue;
            };
            match parse_cell(raw, column.kind) {
                Ok(Value::Null) => {}
                Ok(value) => {
                    fields.insert(column.name.to_string(), value);
                }
                Err(reason) => {
                    failure = Some(format!("{}: {reason}", column.name));
                    break;
                }
            }
        }

        let row_id = id.as_ref().map_or(label, |id| id.as_str().to_string());
        rows.push(match failure {
            Some(reason) => Err(RowError::new(&row_id, reason)),
            None => Ok(RawRow {
                id,
                fields: Value::Object(fields),
            }),
        });
    }
    Ok(rows)
}
