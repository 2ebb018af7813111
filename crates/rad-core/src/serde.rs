//! Canonical JSON and YAML helpers used for requests, grids and job records.

use std::collections::BTreeMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::errors::RadError;

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, RadError> {
    let value = serde_json::to_value(value).map_err(|err| RadError::serde("json_serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| RadError::serde("json_write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, RadError> {
    serde_json::from_slice(data).map_err(|err| RadError::serde("json_deserialize", err))
}

/// Serializes a value into YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, RadError> {
    serde_yaml::to_string(value).map_err(|err| RadError::serde("yaml_serialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, RadError> {
    serde_yaml::from_slice(data).map_err(|err| RadError::serde("yaml_deserialize", err))
}

/// Reads and decodes a JSON document from disk.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, RadError> {
    let bytes = fs::read(path).map_err(|err| {
        RadError::io("json_read", format!("{}: {err}", path.display()))
    })?;
    from_json_slice(&bytes)
}

/// Writes a value as canonical JSON, creating parent directories as needed.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), RadError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| RadError::io("json_parent_dir", err))?;
        }
    }
    let bytes = to_canonical_json_bytes(value)?;
    fs::write(path, bytes)
        .map_err(|err| RadError::io("json_write", format!("{}: {err}", path.display())))
}
