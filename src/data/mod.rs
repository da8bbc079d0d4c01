mod gen;
mod run;

pub use gen::*;
pub use run::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::BufRead;

/// Reads a JSON value from the reader.
///
/// # Errors
/// - If the input is not valid JSON for `T`.
pub fn deserialize<T: DeserializeOwned>(reader: &mut impl BufRead) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(reader)?)
}

/// Writes a value as pretty-printed JSON.
///
/// # Errors
/// - If the value cannot be serialized.
pub fn to_string<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
