use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use specstruct_core::Precondition;

use crate::prelude::{println, *};

/// Read a JSON input file. A missing file is reported under the name of
/// the input it should have provided.
pub fn read_json<T: DeserializeOwned>(path: &Path, precondition: Precondition) -> Result<T> {
    if !path.exists() {
        return Err(Error::MissingInput {
            precondition,
            path: path.display().to_string(),
        }
        .into());
    }
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| f!("Failed to parse {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| eyre!("JSON serialization failed: {}", e))?;
    println!("{}", json);
    Ok(())
}
