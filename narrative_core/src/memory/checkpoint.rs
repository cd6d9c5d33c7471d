//! Checkpoint documents - JSON persistence of the memory store.
//!
//! Loading is lenient for leaf fields (missing lists default to empty, missing
//! counters to zero) but strict about the two top-level sections.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{EntityMemory, GlobalContext};
use crate::error::CheckpointError;

const CHARACTERS_KEY: &str = "characters";
const GLOBAL_CONTEXT_KEY: &str = "global_context";

/// Serialized form of a memory store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub characters: BTreeMap<String, EntityMemory>,
    pub global_context: GlobalContext,
}

impl Checkpoint {
    /// Parse a checkpoint document.
    ///
    /// An entry without a `character_id` key takes its map key, and one
    /// without a `name` key takes its id. Present values are kept as written.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let mut value: Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or(CheckpointError::NotAnObject)?;
        for key in [CHARACTERS_KEY, GLOBAL_CONTEXT_KEY] {
            if !object.contains_key(key) {
                return Err(CheckpointError::MissingKey(key));
            }
        }

        if let Some(characters) = value.get_mut(CHARACTERS_KEY).and_then(Value::as_object_mut) {
            for (id, entry) in characters.iter_mut() {
                if let Some(fields) = entry.as_object_mut() {
                    let character_id = fields
                        .entry("character_id")
                        .or_insert_with(|| Value::String(id.clone()))
                        .clone();
                    fields.entry("name").or_insert(character_id);
                }
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the checkpoint to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let io_err = |source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)?;

        info!(
            path = %path.display(),
            characters = self.characters.len(),
            "saved checkpoint"
        );
        Ok(())
    }

    /// Read a checkpoint from `path`.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let json = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            characters = checkpoint.characters.len(),
            "loaded checkpoint"
        );
        Ok(checkpoint)
    }
}
