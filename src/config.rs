// Tue Jan 20 2026 - Alex

use crate::structure::StructureError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of a pointer on the target, in bytes.
    pub pointer_width_bytes: usize,
    /// Elements read for every array-mode layout.
    pub array_elements: usize,
    /// Name of the `FILE*` the generated code reads from.
    pub stream_name: String,
    pub struct_prefix: String,
    pub field_prefix: String,
    /// Largest byte extent evidence may give a layout.
    pub max_extent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pointer_width_bytes: 8,
            array_elements: 8,
            stream_name: "h".to_string(),
            struct_prefix: "S".to_string(),
            field_prefix: "entry_".to_string(),
            max_extent: 0x10_0000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, StructureError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate().map_err(StructureError::InvalidConfig)?;
        Ok(config)
    }

    pub fn with_pointer_width(mut self, bytes: usize) -> Self {
        self.pointer_width_bytes = bytes;
        self
    }

    pub fn with_array_elements(mut self, count: usize) -> Self {
        self.array_elements = count;
        self
    }

    pub fn with_max_extent(mut self, bytes: usize) -> Self {
        self.max_extent = bytes;
        self
    }

    pub fn with_stream_name(mut self, name: &str) -> Self {
        self.stream_name = name.to_string();
        self
    }

    pub fn field_name(&self, index: usize) -> String {
        format!("{}{}", self.field_prefix, index)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pointer_width_bytes != 4 && self.pointer_width_bytes != 8 {
            return Err(format!("pointer_width_bytes must be 4 or 8, got {}", self.pointer_width_bytes));
        }
        if self.array_elements == 0 {
            return Err("array_elements must be greater than 0".to_string());
        }
        if self.max_extent == 0 {
            return Err("max_extent must be greater than 0".to_string());
        }
        if self.stream_name.is_empty() || self.struct_prefix.is_empty() || self.field_prefix.is_empty() {
            return Err("stream_name, struct_prefix and field_prefix must not be empty".to_string());
        }
        Ok(())
    }
}
