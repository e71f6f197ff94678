//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::server::Endpoint;
use crate::AllocatorError;

pub const SETTINGS_FILE: &str = "allocator_settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AllocatorSettings {
    pub grid_width: i32,
    pub grid_height: i32,
    pub gallery: String,
    pub surface_type: String,
    /// Base URL the save and load endpoints live under
    pub server_url: String,
    pub csrf_token: String,
    /// What one face is called in artist lists: "panel" or "table"
    pub panels_or_tables: String,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        AllocatorSettings {
            grid_width: 30,
            grid_height: 20,
            gallery: "General".to_string(),
            surface_type: "panel".to_string(),
            server_url: String::new(),
            csrf_token: String::new(),
            panels_or_tables: "panel".to_string(),
        }
    }
}

impl AllocatorSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AllocatorError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: AllocatorSettings = serde_json::from_str(&contents)?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.grid_width = self.grid_width.max(2);
        self.grid_height = self.grid_height.max(2);
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: self.server_url.clone(),
            gallery: self.gallery.clone(),
            surface_type: self.surface_type.clone(),
            csrf_token: self.csrf_token.clone(),
        }
    }
}
