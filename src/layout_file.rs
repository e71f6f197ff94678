//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use crate::grid::{Orientation, PanelKey, Side, Usability};
use crate::show_map::{Panel, ShowMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default file name for layout exports
pub const LAYOUT_FILE_NAME: &str = "layout.json";

/// Stored form of a single panel
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PanelRecord {
    /// Orientation, `h` or `v`
    pub t: Orientation,

    /// Usability code: `n`, `b` or the code of the single usable side
    pub u: String,

    /// Face labels keyed by side code
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Layout document (`layout.json`)
/// Maps every panel key to its record. This is also the `panels` part of the
/// payload stored on the server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct LayoutFile {
    panels: BTreeMap<String, PanelRecord>,
}

impl PanelRecord {
    fn from_panel(panel: &Panel) -> Self {
        PanelRecord {
            t: panel.orientation,
            u: panel.usability.code(panel.orientation).to_string(),
            labels: panel
                .labels
                .iter()
                .map(|(side, label)| (side.code().to_string(), label.clone()))
                .collect(),
        }
    }

    fn to_panel(&self) -> Option<Panel> {
        let usability = Usability::from_code(&self.u, self.t)?;
        let mut panel = Panel::new(self.t, usability);
        for (code, label) in &self.labels {
            match Side::from_code(code).filter(|side| side.orientation() == self.t) {
                Some(side) => {
                    panel.labels.insert(side, label.clone());
                }
                None => log::warn!("Dropping label on unknown side {}", code),
            }
        }
        Some(panel)
    }
}

impl LayoutFile {
    /// Snapshot of every panel on the map
    pub fn from_map(map: &ShowMap) -> Self {
        LayoutFile {
            panels: map
                .panels()
                .iter()
                .map(|(key, panel)| (key.to_string(), PanelRecord::from_panel(panel)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn records(&self) -> &BTreeMap<String, PanelRecord> {
        &self.panels
    }

    /// Replaces the map's panels with the ones in this layout.
    /// Records with a malformed key or usability, or lying off the grid, are
    /// skipped.
    /// Returns the number of panels placed.
    pub fn apply_to(&self, map: &mut ShowMap) -> usize {
        map.clear();
        let mut placed = 0;
        for (key, record) in &self.panels {
            let Ok(panel_key) = key.parse::<PanelKey>() else {
                log::warn!("Skipping panel with malformed key {}", key);
                continue;
            };
            if panel_key.orientation() != record.t {
                log::warn!("Skipping panel {}: orientation does not match its key", key);
                continue;
            }
            let Some(panel) = record.to_panel() else {
                log::warn!("Skipping panel {}: unknown usability {}", key, record.u);
                continue;
            };
            if map.insert_panel(panel_key, panel) {
                placed += 1;
            }
        }
        placed
    }

    /// Serialize layout to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Deserialize layout from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
