//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::collections::{BTreeMap, BTreeSet, HashMap};

use eframe::egui;

use crate::grid::{FaceKey, GridPoint, Orientation, PanelKey, Side, Usability};

/// Fraction of the available width used by landscape grids
const LANDSCAPE_WIDTH_FRACTION: f32 = 0.7;
/// Width reserved for the artist list next to portrait grids
const PORTRAIT_SIDEBAR_WIDTH: f32 = 300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub orientation: Orientation,
    pub usability: Usability,
    pub labels: BTreeMap<Side, String>,
}

impl Panel {
    pub fn new(orientation: Orientation, usability: Usability) -> Self {
        Panel {
            orientation,
            usability,
            labels: BTreeMap::new(),
        }
    }

    pub fn allows(&self, side: Side) -> bool {
        self.usability.allows(self.orientation, side)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelToggle {
    Created,
    Removed,
}

/// Result of a click on a grid node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// First endpoint recorded, waiting for the second click
    Pending(GridPoint),
    /// Selection dropped: same node clicked twice, or the nodes were not collinear
    Cancelled,
    /// Every unit step between the two nodes was toggled
    Toggled { created: usize, removed: usize },
}

/// How one side of a panel is drawn while the layout is being modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideShade {
    Unused,
    Available,
}

/// On-screen geometry of the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub display_width: f32,
    pub display_height: f32,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl LayoutMetrics {
    /// Display size keeps the grid's width:height ratio
    pub fn new(grid_width: i32, grid_height: i32, available_width: f32) -> Self {
        let grid_width = grid_width.max(1) as f32;
        let grid_height = grid_height.max(1) as f32;
        let ratio = grid_width / grid_height;
        let display_width = if ratio > 1.0 {
            available_width * LANDSCAPE_WIDTH_FRACTION
        } else {
            (available_width - PORTRAIT_SIDEBAR_WIDTH).max(available_width * 0.5)
        };
        let display_height = display_width / ratio;
        LayoutMetrics {
            display_width,
            display_height,
            cell_width: display_width / (grid_width + 1.0),
            cell_height: display_height / (grid_height + 1.0),
        }
    }

    pub fn node_position(&self, point: GridPoint) -> egui::Pos2 {
        egui::pos2(
            point.x as f32 * self.cell_width,
            point.y as f32 * self.cell_height,
        )
    }

    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.display_width, self.display_height)
    }
}

/// The panel layout of one gallery wall plan
#[derive(Debug, Clone, Default)]
pub struct ShowMap {
    width: i32,
    height: i32,
    panels: BTreeMap<PanelKey, Panel>,
    pending: Option<GridPoint>,
    /// Panels added since sections were last rebuilt
    created: BTreeSet<PanelKey>,
    label_index: HashMap<String, FaceKey>,
}

impl ShowMap {
    pub fn new(width: i32, height: i32) -> Self {
        ShowMap {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn metrics(&self, available_width: f32) -> LayoutMetrics {
        LayoutMetrics::new(self.width, self.height, available_width)
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        (1..=self.width).contains(&point.x) && (1..=self.height).contains(&point.y)
    }

    pub fn nodes(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (1..=self.width).flat_map(move |x| (1..=self.height).map(move |y| GridPoint::new(x, y)))
    }

    pub fn panels(&self) -> &BTreeMap<PanelKey, Panel> {
        &self.panels
    }

    pub fn panel(&self, key: &PanelKey) -> Option<&Panel> {
        self.panels.get(key)
    }

    pub fn has_panel(&self, key: &PanelKey) -> bool {
        self.panels.contains_key(key)
    }

    pub fn is_face_usable(&self, face: &FaceKey) -> bool {
        self.panels
            .get(&face.panel)
            .is_some_and(|panel| panel.allows(face.side))
    }

    /// All usable faces in key order
    pub fn usable_faces(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.panels.iter().flat_map(|(key, panel)| {
            panel
                .orientation
                .sides()
                .into_iter()
                .filter(|side| panel.allows(*side))
                .map(|side| key.face(side))
        })
    }

    pub fn pending(&self) -> Option<GridPoint> {
        self.pending
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn set_pending(&mut self, point: GridPoint) {
        if self.contains(point) {
            self.pending = Some(point);
        }
    }

    pub fn created_panels(&self) -> &BTreeSet<PanelKey> {
        &self.created
    }

    pub fn clear_created(&mut self) {
        self.created.clear();
    }

    /// Removes every panel and label
    pub fn clear(&mut self) {
        self.panels.clear();
        self.created.clear();
        self.label_index.clear();
        self.pending = None;
    }

    /// Creates the panel between `a` and `b`, or deletes it if it already exists.
    /// Returns `None` when the points are not grid-adjacent on a single axis or
    /// fall outside the grid.
    pub fn toggle_panel(
        &mut self,
        a: GridPoint,
        b: GridPoint,
        usability: Usability,
    ) -> Option<PanelToggle> {
        if !self.contains(a) || !self.contains(b) {
            log::debug!("Ignoring panel {} -> {} outside the grid", a, b);
            return None;
        }
        let Some(key) = PanelKey::new(a, b) else {
            log::debug!("Ignoring panel {} -> {}: points are not adjacent", a, b);
            return None;
        };
        if self.remove_panel(&key) {
            Some(PanelToggle::Removed)
        } else {
            self.panels
                .insert(key, Panel::new(key.orientation(), usability));
            self.created.insert(key);
            Some(PanelToggle::Created)
        }
    }

    /// Places a panel as loaded from a saved layout, replacing any existing one.
    /// Panels with an endpoint off the grid are skipped; returns whether it was placed.
    pub fn insert_panel(&mut self, key: PanelKey, panel: Panel) -> bool {
        if !self.contains(key.a()) || !self.contains(key.b()) {
            log::warn!("Skipping panel {} outside the grid", key);
            return false;
        }
        self.remove_panel(&key);
        for (side, label) in &panel.labels {
            if !label.is_empty() {
                self.label_index.insert(label.clone(), key.face(*side));
            }
        }
        self.panels.insert(key, panel);
        true
    }

    fn remove_panel(&mut self, key: &PanelKey) -> bool {
        let Some(panel) = self.panels.remove(key) else {
            return false;
        };
        for (side, label) in panel.labels {
            if self.label_index.get(&label) == Some(&key.face(side)) {
                self.label_index.remove(&label);
            }
        }
        self.created.remove(key);
        true
    }

    /// Two-click protocol: the first click records a pending endpoint, the second
    /// toggles every unit panel between the two endpoints if they are collinear.
    pub fn activate(&mut self, point: GridPoint) -> ActivateOutcome {
        let Some(start) = self.pending.take() else {
            if !self.contains(point) {
                return ActivateOutcome::Cancelled;
            }
            self.pending = Some(point);
            return ActivateOutcome::Pending(point);
        };
        let Some(steps) = start.unit_steps_to(point) else {
            return ActivateOutcome::Cancelled;
        };
        let (mut created, mut removed) = (0, 0);
        for (a, b) in steps {
            match self.toggle_panel(a, b, Usability::Both) {
                Some(PanelToggle::Created) => created += 1,
                Some(PanelToggle::Removed) => removed += 1,
                None => (),
            }
        }
        ActivateOutcome::Toggled { created, removed }
    }

    /// Advances the panel to the next usability state. Returns false if the
    /// panel does not exist.
    pub fn change_panel_usability(&mut self, key: &PanelKey) -> bool {
        match self.panels.get_mut(key) {
            Some(panel) => {
                panel.usability = panel.usability.next();
                true
            }
            None => false,
        }
    }

    pub fn face_label(&self, face: &FaceKey) -> Option<&str> {
        self.panels
            .get(&face.panel)
            .and_then(|panel| panel.labels.get(&face.side))
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    /// The face carrying the given label, if any
    pub fn face_for_label(&self, label: &str) -> Option<FaceKey> {
        self.label_index.get(label).copied()
    }

    /// Records the label of a face. An empty label removes it.
    pub fn set_face_label(&mut self, face: &FaceKey, text: &str) -> bool {
        let Some(panel) = self.panels.get_mut(&face.panel) else {
            return false;
        };
        if face.side.orientation() != panel.orientation {
            return false;
        }
        let text = text.trim();
        if let Some(previous) = panel.labels.remove(&face.side) {
            if self.label_index.get(&previous) == Some(face) {
                self.label_index.remove(&previous);
            }
        }
        if !text.is_empty() {
            panel.labels.insert(face.side, text.to_string());
            self.label_index.insert(text.to_string(), *face);
        }
        true
    }

    /// How each side of a panel looks in modify-layout mode, side A first
    pub fn panel_shading(&self, key: &PanelKey) -> Option<[SideShade; 2]> {
        let panel = self.panels.get(key)?;
        Some(panel.orientation.sides().map(|side| {
            if panel.allows(side) {
                SideShade::Available
            } else {
                SideShade::Unused
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn double_toggle_restores_panel_set() {
        let mut map = ShowMap::new(5, 5);
        map.toggle_panel(p(1, 1), p(2, 1), Usability::Both);
        let before: Vec<_> = map.panels().keys().copied().collect();

        assert_eq!(
            map.toggle_panel(p(3, 2), p(3, 3), Usability::Both),
            Some(PanelToggle::Created)
        );
        assert_eq!(
            map.toggle_panel(p(3, 3), p(3, 2), Usability::Both),
            Some(PanelToggle::Removed)
        );
        let after: Vec<_> = map.panels().keys().copied().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn toggling_non_adjacent_points_is_a_no_op() {
        let mut map = ShowMap::new(5, 5);
        assert_eq!(map.toggle_panel(p(1, 1), p(2, 2), Usability::Both), None);
        assert_eq!(map.toggle_panel(p(1, 1), p(3, 1), Usability::Both), None);
        assert_eq!(map.toggle_panel(p(5, 1), p(6, 1), Usability::Both), None);
        assert!(map.panels().is_empty());
    }

    #[test]
    fn activate_builds_a_multi_panel_run() {
        let mut map = ShowMap::new(6, 6);
        assert_eq!(map.activate(p(5, 2)), ActivateOutcome::Pending(p(5, 2)));
        assert_eq!(
            map.activate(p(1, 2)),
            ActivateOutcome::Toggled {
                created: 4,
                removed: 0
            }
        );
        assert_eq!(map.panels().len(), 4);
        assert!(map.pending().is_none());
        assert_eq!(map.created_panels().len(), 4);
    }

    #[test]
    fn activate_cancels_on_same_point_or_diagonal() {
        let mut map = ShowMap::new(6, 6);
        map.activate(p(2, 2));
        assert_eq!(map.activate(p(2, 2)), ActivateOutcome::Cancelled);
        assert!(map.pending().is_none());

        map.activate(p(2, 2));
        assert_eq!(map.activate(p(4, 5)), ActivateOutcome::Cancelled);
        assert!(map.panels().is_empty());
        assert!(map.pending().is_none());
    }

    #[test]
    fn usability_cycle_changes_shading() {
        let mut map = ShowMap::new(3, 3);
        map.toggle_panel(p(1, 1), p(1, 2), Usability::None);
        let key = PanelKey::new(p(1, 1), p(1, 2)).unwrap();
        assert_eq!(
            map.panel_shading(&key),
            Some([SideShade::Unused, SideShade::Unused])
        );
        assert!(map.change_panel_usability(&key));
        assert_eq!(
            map.panel_shading(&key),
            Some([SideShade::Available, SideShade::Unused])
        );
        assert!(map.is_face_usable(&key.face(Side::Left)));
        assert!(!map.is_face_usable(&key.face(Side::Right)));
    }

    #[test]
    fn labels_are_indexed_and_dropped_with_their_panel() {
        let mut map = ShowMap::new(3, 3);
        map.toggle_panel(p(1, 1), p(2, 1), Usability::Both);
        let face = PanelKey::new(p(1, 1), p(2, 1)).unwrap().face(Side::Down);
        assert!(map.set_face_label(&face, "A12"));
        assert_eq!(map.face_label(&face), Some("A12"));
        assert_eq!(map.face_for_label("A12"), Some(face));

        map.set_face_label(&face, "A13");
        assert_eq!(map.face_for_label("A12"), None);

        map.toggle_panel(p(2, 1), p(1, 1), Usability::Both);
        assert_eq!(map.face_for_label("A13"), None);
    }

    #[test]
    fn metrics_keep_grid_proportions() {
        for (w, h) in [(20, 10), (10, 20), (7, 7)] {
            let metrics = LayoutMetrics::new(w, h, 1600.0);
            let display_ratio = metrics.display_width / metrics.display_height;
            assert!((display_ratio - w as f32 / h as f32).abs() < 1e-3);
        }
    }
}
