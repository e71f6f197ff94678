//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::collections::BTreeMap;

use crate::grid::{FaceKey, GridPoint, PanelKey};
use crate::interactor::Interactor;
use crate::layout_file::LayoutFile;
use crate::panel_logic::{
    ArtistAssignment, FaceShade, Highlight, ManualOutcome, PanelLogic, SectionId,
};
use crate::serializer::{self, SavePayload, SavedMap};
use crate::server::Endpoint;
use crate::show_map::{ActivateOutcome, ShowMap};
use crate::{AllocatorError, AllocatorSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ModifyLayout,
    AssignSingle,
    LoadSave,
    LabelEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    LoadSave,
    Modify,
    Rename,
    SaveLayout,
    ImportLayout,
    AssignAll,
    AssignSingle,
    UnassignSingle,
    Recalculate,
    Load,
    Save,
    Upload,
    ImportCsv,
    Reload,
    LayoutToText,
    LayoutFromText,
    ExportText,
}

/// Everything the shell reacts to
#[derive(Debug)]
pub enum Command {
    Press(Button),
    ClickNode(GridPoint),
    ConnectNodes(GridPoint, GridPoint),
    CancelConnect,
    ClickPanel(PanelKey),
    ClickFace { face: FaceKey, modifier: bool },
    SelectArtist(String),
    HighlightSection(Option<SectionId>),
    /// Hover emphasis for one artist's faces
    HighlightArtist(Option<String>),
    SetLabel { face: FaceKey, text: String },
    SetText(String),
    ZoomIn,
    ZoomOut,
    CsvLoaded(String),
    LayoutLoaded(Vec<u8>),
    ServerSaved(Result<String, AllocatorError>),
    ServerLoaded(Result<SavedMap, AllocatorError>),
}

/// I/O the shell asks its host to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PickCsv,
    PickLayout,
    ExportLayout(Vec<u8>),
    ExportText(Vec<u8>),
    Upload(Endpoint, SavePayload),
    Fetch(Endpoint),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Application state and mode controller for the allocator
#[derive(Debug, Clone)]
pub struct Allocator {
    map: ShowMap,
    logic: PanelLogic,
    interactor: Interactor,
    endpoint: Endpoint,
    noun: String,
    mode: Mode,
    status: Option<Status>,
    unsaved_changes: bool,
    highlight: Highlight,
    /// Face being labelled and the label being typed
    label_target: Option<(FaceKey, String)>,
    text_block: String,
}

impl Allocator {
    pub fn new(settings: &AllocatorSettings) -> Self {
        let map = ShowMap::new(settings.grid_width, settings.grid_height);
        let mut logic = PanelLogic::new();
        logic.build_sections(&map, false);
        Allocator {
            map,
            logic,
            interactor: Interactor::new(),
            endpoint: settings.endpoint(),
            noun: settings.panels_or_tables.clone(),
            mode: Mode::Normal,
            status: None,
            unsaved_changes: false,
            highlight: Highlight::None,
            label_target: None,
            text_block: String::new(),
        }
    }

    pub fn map(&self) -> &ShowMap {
        &self.map
    }

    pub fn logic(&self) -> &PanelLogic {
        &self.logic
    }

    pub fn interactor(&self) -> &Interactor {
        &self.interactor
    }

    pub fn interactor_mut(&mut self) -> &mut Interactor {
        &mut self.interactor
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn noun(&self) -> &str {
        &self.noun
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn highlight(&self) -> &Highlight {
        &self.highlight
    }

    pub fn label_target(&self) -> Option<&(FaceKey, String)> {
        self.label_target.as_ref()
    }

    pub fn text_block(&self) -> &str {
        &self.text_block
    }

    /// Request for the saved map; the host performs it at start-up
    pub fn initial_fetch(&self) -> Option<Effect> {
        (!self.endpoint.base_url.is_empty()).then(|| Effect::Fetch(self.endpoint.clone()))
    }

    pub fn face_shades(&self) -> BTreeMap<FaceKey, FaceShade> {
        self.logic.face_shades(&self.map, &self.highlight)
    }

    /// Buttons shown for the current mode, in display order
    pub fn visible_buttons(&self) -> Vec<Button> {
        match self.mode {
            Mode::LoadSave => vec![
                Button::LoadSave,
                Button::SaveLayout,
                Button::ImportLayout,
                Button::Upload,
                Button::Load,
                Button::Save,
                Button::LayoutToText,
                Button::LayoutFromText,
                Button::ExportText,
                Button::ImportCsv,
                Button::Reload,
            ],
            Mode::ModifyLayout => vec![Button::Modify],
            Mode::LabelEdit => vec![Button::Rename],
            Mode::AssignSingle => {
                let mut buttons = vec![Button::AssignSingle];
                if self
                    .logic
                    .manual_artist()
                    .is_some_and(|artist| !artist.panels.is_empty())
                {
                    buttons.push(Button::UnassignSingle);
                }
                buttons
            }
            Mode::Normal => {
                let mut buttons = vec![Button::LoadSave, Button::Modify];
                if self.logic.needs_recalculation() {
                    buttons.push(Button::Recalculate);
                } else {
                    buttons.extend([Button::Rename, Button::AssignAll]);
                }
                buttons
            }
        }
    }

    pub fn button_label(&self, button: Button) -> String {
        match button {
            Button::LoadSave => "Load/Save".to_string(),
            Button::Modify => match self.mode {
                Mode::ModifyLayout if self.logic.needs_recalculation() => {
                    "Done Modifying (will require recalculation)".to_string()
                }
                Mode::ModifyLayout => "Done Modifying".to_string(),
                _ => "Modify Layout".to_string(),
            },
            Button::Rename => match self.mode {
                Mode::LabelEdit => "Done Labeling".to_string(),
                _ => "Modify Labels".to_string(),
            },
            Button::SaveLayout => "Export Layout as JSON".to_string(),
            Button::ImportLayout => "Import Layout JSON".to_string(),
            Button::AssignAll => "Assign All Artists".to_string(),
            Button::AssignSingle => self.logic.manual_assignee_label(),
            Button::UnassignSingle => match self.logic.manual_artist() {
                Some(artist) => format!("Unassign All for {}", artist.name),
                None => "Unassign All for Artist".to_string(),
            },
            Button::Recalculate => "Recalculate Free Space".to_string(),
            Button::Load => "Load Assignments".to_string(),
            Button::Save => "Save Current Assignment".to_string(),
            Button::Upload => "Upload".to_string(),
            Button::ImportCsv => "Import CSV".to_string(),
            Button::Reload => "Reload from Server".to_string(),
            Button::LayoutToText => "Layout as Text".to_string(),
            Button::LayoutFromText => "Load Layout Text".to_string(),
            Button::ExportText => "Download Text".to_string(),
        }
    }

    /// Applies one command. Returns the I/O the host must carry out.
    pub fn dispatch(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Press(button) => return self.press(button),
            Command::ClickNode(point) => self.click_node(point),
            Command::ConnectNodes(start, end) => {
                if self.mode == Mode::ModifyLayout {
                    self.map.cancel_pending();
                    self.map.activate(start);
                    self.click_node(end);
                }
            }
            Command::CancelConnect => {
                self.map.cancel_pending();
                self.interactor.cancel();
            }
            Command::ClickPanel(key) => {
                if self.mode == Mode::ModifyLayout && self.map.change_panel_usability(&key) {
                    self.layout_changed();
                }
            }
            Command::ClickFace { face, modifier } => self.click_face(face, modifier),
            Command::SelectArtist(id) => {
                if matches!(self.mode, Mode::Normal | Mode::AssignSingle) {
                    self.logic.toggle_manual_assignee(&id);
                    self.sync_assign_mode();
                }
            }
            Command::HighlightSection(section) => {
                self.highlight = section.map_or(Highlight::None, Highlight::Section);
            }
            Command::HighlightArtist(artist) => {
                self.highlight = artist.map_or(Highlight::None, Highlight::Artist);
            }
            Command::SetLabel { face, text } => {
                if self.map.set_face_label(&face, &text) {
                    self.unsaved_changes = true;
                }
                if let Some((target, draft)) = &mut self.label_target {
                    if *target == face {
                        *draft = text;
                    }
                }
            }
            Command::SetText(text) => self.text_block = text,
            Command::ZoomIn => self.interactor.zoom_in(),
            Command::ZoomOut => self.interactor.zoom_out(),
            Command::CsvLoaded(data) => {
                let artists = serializer::roster_from_csv(&data);
                self.text_block = serializer::artists_to_text(&artists, false);
                self.replace_roster(artists);
            }
            Command::LayoutLoaded(bytes) => match LayoutFile::from_bytes(&bytes) {
                Ok(layout) => {
                    let placed = layout.apply_to(&mut self.map);
                    self.rebuild(false);
                    self.unsaved_changes = true;
                    self.status = Some(Status::Info(format!("Imported {} panels", placed)));
                }
                Err(e) => {
                    log::error!("Failed to import layout: {}", e);
                    self.status = Some(Status::Error(AllocatorError::from(e).to_string()));
                }
            },
            Command::ServerSaved(result) => match result {
                Ok(message) => {
                    log::info!("Map saved: {}", message);
                    self.unsaved_changes = false;
                    self.status = Some(Status::Info(message));
                }
                Err(e) => {
                    log::error!("Save failed: {}", e);
                    self.status = Some(Status::Error(e.to_string()));
                }
            },
            Command::ServerLoaded(result) => match result {
                Ok(saved) => self.apply_saved(saved),
                Err(e) => {
                    log::error!("Load failed: {}", e);
                    self.status = Some(Status::Error(e.to_string()));
                }
            },
        }
        Vec::new()
    }

    fn press(&mut self, button: Button) -> Vec<Effect> {
        if !self.visible_buttons().contains(&button) {
            log::debug!("Ignoring hidden button {:?}", button);
            return Vec::new();
        }
        match button {
            Button::Modify => {
                self.mode = if self.mode == Mode::ModifyLayout {
                    Mode::Normal
                } else {
                    Mode::ModifyLayout
                };
                self.map.cancel_pending();
                self.interactor.cancel();
            }
            Button::Rename => {
                let labelling = self.mode != Mode::LabelEdit;
                self.logic.set_label_mode(labelling);
                self.label_target = None;
                self.mode = if labelling {
                    Mode::LabelEdit
                } else {
                    Mode::Normal
                };
            }
            Button::LoadSave => {
                self.mode = if self.mode == Mode::LoadSave {
                    Mode::Normal
                } else {
                    Mode::LoadSave
                };
            }
            Button::AssignSingle => {
                self.logic.clear_manual_assignee();
                self.sync_assign_mode();
            }
            Button::UnassignSingle => {
                if let Some(id) = self.logic.manual_artist().map(|artist| artist.id.clone()) {
                    self.logic.clear_assignment(&id);
                    self.unsaved_changes = true;
                }
            }
            Button::Recalculate => self.rebuild(false),
            Button::AssignAll => {
                let report = self.logic.assign_all();
                self.unsaved_changes = true;
                self.status = Some(if report.short.is_empty() {
                    Status::Info(format!("Assigned {} artists", report.satisfied))
                } else {
                    Status::Info(format!(
                        "Assigned {} artists, {} could not be fully placed",
                        report.satisfied,
                        report.short.len()
                    ))
                });
            }
            Button::Load => {
                let artists = serializer::artists_from_text(&self.text_block);
                self.replace_roster(artists);
            }
            Button::Save => {
                self.text_block = serializer::artists_to_text(self.logic.artists(), true);
            }
            Button::ExportText => {
                return vec![Effect::ExportText(self.text_block.clone().into_bytes())]
            }
            Button::LayoutToText => {
                self.text_block = serializer::layout_to_text(&self.map);
            }
            Button::LayoutFromText => {
                let panels = serializer::layout_from_text(&self.text_block);
                self.map.clear();
                let mut placed = 0;
                for (key, panel) in panels {
                    if self.map.insert_panel(key, panel) {
                        placed += 1;
                    }
                }
                self.rebuild(false);
                self.unsaved_changes = true;
                self.status = Some(Status::Info(format!("Loaded {} {}s", placed, self.noun)));
            }
            Button::SaveLayout => match LayoutFile::from_map(&self.map).to_bytes() {
                Ok(bytes) => return vec![Effect::ExportLayout(bytes)],
                Err(e) => self.status = Some(Status::Error(AllocatorError::from(e).to_string())),
            },
            Button::ImportLayout => return vec![Effect::PickLayout],
            Button::ImportCsv => return vec![Effect::PickCsv],
            Button::Upload => match serializer::save_payload(&self.map, self.logic.artists()) {
                Ok(payload) => return vec![Effect::Upload(self.endpoint.clone(), payload)],
                Err(e) => self.status = Some(Status::Error(e.to_string())),
            },
            Button::Reload => return vec![Effect::Fetch(self.endpoint.clone())],
        }
        Vec::new()
    }

    fn click_node(&mut self, point: GridPoint) {
        if self.mode != Mode::ModifyLayout {
            return;
        }
        if let ActivateOutcome::Toggled { created, removed } = self.map.activate(point) {
            if created + removed > 0 {
                self.layout_changed();
            }
        }
    }

    fn click_face(&mut self, face: FaceKey, modifier: bool) {
        if !matches!(self.mode, Mode::Normal | Mode::AssignSingle | Mode::LabelEdit) {
            return;
        }
        match self.logic.manual_assign(&self.map, face, modifier) {
            ManualOutcome::Label(face) => {
                let current = self.map.face_label(&face).unwrap_or_default().to_string();
                self.label_target = Some((face, current));
            }
            ManualOutcome::Selected(_) => self.sync_assign_mode(),
            ManualOutcome::Added | ManualOutcome::Removed => self.unsaved_changes = true,
            ManualOutcome::Full => {
                log::debug!("Artist already has every face they need");
            }
            ManualOutcome::Ignored => (),
        }
    }

    fn sync_assign_mode(&mut self) {
        if matches!(self.mode, Mode::Normal | Mode::AssignSingle) {
            self.mode = if self.logic.manual_artist().is_some() {
                Mode::AssignSingle
            } else {
                Mode::Normal
            };
        }
    }

    fn layout_changed(&mut self) {
        self.logic.set_recalculation(true);
        self.unsaved_changes = true;
    }

    fn rebuild(&mut self, preserve: bool) {
        self.logic.build_sections(&self.map, preserve);
        self.map.clear_created();
        self.highlight = Highlight::None;
    }

    fn replace_roster(&mut self, artists: Vec<ArtistAssignment>) {
        let count = artists.len();
        self.logic.set_artists(artists);
        self.rebuild(false);
        self.logic.assign_all();
        self.mode = Mode::Normal;
        self.unsaved_changes = true;
        self.status = Some(Status::Info(format!("Loaded {} artists", count)));
    }

    fn apply_saved(&mut self, saved: SavedMap) {
        let placed = saved.panels.apply_to(&mut self.map);
        let artists = saved.assignments.0.len();
        self.logic.set_artists(saved.assignments.0);
        self.rebuild(true);
        self.text_block = serializer::artists_to_text(self.logic.artists(), false);
        self.mode = Mode::Normal;
        self.unsaved_changes = false;
        log::info!("Loaded saved map with {} panels and {} artists", placed, artists);
        self.status = Some(Status::Info(format!(
            "Loaded {} {}s and {} artists",
            placed, self.noun, artists
        )));
    }
}
