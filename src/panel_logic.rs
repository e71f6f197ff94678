//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::grid::{FaceKey, PanelKey, Side};
use crate::show_map::ShowMap;

pub type SectionId = usize;

/// One artist and the faces they hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistAssignment {
    pub id: String,
    pub name: String,
    pub needed: usize,
    /// Every face held, automatic and manual
    pub panels: BTreeSet<FaceKey>,
    /// Faces pinned by hand; always a subset of `panels`
    pub manual: BTreeSet<FaceKey>,
    /// Minimum length of a straight run the automatic faces must include
    pub wide: Option<usize>,
    pub extra_info: String,
}

impl ArtistAssignment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, needed: usize) -> Self {
        ArtistAssignment {
            id: id.into(),
            name: name.into(),
            needed,
            panels: BTreeSet::new(),
            manual: BTreeSet::new(),
            wide: None,
            extra_info: String::new(),
        }
    }

    pub fn with_wide(mut self, wide: Option<usize>) -> Self {
        self.wide = wide;
        self
    }

    /// Faces still missing
    pub fn shortfall(&self) -> usize {
        self.needed.saturating_sub(self.panels.len())
    }
}

/// Who clicks on faces currently act for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
    Artist(String),
    /// Clicks pick a face to label instead of assigning it
    Labels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualOutcome {
    /// Label mode: the face to edit
    Label(FaceKey),
    /// The clicked face's owner became the manual assignee
    Selected(String),
    Added,
    Removed,
    /// The assignee already has every face they need
    Full,
    Ignored,
}

/// Summary of one `assign_all` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    pub satisfied: usize,
    /// Artists still short after allocation, in allocation order
    pub short: Vec<String>,
}

/// What to emphasise when shading faces
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    Artist(String),
    Section(SectionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceShade {
    /// Usable but not part of any section yet
    Unsectioned,
    Free,
    Created,
    Allocated,
    SelectedArtist,
    SectionHighlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistListEntry {
    pub id: String,
    pub label: String,
}

/// How one artist will be served from the free space
#[derive(Debug, Clone, PartialEq, Eq)]
struct AllocationPlan {
    source: SectionId,
    taken: Vec<FaceKey>,
    /// What stays behind in `source`; `None` drops the section
    remaining: Option<Vec<FaceKey>>,
    /// Remainders that become new free sections
    splits: Vec<Vec<FaceKey>>,
}

/// Section decomposition and artist allocation over a [`ShowMap`]
#[derive(Debug, Clone)]
pub struct PanelLogic {
    sections: BTreeMap<SectionId, Vec<FaceKey>>,
    free_sections: BTreeMap<SectionId, Vec<FaceKey>>,
    /// Free section a face returns to when released
    face_home: HashMap<FaceKey, SectionId>,
    next_section_id: SectionId,
    artists: Vec<ArtistAssignment>,
    needs_recalculation: bool,
    manual_assignee: Option<Assignee>,
}

impl Default for PanelLogic {
    fn default() -> Self {
        PanelLogic {
            sections: BTreeMap::new(),
            free_sections: BTreeMap::new(),
            face_home: HashMap::new(),
            next_section_id: 0,
            artists: Vec::new(),
            needs_recalculation: true,
            manual_assignee: None,
        }
    }
}

impl PanelLogic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &BTreeMap<SectionId, Vec<FaceKey>> {
        &self.sections
    }

    pub fn free_sections(&self) -> &BTreeMap<SectionId, Vec<FaceKey>> {
        &self.free_sections
    }

    pub fn free_capacity(&self) -> usize {
        self.free_sections.values().map(Vec::len).sum()
    }

    /// The section a face was placed in by the last decomposition
    pub fn section_of(&self, face: &FaceKey) -> Option<SectionId> {
        self.sections
            .iter()
            .find(|(_, faces)| faces.contains(face))
            .map(|(id, _)| *id)
    }

    pub fn artists(&self) -> &[ArtistAssignment] {
        &self.artists
    }

    pub fn artist(&self, id: &str) -> Option<&ArtistAssignment> {
        self.artists.iter().find(|artist| artist.id == id)
    }

    fn artist_index(&self, id: &str) -> Option<usize> {
        self.artists.iter().position(|artist| artist.id == id)
    }

    /// Replaces the roster. Assignments carried by the records are kept.
    pub fn set_artists(&mut self, artists: Vec<ArtistAssignment>) {
        self.artists = artists;
        self.manual_assignee = None;
        self.needs_recalculation = true;
    }

    pub fn needs_recalculation(&self) -> bool {
        self.needs_recalculation
    }

    pub fn set_recalculation(&mut self, recalculate: bool) {
        self.needs_recalculation = recalculate;
    }

    pub fn manual_assignee(&self) -> Option<&Assignee> {
        self.manual_assignee.as_ref()
    }

    pub fn is_label_mode(&self) -> bool {
        self.manual_assignee == Some(Assignee::Labels)
    }

    pub fn manual_artist(&self) -> Option<&ArtistAssignment> {
        match &self.manual_assignee {
            Some(Assignee::Artist(id)) => self.artist(id),
            _ => None,
        }
    }

    pub fn set_label_mode(&mut self, enabled: bool) {
        self.manual_assignee = enabled.then_some(Assignee::Labels);
    }

    /// Selects an artist for manual assignment, or deselects them if they
    /// were already selected. Returns the new assignee.
    pub fn toggle_manual_assignee(&mut self, artist_id: &str) -> Option<&Assignee> {
        if self.artist(artist_id).is_none() {
            log::debug!("No artist with id {}", artist_id);
            return self.manual_assignee.as_ref();
        }
        let selected = Assignee::Artist(artist_id.to_string());
        if self.manual_assignee.as_ref() == Some(&selected) {
            self.manual_assignee = None;
        } else {
            self.manual_assignee = Some(selected);
        }
        self.manual_assignee.as_ref()
    }

    pub fn clear_manual_assignee(&mut self) {
        self.manual_assignee = None;
    }

    /// Faces pinned by hand across all artists
    pub fn pinned_faces(&self) -> HashSet<FaceKey> {
        self.artists
            .iter()
            .flat_map(|artist| artist.manual.iter().copied())
            .collect()
    }

    fn committed_faces(&self) -> HashSet<FaceKey> {
        self.artists
            .iter()
            .flat_map(|artist| artist.panels.iter().chain(artist.manual.iter()).copied())
            .collect()
    }

    pub fn owner_of(&self, face: &FaceKey) -> Option<&str> {
        self.artists
            .iter()
            .find(|artist| artist.panels.contains(face))
            .map(|artist| artist.id.as_str())
    }

    /// Recomputes sections from the map and resets the free space.
    /// With `preserve` set, automatic assignments survive (used right after a
    /// saved map is loaded); otherwise only manual faces are kept.
    pub fn build_sections(&mut self, map: &ShowMap, preserve: bool) {
        for artist in &mut self.artists {
            artist.manual.retain(|face| map.is_face_usable(face));
            if preserve {
                artist.panels.retain(|face| map.is_face_usable(face));
                artist.panels.extend(artist.manual.iter().copied());
            } else {
                artist.panels = artist.manual.clone();
            }
        }

        let pinned = self.pinned_faces();
        let candidates = decompose(map, &pinned);
        self.sections = resolve_longest(candidates)
            .into_iter()
            .enumerate()
            .collect();
        self.reset_free_space(&self.committed_faces());
        self.needs_recalculation = false;
        log::info!(
            "Built {} sections holding {} free faces",
            self.sections.len(),
            self.free_capacity()
        );
    }

    fn reset_free_space(&mut self, committed: &HashSet<FaceKey>) {
        self.face_home.clear();
        self.free_sections.clear();
        for (id, faces) in &self.sections {
            for face in faces {
                self.face_home.insert(*face, *id);
            }
            let free: Vec<FaceKey> = faces
                .iter()
                .filter(|face| !committed.contains(face))
                .copied()
                .collect();
            if !free.is_empty() {
                self.free_sections.insert(*id, free);
            }
        }
        self.next_section_id = self.sections.keys().next_back().map_or(0, |id| id + 1);
    }

    fn fresh_section(&mut self, faces: Vec<FaceKey>) -> SectionId {
        let id = self.next_section_id;
        self.next_section_id += 1;
        for face in &faces {
            self.face_home.insert(*face, id);
        }
        self.free_sections.insert(id, faces);
        id
    }

    /// Artists in allocation order: most faces needed first, load order on ties
    fn allocation_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.artists.len()).collect();
        order.sort_by_key(|&index| Reverse(self.artists[index].needed));
        order
    }

    /// Greedy bulk allocation of every artist's outstanding faces.
    /// Order dependent and not optimal: an artist that cannot be served is
    /// left short and never retried.
    pub fn assign_all(&mut self) -> AllocationReport {
        for artist in &mut self.artists {
            artist.panels = artist.manual.clone();
        }
        self.reset_free_space(&self.pinned_faces());

        let mut report = AllocationReport::default();
        for index in self.allocation_order() {
            let artist = &self.artists[index];
            let count = artist.shortfall();
            if count > 0 {
                if let Some(plan) = plan_allocation(&self.free_sections, count, artist.wide) {
                    log::debug!(
                        "Artist {} takes {} faces from section {}",
                        artist.id,
                        plan.taken.len(),
                        plan.source
                    );
                    self.artists[index].panels.extend(plan.taken.iter().copied());
                    self.apply_plan(plan);
                }
            }
            let artist = &self.artists[index];
            if artist.shortfall() == 0 {
                report.satisfied += 1;
            } else {
                report.short.push(artist.id.clone());
            }
        }
        log::info!(
            "Allocated {} artists, {} short",
            report.satisfied,
            report.short.len()
        );
        report
    }

    fn apply_plan(&mut self, plan: AllocationPlan) {
        match plan.remaining {
            Some(remaining) if !remaining.is_empty() => {
                self.free_sections.insert(plan.source, remaining);
            }
            _ => {
                self.free_sections.remove(&plan.source);
            }
        }
        for split in plan.splits {
            self.fresh_section(split);
        }
    }

    /// Releases every face held by an artist. Each released face becomes its
    /// own free section until the next recalculation.
    pub fn clear_assignment(&mut self, artist_id: &str) -> usize {
        let Some(index) = self.artist_index(artist_id) else {
            return 0;
        };
        let artist = &mut self.artists[index];
        let had_manual = !artist.manual.is_empty();
        let mut released: BTreeSet<FaceKey> = std::mem::take(&mut artist.panels);
        released.append(&mut artist.manual);
        if had_manual {
            self.needs_recalculation = true;
        }
        let count = released.len();
        for face in released {
            self.fresh_section(vec![face]);
        }
        log::info!("Released {} faces from artist {}", count, artist_id);
        count
    }

    /// Toggles a face on or off the manual assignee
    pub fn manual_assign(&mut self, map: &ShowMap, face: FaceKey, switch_owner: bool) -> ManualOutcome {
        let artist_id = match &self.manual_assignee {
            Some(Assignee::Labels) => return ManualOutcome::Label(face),
            Some(Assignee::Artist(id)) if !switch_owner => id.clone(),
            _ => {
                let Some(owner) = self.owner_of(&face).map(str::to_string) else {
                    return ManualOutcome::Ignored;
                };
                self.manual_assignee = Some(Assignee::Artist(owner.clone()));
                return ManualOutcome::Selected(owner);
            }
        };
        if !map.is_face_usable(&face) {
            log::debug!("Not a valid face: {}", face);
            return ManualOutcome::Ignored;
        }
        let Some(index) = self.artist_index(&artist_id) else {
            self.manual_assignee = None;
            return ManualOutcome::Ignored;
        };

        if self.artists[index].panels.contains(&face) {
            let artist = &mut self.artists[index];
            artist.panels.remove(&face);
            artist.manual.remove(&face);
            self.return_face(face);
            self.needs_recalculation = true;
            return ManualOutcome::Removed;
        }
        if self.owner_of(&face).is_some() {
            return ManualOutcome::Ignored;
        }
        let artist = &mut self.artists[index];
        if artist.panels.len() >= artist.needed {
            return ManualOutcome::Full;
        }
        artist.panels.insert(face);
        artist.manual.insert(face);
        for faces in self.free_sections.values_mut() {
            faces.retain(|free| *free != face);
        }
        self.free_sections.retain(|_, faces| !faces.is_empty());
        self.needs_recalculation = true;
        ManualOutcome::Added
    }

    /// Puts a released face back in its home free section, at the position the
    /// decomposition gave it. A drained home section is reopened under its id.
    fn return_face(&mut self, face: FaceKey) {
        let Some(home) = self.face_home.get(&face).copied() else {
            self.fresh_section(vec![face]);
            return;
        };
        let order = self.sections.get(&home);
        let faces = self.free_sections.entry(home).or_default();
        if faces.contains(&face) {
            return;
        }
        faces.push(face);
        if let Some(order) = order {
            faces.sort_by_key(|f| order.iter().position(|o| o == f).unwrap_or(usize::MAX));
        }
    }

    pub fn assigned_list(&self, noun: &str) -> Vec<ArtistListEntry> {
        self.artists
            .iter()
            .filter(|artist| !artist.panels.is_empty())
            .map(|artist| ArtistListEntry {
                id: artist.id.clone(),
                label: list_label(artist, artist.panels.len(), noun),
            })
            .collect()
    }

    pub fn unassigned_list(&self, noun: &str) -> Vec<ArtistListEntry> {
        self.artists
            .iter()
            .filter(|artist| artist.shortfall() > 0)
            .map(|artist| ArtistListEntry {
                id: artist.id.clone(),
                label: list_label(artist, artist.shortfall(), noun),
            })
            .collect()
    }

    /// Caption of the assign-single button
    pub fn manual_assignee_label(&self) -> String {
        match &self.manual_assignee {
            Some(Assignee::Artist(id)) => match self.artist(id) {
                Some(artist) if !artist.panels.is_empty() => "Finish Assigning".to_string(),
                Some(artist) => format!("Assigning Artist: {}", artist.name),
                None => format!("Assigning Artist: {}", id),
            },
            _ => "Assigning Artist: ".to_string(),
        }
    }

    /// Display state of every usable face. Does not change any state.
    pub fn face_shades(&self, map: &ShowMap, highlight: &Highlight) -> BTreeMap<FaceKey, FaceShade> {
        let selected_artist = match (highlight, &self.manual_assignee) {
            (Highlight::Artist(id), _) => Some(id.as_str()),
            (_, Some(Assignee::Artist(id))) => Some(id.as_str()),
            _ => None,
        };
        let free: HashSet<&FaceKey> = self.free_sections.values().flatten().collect();
        let created = map.created_panels();
        let mut shades = BTreeMap::new();
        for face in map.usable_faces() {
            let mut shade = if free.contains(&face) {
                FaceShade::Free
            } else {
                FaceShade::Unsectioned
            };
            if let Some(owner) = self.owner_of(&face) {
                shade = if Some(owner) == selected_artist {
                    FaceShade::SelectedArtist
                } else {
                    FaceShade::Allocated
                };
            }
            if created.contains(&face.panel) {
                shade = FaceShade::Created;
            }
            if let Highlight::Section(id) = highlight {
                if self.free_sections.get(id).is_some_and(|faces| faces.contains(&face)) {
                    shade = FaceShade::SectionHighlight;
                }
            }
            shades.insert(face, shade);
        }
        shades
    }
}

fn list_label(artist: &ArtistAssignment, count: usize, noun: &str) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!(
        "{} ({} {}{}){}",
        artist.name, count, noun, plural, artist.extra_info
    )
}

/// Length of the longest run of consecutive faces on the same side
pub fn longest_linear_run(faces: &[FaceKey]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut last_side: Option<Side> = None;
    for face in faces {
        if last_side == Some(face.side) {
            current += 1;
        } else {
            last_side = Some(face.side);
            current = 1;
        }
        longest = longest.max(current);
    }
    longest
}

/// Next face along the same visual edge of the space a face looks into.
///
/// At each end of the panel the walk may continue straight on along a
/// collinear panel with the same side, unless a perpendicular panel closes the
/// space at that junction, in which case it turns the corner onto that panel.
fn next_face(
    map: &ShowMap,
    current: &FaceKey,
    visited: &HashSet<FaceKey>,
    pinned: &HashSet<FaceKey>,
) -> Option<FaceKey> {
    let panel = current.panel;
    let normal = current.side.normal();
    let (ax, ay) = panel.orientation().along();
    let ends = [(panel.a(), (-ax, -ay)), (panel.b(), (ax, ay))];

    let level = ends.iter().filter_map(|&(end, tangent)| {
        let closing = PanelKey::from_step(end, normal)?;
        if map.has_panel(&closing) {
            return None;
        }
        FaceKey::new(PanelKey::from_step(end, tangent)?, current.side)
    });
    let corner = ends.iter().filter_map(|&(end, (tx, ty))| {
        let turn = PanelKey::from_step(end, normal)?;
        FaceKey::new(turn, Side::from_normal((-tx, -ty))?)
    });

    level
        .chain(corner)
        .find(|face| map.is_face_usable(face) && !visited.contains(face) && !pinned.contains(face))
}

fn walk(map: &ShowMap, start: FaceKey, pinned: &HashSet<FaceKey>) -> Vec<FaceKey> {
    let mut visited = HashSet::from([start]);
    let mut run = vec![start];
    let mut current = start;
    while let Some(next) = next_face(map, &current, &visited, pinned) {
        visited.insert(next);
        run.push(next);
        current = next;
    }
    run
}

/// One candidate run per usable, unpinned face, walked outward from it
fn decompose(map: &ShowMap, pinned: &HashSet<FaceKey>) -> Vec<Vec<FaceKey>> {
    map.usable_faces()
        .filter(|face| !pinned.contains(face))
        .map(|face| walk(map, face, pinned))
        .collect()
}

/// Claims candidate runs longest first so every face ends up in exactly one
/// section. A run that lost faces to a longer one is split into its unclaimed
/// sub-runs, which compete again at their new length.
fn resolve_longest(candidates: Vec<Vec<FaceKey>>) -> Vec<Vec<FaceKey>> {
    let mut heap: BinaryHeap<(usize, Reverse<usize>, Reverse<usize>, Vec<FaceKey>)> = candidates
        .into_iter()
        .enumerate()
        .map(|(order, run)| (run.len(), Reverse(order), Reverse(0), run))
        .collect();
    let mut claimed: HashSet<FaceKey> = HashSet::new();
    let mut sections = Vec::new();

    while let Some((_, order, _, run)) = heap.pop() {
        if run.iter().all(|face| !claimed.contains(face)) {
            claimed.extend(run.iter().copied());
            sections.push(run);
            continue;
        }
        let fragments = run
            .split(|face| claimed.contains(face))
            .filter(|fragment| !fragment.is_empty());
        for (index, fragment) in fragments.enumerate() {
            heap.push((fragment.len(), order, Reverse(index), fragment.to_vec()));
        }
    }
    sections
}

/// Picks the faces for one artist without touching the free space
fn plan_allocation(
    free: &BTreeMap<SectionId, Vec<FaceKey>>,
    count: usize,
    wide: Option<usize>,
) -> Option<AllocationPlan> {
    if count == 0 {
        return None;
    }
    let wide_enough = |faces: &[FaceKey]| wide.map_or(true, |w| longest_linear_run(faces) >= w);

    if let Some((id, faces)) = free
        .iter()
        .find(|(_, faces)| faces.len() == count && wide_enough(faces))
    {
        return Some(AllocationPlan {
            source: *id,
            taken: faces.clone(),
            remaining: None,
            splits: Vec::new(),
        });
    }

    let mut candidates: Vec<(&SectionId, &Vec<FaceKey>)> =
        free.iter().filter(|(_, faces)| faces.len() >= count).collect();
    candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(b.0)));

    for (id, faces) in candidates {
        if wide.is_none() {
            return Some(AllocationPlan {
                source: *id,
                taken: faces[..count].to_vec(),
                remaining: Some(faces[count..].to_vec()),
                splits: Vec::new(),
            });
        }
        let Some(start) = (0..=faces.len() - count).find(|&s| wide_enough(&faces[s..s + count]))
        else {
            continue;
        };
        let splits = [&faces[..start], &faces[start + count..]]
            .into_iter()
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.to_vec())
            .collect();
        return Some(AllocationPlan {
            source: *id,
            taken: faces[start..start + count].to_vec(),
            remaining: None,
            splits,
        });
    }
    None
}
