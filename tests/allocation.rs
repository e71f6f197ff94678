//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::collections::HashSet;

use art_show_allocator::grid::{FaceKey, GridPoint, PanelKey, Usability};
use art_show_allocator::panel_logic::{ArtistAssignment, ManualOutcome, PanelLogic};
use art_show_allocator::show_map::ShowMap;
use proptest::prelude::*;

const GRID: i32 = 6;

fn usability(code: u8) -> Usability {
    match code {
        0 => Usability::None,
        1 => Usability::SideA,
        2 => Usability::SideB,
        _ => Usability::Both,
    }
}

/// Random panel toggles on a small grid: (x, y, horizontal, usability)
fn toggles() -> impl Strategy<Value = Vec<(i32, i32, bool, u8)>> {
    prop::collection::vec((1..GRID, 1..GRID, any::<bool>(), 0..4u8), 0..30)
}

fn roster() -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
    prop::collection::vec((1..5usize, prop::option::weighted(0.3, 1..4usize)), 0..6)
}

fn build_map(steps: &[(i32, i32, bool, u8)]) -> ShowMap {
    let mut map = ShowMap::new(GRID, GRID);
    for &(x, y, horizontal, code) in steps {
        let from = GridPoint::new(x, y);
        let to = if horizontal {
            GridPoint::new(x + 1, y)
        } else {
            GridPoint::new(x, y + 1)
        };
        map.toggle_panel(from, to, usability(code));
    }
    map
}

fn artists(roster: &[(usize, Option<usize>)]) -> Vec<ArtistAssignment> {
    roster
        .iter()
        .enumerate()
        .map(|(index, &(needed, wide))| {
            ArtistAssignment::new((index + 1).to_string(), format!("Artist {}", index + 1), needed)
                .with_wide(wide)
        })
        .collect()
}

fn assert_exact_cover(logic: &PanelLogic, map: &ShowMap) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for faces in logic.sections().values() {
        prop_assert!(!faces.is_empty());
        for face in faces {
            prop_assert!(map.is_face_usable(face), "{} is not usable", face);
            prop_assert!(seen.insert(*face), "{} is in two sections", face);
        }
    }
    let pinned = logic.pinned_faces();
    for face in map.usable_faces().filter(|face| !pinned.contains(face)) {
        prop_assert!(seen.contains(&face), "{} is in no section", face);
    }
    Ok(())
}

proptest! {
    #[test]
    fn sections_cover_every_usable_face_once(steps in toggles()) {
        let map = build_map(&steps);
        let mut logic = PanelLogic::new();
        logic.build_sections(&map, false);
        assert_exact_cover(&logic, &map)?;
        prop_assert_eq!(logic.free_capacity(), map.usable_faces().count());
    }

    #[test]
    fn toggling_a_new_panel_twice_changes_nothing(
        steps in toggles(),
        x in 1..GRID,
        y in 1..GRID,
        horizontal in any::<bool>(),
    ) {
        let mut map = build_map(&steps);
        let from = GridPoint::new(x, y);
        let to = if horizontal { GridPoint::new(x + 1, y) } else { GridPoint::new(x, y + 1) };
        let key = PanelKey::new(from, to).unwrap();
        prop_assume!(!map.has_panel(&key));

        let before = map.panels().clone();
        map.toggle_panel(from, to, Usability::Both);
        map.toggle_panel(from, to, Usability::Both);
        prop_assert_eq!(map.panels(), &before);
    }

    #[test]
    fn bulk_allocation_never_overfills_or_shares(steps in toggles(), roster in roster()) {
        let map = build_map(&steps);
        let mut logic = PanelLogic::new();
        logic.set_artists(artists(&roster));
        logic.build_sections(&map, false);
        let report = logic.assign_all();

        prop_assert_eq!(report.satisfied + report.short.len(), roster.len());
        let mut owned: HashSet<FaceKey> = HashSet::new();
        for artist in logic.artists() {
            prop_assert!(artist.panels.len() <= artist.needed);
            for face in &artist.panels {
                prop_assert!(map.is_face_usable(face));
                prop_assert!(owned.insert(*face), "{} held twice", face);
            }
        }
        for faces in logic.free_sections().values() {
            for face in faces {
                prop_assert!(!owned.contains(face), "{} is both free and held", face);
            }
        }
        prop_assert_eq!(logic.free_capacity() + owned.len(), map.usable_faces().count());
    }

    #[test]
    fn manual_toggle_is_reversible(
        steps in toggles(),
        roster in roster(),
        pick in any::<prop::sample::Index>(),
    ) {
        let map = build_map(&steps);
        let faces: Vec<FaceKey> = map.usable_faces().collect();
        prop_assume!(!faces.is_empty() && !roster.is_empty());

        let mut logic = PanelLogic::new();
        logic.set_artists(artists(&roster));
        logic.build_sections(&map, false);
        logic.assign_all();
        logic.toggle_manual_assignee("1");

        let face = faces[pick.index(faces.len())];
        let artists_before = logic.artists().to_vec();
        let capacity_before = logic.free_capacity();

        match logic.manual_assign(&map, face, false) {
            ManualOutcome::Added => {
                prop_assert_eq!(logic.free_capacity(), capacity_before - 1);
                prop_assert_eq!(logic.manual_assign(&map, face, false), ManualOutcome::Removed);
                prop_assert_eq!(logic.artists(), &artists_before[..]);
                prop_assert_eq!(logic.free_capacity(), capacity_before);
            }
            ManualOutcome::Removed => {
                prop_assert_eq!(logic.manual_assign(&map, face, false), ManualOutcome::Added);
                let artist = logic.artist("1").unwrap();
                prop_assert_eq!(&artist.panels, &artists_before[0].panels);
            }
            _ => {
                prop_assert_eq!(logic.artists(), &artists_before[..]);
            }
        }
    }
}
