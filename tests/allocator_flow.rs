//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use art_show_allocator::grid::GridPoint;
use art_show_allocator::panel_logic::longest_linear_run;
use art_show_allocator::serializer::SavedMap;
use art_show_allocator::{Allocator, AllocatorSettings, Button, Command, Effect, Mode, Status};

fn allocator(width: i32, height: i32) -> Allocator {
    Allocator::new(&AllocatorSettings {
        grid_width: width,
        grid_height: height,
        server_url: "https://example.org/art_show".to_string(),
        ..Default::default()
    })
}

/// Draws a straight wall between two nodes in modify-layout mode
fn draw_wall(allocator: &mut Allocator, from: (i32, i32), to: (i32, i32)) {
    allocator.dispatch(Command::Press(Button::Modify));
    assert_eq!(allocator.mode(), Mode::ModifyLayout);
    allocator.dispatch(Command::ClickNode(GridPoint::new(from.0, from.1)));
    allocator.dispatch(Command::ClickNode(GridPoint::new(to.0, to.1)));
    allocator.dispatch(Command::Press(Button::Modify));
    allocator.dispatch(Command::Press(Button::Recalculate));
    assert!(!allocator.logic().needs_recalculation());
}

fn load_roster(allocator: &mut Allocator, text: &str) {
    allocator.dispatch(Command::Press(Button::LoadSave));
    allocator.dispatch(Command::SetText(text.to_string()));
    allocator.dispatch(Command::Press(Button::Load));
    assert_eq!(allocator.mode(), Mode::Normal);
}

#[test]
fn three_panel_strip_gives_two_sections_of_three() {
    let mut allocator = allocator(5, 3);
    draw_wall(&mut allocator, (1, 2), (4, 2));

    assert_eq!(allocator.map().panels().len(), 3);
    let sections = allocator.logic().sections();
    assert_eq!(sections.len(), 2);
    assert!(sections.values().all(|faces| faces.len() == 3));
    assert!(allocator.has_unsaved_changes());
}

#[test]
fn fitting_roster_leaves_nobody_short() {
    let mut allocator = allocator(5, 3);
    draw_wall(&mut allocator, (1, 2), (4, 2));
    load_roster(&mut allocator, "1•Ann•3\n2•Bob•2\n3•Cy•1");

    assert!(allocator
        .logic()
        .artists()
        .iter()
        .all(|artist| artist.shortfall() == 0));
    assert_eq!(allocator.logic().free_capacity(), 0);
    assert!(allocator.logic().unassigned_list("panel").is_empty());
    assert_eq!(allocator.logic().assigned_list("panel").len(), 3);
}

#[test]
fn wide_request_takes_a_straight_pair_and_splits_the_rest() {
    let mut allocator = allocator(5, 3);
    draw_wall(&mut allocator, (1, 2), (4, 2));
    load_roster(&mut allocator, "1•Ann•2•wide|2");

    let artist = allocator.logic().artist("1").unwrap();
    let faces: Vec<_> = artist.panels.iter().copied().collect();
    assert_eq!(faces.len(), 2);
    assert_eq!(longest_linear_run(&faces), 2);

    let mut free: Vec<usize> = allocator
        .logic()
        .free_sections()
        .values()
        .map(Vec::len)
        .collect();
    free.sort();
    assert_eq!(free, vec![1, 3]);
}

#[test]
fn upload_payload_reloads_into_a_fresh_allocator() {
    let mut source = allocator(5, 3);
    draw_wall(&mut source, (1, 2), (4, 2));
    load_roster(&mut source, "1•Ann•2\n2•Bob•2");

    source.dispatch(Command::Press(Button::LoadSave));
    let effects = source.dispatch(Command::Press(Button::Upload));
    let Some(Effect::Upload(_, payload)) = effects.into_iter().next() else {
        panic!("upload produced no request");
    };

    let body = serde_json::json!({
        "panels": payload.panels,
        "assignments": payload.assignments,
    });
    let saved = SavedMap::from_bytes(&serde_json::to_vec(&body).unwrap()).unwrap();

    let mut target = allocator(5, 3);
    target.dispatch(Command::ServerLoaded(Ok(saved)));

    assert_eq!(target.map().panels(), source.map().panels());
    assert_eq!(target.logic().artists(), source.logic().artists());
    assert!(!target.has_unsaved_changes());
    assert!(matches!(target.status(), Some(Status::Info(_))));
}
