//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use eframe::egui;
use eframe::egui::Color32;

use crate::allocator::{Allocator, Command, Mode};
use crate::grid::{FaceKey, GridPoint, Orientation, PanelKey, Side};
use crate::interactor::{Gesture, InputEvent, Viewport};
use crate::panel_logic::FaceShade;
use crate::show_map::{LayoutMetrics, ShowMap, SideShade};

/// Face depth as a fraction of the smaller cell dimension
const FACE_DEPTH: f32 = 0.18;
/// Gap left at each end of a face so corners stay readable
const FACE_INSET: f32 = 0.06;
/// Node hit radius as a fraction of the smaller cell dimension
const NODE_RADIUS: f32 = 0.3;
const PANEL_STROKE: f32 = 2.0;

const UNUSED_COLOR: Color32 = Color32::from_rgb(190, 190, 190);
const AVAILABLE_COLOR: Color32 = Color32::from_rgb(110, 190, 110);
const FREE_COLOR: Color32 = Color32::from_rgb(225, 225, 235);
const CREATED_COLOR: Color32 = Color32::from_rgb(240, 170, 60);
const ALLOCATED_COLOR: Color32 = Color32::from_rgb(90, 140, 220);
const SELECTED_COLOR: Color32 = Color32::from_rgb(210, 70, 160);
const SECTION_COLOR: Color32 = Color32::from_rgb(250, 220, 80);
const RING_COLOR: Color32 = Color32::from_rgb(220, 40, 40);

/// Legend entries: caption and swatch, in display order
pub fn legend(mode: Mode) -> Vec<(&'static str, Color32)> {
    if mode == Mode::ModifyLayout {
        vec![
            ("Valid Panel to be Allocated", AVAILABLE_COLOR),
            ("Unused Side", UNUSED_COLOR),
        ]
    } else {
        vec![
            ("Unassigned Panel", FREE_COLOR),
            ("New Panel (requires recalculation)", CREATED_COLOR),
            ("Allocated Panel", ALLOCATED_COLOR),
            ("Selected Panel", SELECTED_COLOR),
            ("Highlighted Section", SECTION_COLOR),
        ]
    }
}

fn shade_color(shade: FaceShade) -> Color32 {
    match shade {
        FaceShade::Unsectioned => UNUSED_COLOR,
        FaceShade::Free => FREE_COLOR,
        FaceShade::Created => CREATED_COLOR,
        FaceShade::Allocated => ALLOCATED_COLOR,
        FaceShade::SelectedArtist => SELECTED_COLOR,
        FaceShade::SectionHighlight => SECTION_COLOR,
    }
}

fn cell_size(metrics: &LayoutMetrics) -> f32 {
    metrics.cell_width.min(metrics.cell_height)
}

/// Area a face covers, in unzoomed map coordinates
pub fn face_rect(metrics: &LayoutMetrics, face: &FaceKey) -> egui::Rect {
    let a = metrics.node_position(face.panel.a());
    let b = metrics.node_position(face.panel.b());
    let depth = FACE_DEPTH * cell_size(metrics);
    let inset = FACE_INSET * cell_size(metrics);
    let (nx, ny) = face.side.normal();
    let (from, to) = match face.panel.orientation() {
        Orientation::Horizontal => (a + egui::vec2(inset, 0.0), b - egui::vec2(inset, 0.0)),
        Orientation::Vertical => (a + egui::vec2(0.0, inset), b - egui::vec2(0.0, inset)),
    };
    let offset = egui::vec2(nx as f32, ny as f32) * depth;
    egui::Rect::from_two_pos(from, to + offset)
}

/// Nearest grid node within reach of a map position
pub fn node_at(map: &ShowMap, metrics: &LayoutMetrics, world: egui::Pos2) -> Option<GridPoint> {
    let x = (world.x / metrics.cell_width).round() as i32;
    let y = (world.y / metrics.cell_height).round() as i32;
    let point = GridPoint::new(x, y);
    let reach = NODE_RADIUS * cell_size(metrics);
    (map.contains(point) && metrics.node_position(point).distance(world) <= reach).then_some(point)
}

/// The usable face under a map position
pub fn face_at(map: &ShowMap, metrics: &LayoutMetrics, world: egui::Pos2) -> Option<FaceKey> {
    map.usable_faces()
        .find(|face| face_rect(metrics, face).contains(world))
}

/// The panel whose faces cover a map position, usable or not
pub fn panel_at(map: &ShowMap, metrics: &LayoutMetrics, world: egui::Pos2) -> Option<PanelKey> {
    map.panels().iter().find_map(|(key, panel)| {
        panel
            .orientation
            .sides()
            .into_iter()
            .any(|side| face_rect(metrics, &key.face(side)).contains(world))
            .then_some(*key)
    })
}

/// Canvas for the show map. Model changes are pushed as [`Command`]s for the
/// caller to dispatch once the frame is drawn.
pub struct MapView<'a> {
    allocator: &'a mut Allocator,
    commands: &'a mut Vec<Command>,
}

impl<'a> MapView<'a> {
    pub fn new(allocator: &'a mut Allocator, commands: &'a mut Vec<Command>) -> Self {
        MapView {
            allocator,
            commands,
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, rect: egui::Rect, metrics: &LayoutMetrics, response: &egui::Response) {
        let (pointer, pressed, released, shift) = ui.input(|i| {
            (
                i.pointer.interact_pos().or(i.pointer.hover_pos()),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.modifiers.shift,
            )
        });
        let modifying = self.allocator.mode() == Mode::ModifyLayout;
        let viewport = *self.allocator.interactor().viewport();
        let node_under = |pos: egui::Pos2| {
            if modifying {
                node_at(self.allocator.map(), metrics, viewport.to_world(rect.min, pos))
            } else {
                None
            }
        };

        let mut events = Vec::new();
        if let Some(pos) = pointer {
            if pressed && response.hovered() {
                events.push(InputEvent::PointerDown {
                    pos,
                    node: node_under(pos),
                    modifier: shift,
                });
            } else if !self.allocator.interactor().is_idle() {
                events.push(InputEvent::PointerMove {
                    pos,
                    node: node_under(pos),
                });
            }
            if released {
                events.push(InputEvent::PointerUp { pos });
            }
        }
        if !shift {
            events.push(InputEvent::ModifierUp);
        }

        for event in events {
            if let Some(gesture) = self.allocator.interactor_mut().handle(event) {
                let viewport = *self.allocator.interactor().viewport();
                self.gesture_to_command(gesture, rect, metrics, &viewport);
            }
        }
    }

    fn gesture_to_command(&mut self, gesture: Gesture, rect: egui::Rect, metrics: &LayoutMetrics, viewport: &Viewport) {
        let map = self.allocator.map();
        let command = match gesture {
            Gesture::Connect { start, end } => Some(Command::ConnectNodes(start, end)),
            Gesture::Cancelled => Some(Command::CancelConnect),
            Gesture::Click { pos, modifier } => {
                let world = viewport.to_world(rect.min, pos);
                if self.allocator.mode() == Mode::ModifyLayout {
                    node_at(map, metrics, world)
                        .map(Command::ClickNode)
                        .or_else(|| panel_at(map, metrics, world).map(Command::ClickPanel))
                } else {
                    face_at(map, metrics, world).map(|face| Command::ClickFace { face, modifier })
                }
            }
        };
        self.commands.extend(command);
    }

    fn paint(&self, painter: &egui::Painter, rect: egui::Rect, metrics: &LayoutMetrics) {
        let map = self.allocator.map();
        let viewport = self.allocator.interactor().viewport();
        let scale = viewport.scale();
        let to_screen = |world: egui::Pos2| viewport.to_screen(rect.min, world);
        let modifying = self.allocator.mode() == Mode::ModifyLayout;

        painter.rect_filled(rect, 0.0, Color32::WHITE);

        if modifying {
            for node in map.nodes() {
                painter.circle_filled(
                    to_screen(metrics.node_position(node)),
                    1.5 * scale,
                    Color32::DARK_GRAY,
                );
            }
        }

        let shades = self.allocator.face_shades();
        for (key, panel) in map.panels() {
            let sides = panel.orientation.sides();
            let modify_shading = map.panel_shading(key);
            for (index, side) in sides.into_iter().enumerate() {
                let face = key.face(side);
                let color = match (modifying, modify_shading) {
                    (true, Some(shading)) => match shading[index] {
                        SideShade::Available => AVAILABLE_COLOR,
                        SideShade::Unused => UNUSED_COLOR,
                    },
                    _ => match shades.get(&face) {
                        Some(shade) => shade_color(*shade),
                        None => continue,
                    },
                };
                let world = face_rect(metrics, &face);
                let screen = egui::Rect::from_min_max(to_screen(world.min), to_screen(world.max));
                painter.rect_filled(screen, 0.0, color);
                if let Some(label) = map.face_label(&face) {
                    paint_label(painter, screen, side, label, scale);
                }
            }
            painter.line_segment(
                [
                    to_screen(metrics.node_position(key.a())),
                    to_screen(metrics.node_position(key.b())),
                ],
                egui::Stroke::new(PANEL_STROKE * scale, Color32::BLACK),
            );
        }

        let mut rings = self.allocator.interactor().highlighted_nodes();
        rings.extend(map.pending());
        for node in rings {
            painter.circle_stroke(
                to_screen(metrics.node_position(node)),
                NODE_RADIUS * cell_size(metrics) * scale,
                egui::Stroke::new(2.0, RING_COLOR),
            );
        }
    }
}

fn paint_label(painter: &egui::Painter, face: egui::Rect, side: Side, label: &str, scale: f32) {
    let anchor = match side {
        Side::Up => egui::Align2::CENTER_BOTTOM,
        Side::Down => egui::Align2::CENTER_TOP,
        Side::Left => egui::Align2::RIGHT_CENTER,
        Side::Right => egui::Align2::LEFT_CENTER,
    };
    let (nx, ny) = side.normal();
    let edge = face.center() + egui::vec2(nx as f32 * face.width(), ny as f32 * face.height()) * 0.5;
    painter.text(
        edge,
        anchor,
        label,
        egui::FontId::proportional(9.0 * scale),
        Color32::BLACK,
    );
}

impl egui::Widget for MapView<'_> {
    fn ui(mut self, ui: &mut egui::Ui) -> egui::Response {
        let metrics = self.allocator.map().metrics(ui.available_width());
        let (rect, response) = ui.allocate_exact_size(metrics.size(), egui::Sense::click_and_drag());
        self.handle_input(ui, rect, &metrics, &response);
        self.paint(&ui.painter_at(rect), rect, &metrics);
        response
    }
}
