//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use eframe::egui;

use crate::grid::GridPoint;

/// Pointer travel in pixels before a press counts as a drag
pub const DRAG_THRESHOLD: f32 = 10.0;
pub const MIN_ZOOM: u32 = 1;

/// Pointer input, already hit-tested against the grid nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        pos: egui::Pos2,
        node: Option<GridPoint>,
        modifier: bool,
    },
    PointerMove {
        pos: egui::Pos2,
        node: Option<GridPoint>,
    },
    PointerUp {
        pos: egui::Pos2,
    },
    ModifierUp,
}

/// A completed gesture for the shell to act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Press and release without dragging
    Click { pos: egui::Pos2, modifier: bool },
    /// Modifier drag from one node to another
    Connect { start: GridPoint, end: GridPoint },
    /// A connecting drag was abandoned; highlights must be dropped
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum DragState {
    #[default]
    Idle,
    Panning {
        origin: egui::Pos2,
        last: egui::Pos2,
        modifier: bool,
        dragged: bool,
    },
    Connecting {
        start: GridPoint,
        origin: egui::Pos2,
        last: Option<GridPoint>,
        dragged: bool,
    },
}

/// Screen placement of the map: pan offset plus integer zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: egui::Vec2,
    pub zoom: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            offset: egui::Vec2::ZERO,
            zoom: MIN_ZOOM,
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.offset + world.to_vec2() * self.zoom as f32
    }

    pub fn to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.offset) / self.zoom as f32).to_pos2()
    }

    pub fn scale(&self) -> f32 {
        self.zoom as f32
    }
}

/// Pan, zoom and connect state machine for the map canvas
#[derive(Debug, Clone, Default)]
pub struct Interactor {
    viewport: Viewport,
    state: DragState,
}

impl Interactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> u32 {
        self.viewport.zoom
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom += 1;
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom = self.viewport.zoom.saturating_sub(1).max(MIN_ZOOM);
        if self.viewport.zoom == MIN_ZOOM {
            self.viewport.offset = egui::Vec2::ZERO;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, DragState::Connecting { .. })
    }

    /// Nodes that should carry a ring while a connecting drag is in progress
    pub fn highlighted_nodes(&self) -> Vec<GridPoint> {
        match self.state {
            DragState::Connecting { start, last, .. } => {
                let mut nodes = vec![start];
                if let Some(last) = last.filter(|last| *last != start) {
                    nodes.push(last);
                }
                nodes
            }
            _ => Vec::new(),
        }
    }

    /// Drops any gesture in progress
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn handle(&mut self, event: InputEvent) -> Option<Gesture> {
        match (self.state, event) {
            (DragState::Idle, InputEvent::PointerDown { pos, node, modifier }) => {
                self.state = match node {
                    Some(start) if modifier => DragState::Connecting {
                        start,
                        origin: pos,
                        last: None,
                        dragged: false,
                    },
                    _ => DragState::Panning {
                        origin: pos,
                        last: pos,
                        modifier,
                        dragged: false,
                    },
                };
                None
            }
            (
                DragState::Panning {
                    origin,
                    last,
                    modifier,
                    dragged,
                },
                InputEvent::PointerMove { pos, .. },
            ) => {
                let dragged = dragged || origin.distance(pos) >= DRAG_THRESHOLD;
                let last = if dragged {
                    self.viewport.offset += pos - last;
                    pos
                } else {
                    last
                };
                self.state = DragState::Panning {
                    origin,
                    last,
                    modifier,
                    dragged,
                };
                None
            }
            (
                DragState::Connecting {
                    start,
                    origin,
                    last,
                    dragged,
                },
                InputEvent::PointerMove { pos, node },
            ) => {
                let dragged = dragged || origin.distance(pos) >= DRAG_THRESHOLD;
                let last = if dragged { node.or(last) } else { last };
                self.state = DragState::Connecting {
                    start,
                    origin,
                    last,
                    dragged,
                };
                None
            }
            (DragState::Panning { modifier, dragged, .. }, InputEvent::PointerUp { pos }) => {
                self.state = DragState::Idle;
                (!dragged).then_some(Gesture::Click { pos, modifier })
            }
            (
                DragState::Connecting {
                    start,
                    last,
                    dragged,
                    ..
                },
                InputEvent::PointerUp { pos },
            ) => {
                self.state = DragState::Idle;
                match last {
                    _ if !dragged => Some(Gesture::Click {
                        pos,
                        modifier: true,
                    }),
                    Some(end) if end != start => Some(Gesture::Connect { start, end }),
                    _ => Some(Gesture::Cancelled),
                }
            }
            (DragState::Connecting { .. }, InputEvent::ModifierUp) => {
                log::debug!("Connecting drag cancelled");
                self.state = DragState::Idle;
                Some(Gesture::Cancelled)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(x: f32, y: f32, node: Option<GridPoint>, modifier: bool) -> InputEvent {
        InputEvent::PointerDown {
            pos: egui::pos2(x, y),
            node,
            modifier,
        }
    }

    fn moved(x: f32, y: f32, node: Option<GridPoint>) -> InputEvent {
        InputEvent::PointerMove {
            pos: egui::pos2(x, y),
            node,
        }
    }

    fn up(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerUp {
            pos: egui::pos2(x, y),
        }
    }

    #[test]
    fn short_press_is_a_click() {
        let mut interactor = Interactor::new();
        interactor.handle(down(5.0, 5.0, None, false));
        interactor.handle(moved(8.0, 5.0, None));
        assert_eq!(
            interactor.handle(up(8.0, 5.0)),
            Some(Gesture::Click {
                pos: egui::pos2(8.0, 5.0),
                modifier: false
            })
        );
        assert_eq!(interactor.viewport().offset, egui::Vec2::ZERO);
    }

    #[test]
    fn dragging_pans_the_viewport() {
        let mut interactor = Interactor::new();
        interactor.handle(down(0.0, 0.0, None, false));
        interactor.handle(moved(20.0, 0.0, None));
        interactor.handle(moved(30.0, 10.0, None));
        assert_eq!(interactor.handle(up(30.0, 10.0)), None);
        assert_eq!(interactor.viewport().offset, egui::vec2(30.0, 10.0));
        assert!(interactor.is_idle());
    }

    #[test]
    fn modifier_drag_connects_two_nodes() {
        let start = GridPoint::new(1, 1);
        let end = GridPoint::new(4, 1);
        let mut interactor = Interactor::new();
        interactor.handle(down(10.0, 10.0, Some(start), true));
        interactor.handle(moved(40.0, 10.0, Some(end)));
        assert_eq!(interactor.highlighted_nodes(), vec![start, end]);
        assert_eq!(
            interactor.handle(up(40.0, 10.0)),
            Some(Gesture::Connect { start, end })
        );
        assert!(interactor.highlighted_nodes().is_empty());
    }

    #[test]
    fn releasing_modifier_clears_highlights() {
        let mut interactor = Interactor::new();
        interactor.handle(down(10.0, 10.0, Some(GridPoint::new(2, 2)), true));
        interactor.handle(moved(40.0, 10.0, Some(GridPoint::new(5, 2))));
        assert_eq!(
            interactor.handle(InputEvent::ModifierUp),
            Some(Gesture::Cancelled)
        );
        assert!(interactor.highlighted_nodes().is_empty());
        assert!(interactor.is_idle());
    }

    #[test]
    fn dragging_back_to_the_start_node_cancels() {
        let start = GridPoint::new(2, 2);
        let mut interactor = Interactor::new();
        interactor.handle(down(10.0, 10.0, Some(start), true));
        interactor.handle(moved(40.0, 10.0, Some(start)));
        assert_eq!(interactor.handle(up(12.0, 10.0)), Some(Gesture::Cancelled));
        assert!(interactor.highlighted_nodes().is_empty());
    }

    #[test]
    fn zoom_never_drops_below_one_and_resets_pan() {
        let mut interactor = Interactor::new();
        interactor.zoom_in();
        interactor.zoom_in();
        interactor.handle(down(0.0, 0.0, None, false));
        interactor.handle(moved(50.0, 50.0, None));
        interactor.handle(up(50.0, 50.0));
        interactor.zoom_out();
        assert_eq!(interactor.zoom(), 2);
        assert_ne!(interactor.viewport().offset, egui::Vec2::ZERO);
        interactor.zoom_out();
        interactor.zoom_out();
        assert_eq!(interactor.zoom(), MIN_ZOOM);
        assert_eq!(interactor.viewport().offset, egui::Vec2::ZERO);
    }

    #[test]
    fn viewport_transforms_are_inverse() {
        let viewport = Viewport {
            offset: egui::vec2(12.0, -4.0),
            zoom: 3,
        };
        let origin = egui::pos2(100.0, 50.0);
        let world = egui::pos2(7.5, 9.0);
        let back = viewport.to_world(origin, viewport.to_screen(origin, world));
        assert!((back - world).length() < 1e-4);
    }
}
