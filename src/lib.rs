//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

mod allocator;
mod error;
pub mod grid;
pub mod interactor;
mod layout_file;
mod map_view;
pub mod panel_logic;
pub mod serializer;
pub mod server;
mod settings;
pub mod show_map;

pub use allocator::{Allocator, Button, Command, Effect, Mode, Status};
pub use error::AllocatorError;
pub use layout_file::{LayoutFile, PanelRecord, LAYOUT_FILE_NAME};
pub use map_view::{face_at, face_rect, legend, node_at, panel_at, MapView};
pub use settings::{AllocatorSettings, SETTINGS_FILE};
