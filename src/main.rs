// Copyright 2024 - The Open-Agriculture Developers
// SPDX-License-Identifier: GPL-3.0-or-later
// Authors: Daan Steenbergen
use art_show_allocator::panel_logic::{ArtistListEntry, Highlight};
use art_show_allocator::server;
use art_show_allocator::{
    legend, Allocator, AllocatorError, AllocatorSettings, Command, Effect, MapView, Mode, Status,
    LAYOUT_FILE_NAME, SETTINGS_FILE,
};
use eframe::egui;
use std::future::Future;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

const TEXT_FILE_NAME: &str = "artists.txt";

enum FileDialogReason {
    ImportCsv,
    ImportLayout,
}

pub struct AllocatorApp {
    allocator: Allocator,
    file_dialog_reason: Option<FileDialogReason>,
    file_channel: (Sender<Vec<u8>>, Receiver<Vec<u8>>),
    /// Results of server requests, delivered as commands
    server_channel: (Sender<Command>, Receiver<Command>),
    show_close_confirm: bool,
    allowed_to_close: bool,
}

impl AllocatorApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = match AllocatorSettings::from_file(SETTINGS_FILE) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings, {}: {}", SETTINGS_FILE, e);
                AllocatorSettings::default()
            }
        };

        let mut app = AllocatorApp {
            allocator: Allocator::new(&settings),
            file_dialog_reason: None,
            file_channel: std::sync::mpsc::channel(),
            server_channel: std::sync::mpsc::channel(),
            show_close_confirm: false,
            allowed_to_close: false,
        };
        if let Some(effect) = app.allocator.initial_fetch() {
            app.perform(effect, &cc.egui_ctx);
        }
        app
    }

    /// Dispatch a command and carry out whatever I/O it asks for
    fn run(&mut self, command: Command, ctx: &egui::Context) {
        for effect in self.allocator.dispatch(command) {
            self.perform(effect, ctx);
        }
    }

    fn perform(&mut self, effect: Effect, ctx: &egui::Context) {
        match effect {
            Effect::PickCsv => self.open_file_dialog(FileDialogReason::ImportCsv, ctx),
            Effect::PickLayout => self.open_file_dialog(FileDialogReason::ImportLayout, ctx),
            Effect::ExportLayout(contents) => {
                save_file(LAYOUT_FILE_NAME, ("Layout", "json"), contents)
            }
            Effect::ExportText(contents) => {
                save_file(TEXT_FILE_NAME, ("Text", "txt"), contents)
            }
            Effect::Upload(endpoint, payload) => {
                let sender = self.server_channel.0.clone();
                let ctx = ctx.clone();
                execute(async move {
                    #[cfg(not(target_arch = "wasm32"))]
                    let result = server::save_map(&endpoint, &payload);
                    #[cfg(target_arch = "wasm32")]
                    let result = server::save_map(&endpoint, &payload).await;
                    let _ = sender.send(Command::ServerSaved(result));
                    ctx.request_repaint();
                });
            }
            Effect::Fetch(endpoint) => {
                let sender = self.server_channel.0.clone();
                let ctx = ctx.clone();
                execute(async move {
                    #[cfg(not(target_arch = "wasm32"))]
                    let result = server::load_map(&endpoint);
                    #[cfg(target_arch = "wasm32")]
                    let result = server::load_map(&endpoint).await;
                    let _ = sender.send(Command::ServerLoaded(result));
                    ctx.request_repaint();
                });
            }
        }
    }

    /// Open a file dialog
    fn open_file_dialog(&mut self, reason: FileDialogReason, ctx: &egui::Context) {
        let (name, extension) = match reason {
            FileDialogReason::ImportCsv => ("Artist roster", "csv"),
            FileDialogReason::ImportLayout => ("Layout", "json"),
        };
        self.file_dialog_reason = Some(reason);

        let sender = self.file_channel.0.clone();
        let task = rfd::AsyncFileDialog::new()
            .add_filter(name, &[extension])
            .pick_file();
        let ctx = ctx.clone();
        execute(async move {
            let file = task.await;
            if let Some(file) = file {
                let content = file.read().await;
                let _ = sender.send(content);
            }
            ctx.request_repaint();
        });
    }

    /// Handle a file loaded in the file dialog
    fn handle_file_loaded(&mut self, ctx: &egui::Context) {
        if let Ok(content) = self.file_channel.1.try_recv() {
            match self.file_dialog_reason.take() {
                Some(FileDialogReason::ImportCsv) => match String::from_utf8(content) {
                    Ok(text) => self.run(Command::CsvLoaded(text), ctx),
                    Err(e) => log::error!("Failed to import roster: {}", AllocatorError::from(e)),
                },
                Some(FileDialogReason::ImportLayout) => {
                    self.run(Command::LayoutLoaded(content), ctx)
                }
                None => (),
            }
        }
    }

    fn handle_server_results(&mut self, ctx: &egui::Context) {
        while let Ok(command) = self.server_channel.1.try_recv() {
            self.run(command, ctx);
        }
    }

    fn close_guard(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.viewport().close_requested())
            && self.allocator.has_unsaved_changes()
            && !self.allowed_to_close
        {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_close_confirm = true;
        }

        if self.show_close_confirm {
            egui::Window::new("Unsaved changes")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("The map has changes that were not uploaded. Close anyway?");
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        if ui.button("Close").clicked() {
                            self.show_close_confirm = false;
                            self.allowed_to_close = true;
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                        if ui.button("Cancel").clicked() {
                            self.show_close_confirm = false;
                        }
                    });
                });
        }
    }
}

/// Open a file dialog to save an export
fn save_file(name: &str, (filter, extension): (&str, &str), contents: Vec<u8>) {
    let task = rfd::AsyncFileDialog::new()
        .set_file_name(name)
        .add_filter(filter, &[extension])
        .save_file();
    execute(async move {
        let file = task.await;
        if let Some(file) = file {
            _ = file.write(&contents).await;
        }
    });
}

/// Selectable artist rows; returns the id under the pointer, if any
fn artist_list(
    ui: &mut egui::Ui,
    entries: &[ArtistListEntry],
    selected: Option<&str>,
    commands: &mut Vec<Command>,
) -> Option<String> {
    let mut hovered = None;
    for entry in entries {
        let response = ui.selectable_label(selected == Some(entry.id.as_str()), &entry.label);
        if response.clicked() {
            commands.push(Command::SelectArtist(entry.id.clone()));
        }
        if response.hovered() {
            hovered = Some(entry.id.clone());
        }
    }
    hovered
}

impl eframe::App for AllocatorApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.style_mut(|style| {
            style.interaction.selectable_labels = false;
        });

        self.handle_file_loaded(ctx);
        self.handle_server_results(ctx);
        self.close_guard(ctx);

        let mut commands = Vec::new();
        let mut clear_status = false;

        egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                egui::widgets::global_theme_preference_buttons(ui);
                ui.separator();

                for button in self.allocator.visible_buttons() {
                    if ui.button(self.allocator.button_label(button)).clicked() {
                        commands.push(Command::Press(button));
                    }
                }

                ui.separator();
                if ui.button("➖").on_hover_text("Zoom out").clicked() {
                    commands.push(Command::ZoomOut);
                }
                ui.label(format!("{}x", self.allocator.interactor().zoom()));
                if ui.button("➕").on_hover_text("Zoom in").clicked() {
                    commands.push(Command::ZoomIn);
                }
            });
        });

        if let Some(status) = self.allocator.status() {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    match status {
                        Status::Info(message) => ui.label(message),
                        Status::Error(message) => ui.colored_label(ui.visuals().error_fg_color, message),
                    };
                    if ui.small_button("✖").clicked() {
                        clear_status = true;
                    }
                });
            });
        }

        egui::SidePanel::left("artist_panel")
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| match self.allocator.mode() {
                    Mode::LoadSave => {
                        ui.heading("Artists");
                        ui.label("One artist per line: id•name•needed, then any faces and wide|n");
                        let mut text = self.allocator.text_block().to_string();
                        if ui
                            .add(
                                egui::TextEdit::multiline(&mut text)
                                    .code_editor()
                                    .desired_rows(20)
                                    .desired_width(f32::INFINITY),
                            )
                            .changed()
                        {
                            commands.push(Command::SetText(text));
                        }
                    }
                    Mode::LabelEdit => {
                        ui.heading("Labels");
                        match self.allocator.label_target() {
                            Some((face, draft)) => {
                                ui.label(format!("Label for {}", face));
                                let mut text = draft.clone();
                                if ui.text_edit_singleline(&mut text).changed() {
                                    commands.push(Command::SetLabel { face: *face, text });
                                }
                            }
                            None => {
                                ui.label("Click a face on the map to label it");
                            }
                        }
                    }
                    Mode::ModifyLayout => {
                        ui.heading("Layout");
                        ui.label("Click two grid points to add or remove the panels between them.");
                        ui.label("Shift-drag between grid points does the same in one gesture.");
                        ui.label("Click a panel to cycle which of its sides can hold art.");
                    }
                    Mode::Normal | Mode::AssignSingle => {
                        let noun = self.allocator.noun().to_string();
                        let logic = self.allocator.logic();
                        let selected = logic.manual_artist().map(|artist| artist.id.as_str());

                        ui.heading("Assigned");
                        let mut hovered =
                            artist_list(ui, &logic.assigned_list(&noun), selected, &mut commands);
                        ui.separator();
                        ui.heading("Unassigned");
                        hovered = hovered.or(artist_list(
                            ui,
                            &logic.unassigned_list(&noun),
                            selected,
                            &mut commands,
                        ));

                        let highlighted = match self.allocator.highlight() {
                            Highlight::Artist(id) => Some(id),
                            _ => None,
                        };
                        if hovered.is_some() && hovered.as_ref() != highlighted
                            || hovered.is_none() && highlighted.is_some()
                        {
                            commands.push(Command::HighlightArtist(hovered));
                        }

                        ui.separator();
                        egui::CollapsingHeader::new(format!(
                            "Free space ({} {}s)",
                            logic.free_capacity(),
                            noun
                        ))
                        .default_open(false)
                        .show(ui, |ui| {
                            for (id, faces) in logic.free_sections() {
                                let selected = *self.allocator.highlight() == Highlight::Section(*id);
                                let plural = if faces.len() == 1 { "" } else { "s" };
                                if ui
                                    .selectable_label(
                                        selected,
                                        format!("Section {} ({} {}{})", id, faces.len(), noun, plural),
                                    )
                                    .clicked()
                                {
                                    commands.push(Command::HighlightSection(
                                        (!selected).then_some(*id),
                                    ));
                                }
                            }
                        });
                    }
                });

                ui.separator();
                for (caption, color) in legend(self.allocator.mode()) {
                    ui.horizontal(|ui| {
                        let (rect, _) =
                            ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 2.0, color);
                        ui.label(caption);
                    });
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add(MapView::new(&mut self.allocator, &mut commands));
        });

        if clear_status {
            self.allocator.clear_status();
        }
        for command in commands {
            self.run(command, ctx);
        }
    }
}

// When compiling natively:
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    // Initialize logging for native builds
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([600.0, 440.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Art Show Allocator",
        native_options,
        Box::new(|cc| Ok(Box::new(AllocatorApp::new(cc)))),
    )
    .ok();
}

// When compiling to web using trunk:
#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast as _;

    let web_options = eframe::WebOptions::default();

    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("art_show_allocator_canvas_id")
            .expect("Failed to find art_show_allocator_canvas_id")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("art_show_allocator_canvas_id was not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(AllocatorApp::new(cc)))),
            )
            .await;

        // Remove the loading text and spinner:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p> The app has crashed. See the developer console for details. </p>",
                    );
                    panic!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}

#[cfg(target_arch = "wasm32")]
fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
