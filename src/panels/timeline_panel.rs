use crate::command::Command;
use crate::layer::RowId;
use crate::AnimateApp;
use egui::{Color32, Sense, Stroke, Vec2};

const CELL_SIZE: Vec2 = Vec2::new(18.0, 22.0);
const ROW_LABEL_WIDTH: f32 = 110.0;
/// Empty frames shown past the last folder
const TRAILING_FRAMES: u32 = 12;

const FOLDER_COLOR: Color32 = Color32::from_rgb(96, 125, 139);
const FOLDER_START_COLOR: Color32 = Color32::from_rgb(120, 160, 180);
const CURRENT_FRAME_COLOR: Color32 = Color32::from_rgb(255, 167, 38);

enum TimelineAction {
    Command(Command),
    Scrub(u32),
    TogglePlay,
    SetFps(u32),
    SetLooping(bool),
}

pub fn timeline_panel(app: &mut AnimateApp, ctx: &egui::Context) {
    let mut actions = Vec::new();

    egui::TopBottomPanel::bottom("timeline_panel")
        .resizable(true)
        .default_height(180.0)
        .show(ctx, |ui| {
            transport(app, ui, &mut actions);
            ui.separator();
            folder_controls(app, ui, &mut actions);
            ui.separator();
            egui::ScrollArea::both().show(ui, |ui| {
                frame_grid(app, ui, &mut actions);
            });
        });

    for action in actions {
        match action {
            TimelineAction::Command(command) => app.execute_command(command),
            TimelineAction::Scrub(frame) => app.scrub(frame),
            TimelineAction::TogglePlay => app.playback_mut().toggle(),
            TimelineAction::SetFps(fps) => app.playback_mut().set_fps(fps),
            TimelineAction::SetLooping(looping) => app.playback_mut().set_looping(looping),
        }
    }
}

fn transport(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut Vec<TimelineAction>) {
    let playback = app.playback();
    ui.horizontal(|ui| {
        let label = if playback.is_playing() { "⏸ Pause" } else { "▶ Play" };
        if ui.button(label).clicked() {
            actions.push(TimelineAction::TogglePlay);
        }
        if ui.button("⏮").clicked() {
            actions.push(TimelineAction::Scrub(1));
        }

        let mut looping = playback.is_looping();
        if ui.checkbox(&mut looping, "Loop").changed() {
            actions.push(TimelineAction::SetLooping(looping));
        }

        let mut fps = playback.fps();
        ui.label("FPS");
        if ui.add(egui::DragValue::new(&mut fps).range(1..=60)).changed() {
            actions.push(TimelineAction::SetFps(fps));
        }

        ui.separator();
        ui.label(format!(
            "Frame {} / {}",
            app.session().current_frame(),
            playback.max_frame()
        ));
    });
}

fn folder_controls(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut Vec<TimelineAction>) {
    let session = app.session();
    ui.horizontal(|ui| {
        if ui.button("Add row").clicked() {
            let name = format!("Row {}", session.document().timeline().rows().len() + 1);
            actions.push(TimelineAction::Command(Command::AddRow { name }));
        }

        let Some(row) = session.selected_row() else {
            return;
        };
        if ui.button("Delete row").clicked() {
            actions.push(TimelineAction::Command(Command::DeleteRow(row)));
        }
        ui.separator();

        match session.selected_folder() {
            Some(folder) => {
                let id = folder.id();
                let mut length = folder.length;
                ui.label("Length");
                if ui.add(egui::DragValue::new(&mut length).range(1..=999)).changed() {
                    actions.push(TimelineAction::Command(Command::SetFolderLength { folder: id, length }));
                }
                if ui.button("Delete frame").clicked() {
                    actions.push(TimelineAction::Command(Command::DeleteFolder(id)));
                }
            }
            None => {
                if ui.button("Add frame").clicked() {
                    actions.push(TimelineAction::Command(Command::AddFolder {
                        row,
                        frame_index: session.current_frame(),
                        length: 1,
                    }));
                }
            }
        }
    });
}

fn frame_grid(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut Vec<TimelineAction>) {
    let session = app.session();
    let timeline = session.document().timeline();
    let current = session.current_frame();
    let frames = timeline.max_frame().max(current) + TRAILING_FRAMES;

    ui.spacing_mut().item_spacing.x = 1.0;
    for row in timeline.rows() {
        ui.horizontal(|ui| {
            let selected = session.selected_row() == Some(row.id);
            let label = egui::SelectableLabel::new(selected, row.name.as_str());
            if ui.add_sized([ROW_LABEL_WIDTH, CELL_SIZE.y], label).clicked() && !selected {
                actions.push(TimelineAction::Command(Command::SelectRow(Some(row.id))));
            }
            for frame in 1..=frames {
                frame_cell(app, row.id, frame, ui, actions);
            }
        });
    }
}

fn frame_cell(app: &AnimateApp, row: RowId, frame: u32, ui: &mut egui::Ui, actions: &mut Vec<TimelineAction>) {
    let session = app.session();
    let (rect, response) = ui.allocate_exact_size(CELL_SIZE, Sense::click());
    let folder = session.document().timeline().folder_at(row, frame);

    let fill = match folder {
        Some(folder) if folder.frame_index == frame => FOLDER_START_COLOR,
        Some(_) => FOLDER_COLOR,
        None => ui.visuals().extreme_bg_color,
    };
    let painter = ui.painter();
    painter.rect_filled(rect, 0.0, fill);
    if frame == session.current_frame() {
        painter.rect_stroke(rect, 0.0, Stroke::new(2.0, CURRENT_FRAME_COLOR));
    }
    if folder.is_some_and(|folder| folder.image_url.is_some() && folder.frame_index == frame) {
        painter.circle_filled(rect.center(), 3.0, Color32::WHITE);
    }

    let response = match folder {
        Some(folder) => response.on_hover_text(folder.name.clone().unwrap_or_else(|| folder.id().to_string())),
        None => response,
    };
    if response.clicked() {
        if session.selected_row() != Some(row) {
            actions.push(TimelineAction::Command(Command::SelectRow(Some(row))));
        }
        actions.push(TimelineAction::Scrub(frame));
    }
}
