use crate::command::{Command, ToolKind};
use crate::components::ToolButton;
use crate::export::ExportFormat;
use crate::layer::{LayerDirection, LayerRef};
use crate::state::{MAX_ZOOM, MIN_ZOOM};
use crate::tools::EraserMode;
use crate::AnimateApp;

#[derive(Default)]
struct PanelActions {
    commands: Vec<Command>,
    save: bool,
    load: bool,
    export_frame: bool,
    export_row: bool,
    export_format: Option<ExportFormat>,
}

pub fn tools_panel(app: &mut AnimateApp, ctx: &egui::Context) {
    let mut actions = PanelActions::default();

    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                tool_section(app, ui, &mut actions);
                ui.separator();
                history_section(app, ui, &mut actions);
                ui.separator();
                view_section(app, ui, &mut actions);
                ui.separator();
                layers_section(app, ui, &mut actions);
                ui.separator();
                scene_section(app, ui, &mut actions);

                if let Some(status) = app.status() {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

    for command in actions.commands {
        app.execute_command(command);
    }
    if let Some(format) = actions.export_format {
        app.set_export_format(format);
    }
    if actions.save {
        app.save_scene();
    }
    if actions.load {
        app.load_scene();
    }
    if actions.export_frame {
        app.export_current_frame();
    }
    if actions.export_row {
        app.export_selected_row();
    }
}

fn tool_section(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut PanelActions) {
    ui.heading("Tools");
    let session = app.session();
    let active = session.tool();

    ui.horizontal(|ui| {
        for tool in ToolKind::ALL {
            if ui.add(ToolButton::new(tool, tool == active)).clicked() && tool != active {
                log::info!("Tool selected from UI: {}", tool.label());
                actions.commands.push(Command::SetTool(tool));
            }
        }
    });

    let settings = session.settings();
    let mut color = settings.color;
    ui.horizontal(|ui| {
        ui.label("Color");
        if ui.color_edit_button_srgba(&mut color).changed() {
            actions.commands.push(Command::SetBrushColor(color));
        }
    });

    let mut brush_size = settings.brush_size;
    if ui
        .add(egui::Slider::new(&mut brush_size, 1.0..=64.0).text("Brush"))
        .changed()
    {
        actions.commands.push(Command::SetBrushSize(brush_size));
    }

    let mut eraser_size = settings.eraser_size;
    if ui
        .add(egui::Slider::new(&mut eraser_size, 1.0..=128.0).text("Eraser"))
        .changed()
    {
        actions.commands.push(Command::SetEraserSize(eraser_size));
    }

    ui.horizontal(|ui| {
        for (mode, label) in [(EraserMode::Precision, "Precision"), (EraserMode::Stroke, "Stroke")] {
            if ui.selectable_label(settings.eraser_mode == mode, label).clicked() {
                actions.commands.push(Command::SetEraserMode(mode));
            }
        }
    });
}

fn history_section(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut PanelActions) {
    let session = app.session();
    ui.horizontal(|ui| {
        if ui.add_enabled(session.can_undo(), egui::Button::new("Undo")).clicked() {
            actions.commands.push(Command::Undo);
        }
        if ui.add_enabled(session.can_redo(), egui::Button::new("Redo")).clicked() {
            actions.commands.push(Command::Redo);
        }
        ui.label(format!(
            "{} / {}",
            session.history().undo_len(),
            session.history().redo_len()
        ));
    });

    let has_selection = session.state().has_selection();
    ui.horizontal(|ui| {
        if ui.add_enabled(has_selection, egui::Button::new("Copy")).clicked() {
            actions.commands.push(Command::Copy);
        }
        if ui.add_enabled(has_selection, egui::Button::new("Cut")).clicked() {
            actions.commands.push(Command::Cut);
        }
        if ui
            .add_enabled(!session.clipboard().is_empty(), egui::Button::new("Paste"))
            .clicked()
        {
            actions.commands.push(Command::Paste);
        }
    });
    ui.horizontal(|ui| {
        if ui.add_enabled(has_selection, egui::Button::new("Duplicate")).clicked() {
            actions.commands.push(Command::Duplicate);
        }
        if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
            actions.commands.push(Command::DeleteSelection);
        }
    });
}

fn view_section(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut PanelActions) {
    let view = app.session().view();

    let mut onion_skin = view.onion_skin;
    if ui.checkbox(&mut onion_skin, "Onion skin").changed() {
        actions.commands.push(Command::SetOnionSkin(onion_skin));
    }
    let mut show_grid = view.show_grid;
    if ui.checkbox(&mut show_grid, "Grid").changed() {
        actions.commands.push(Command::SetShowGrid(show_grid));
    }
    let mut zoom = view.zoom;
    if ui
        .add(egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM).logarithmic(true).text("Zoom"))
        .changed()
    {
        actions.commands.push(Command::SetZoom(zoom));
    }
}

fn layers_section(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut PanelActions) {
    ui.heading("Layers");
    let session = app.session();
    let Some(folder) = session.selected_folder() else {
        ui.label("No frame folder at this frame");
        return;
    };
    let folder_id = folder.id();
    let document = session.document();

    if let Some(file_name) = &folder.file_name {
        ui.small(file_name.as_str());
    }

    // topmost layer first
    for layer in document.layer_order(folder_id).iter().rev().copied() {
        let Some(props) = document.layer_props(layer) else {
            continue;
        };
        ui.horizontal(|ui| {
            let mut visible = props.visible;
            if ui.checkbox(&mut visible, "").changed() {
                actions.commands.push(Command::SetLayerVisibility { layer, visible });
            }
            let selected = session.selected_layer() == Some(layer);
            if ui.selectable_label(selected, props.name.as_str()).clicked() {
                actions.commands.push(Command::SelectLayer(Some(layer)));
            }
            layer_buttons(layer, ui, actions);
        });

        let mut opacity = props.opacity;
        if ui
            .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
            .changed()
        {
            actions.commands.push(Command::SetLayerOpacity { layer, opacity });
        }
    }

    if ui.button("Add layer").clicked() {
        actions.commands.push(Command::AddLayer(folder_id));
    }
}

fn layer_buttons(layer: LayerRef, ui: &mut egui::Ui, actions: &mut PanelActions) {
    if ui.small_button("⏶").clicked() {
        actions.commands.push(Command::ReorderLayer {
            layer,
            direction: LayerDirection::Up,
        });
    }
    if ui.small_button("⏷").clicked() {
        actions.commands.push(Command::ReorderLayer {
            layer,
            direction: LayerDirection::Down,
        });
    }
    if !layer.is_main() && ui.small_button("🗑").clicked() {
        actions.commands.push(Command::DeleteLayer(layer));
    }
}

fn scene_section(app: &AnimateApp, ui: &mut egui::Ui, actions: &mut PanelActions) {
    ui.heading("Scene");
    ui.horizontal(|ui| {
        let stored = app.has_store();
        actions.save = ui.add_enabled(stored, egui::Button::new("Save")).clicked();
        actions.load = ui.add_enabled(stored, egui::Button::new("Load")).clicked();
    });

    let mut format = app.export_format();
    egui::ComboBox::from_label("Format")
        .selected_text(format.label())
        .show_ui(ui, |ui| {
            for option in ExportFormat::ALL {
                ui.selectable_value(&mut format, option, option.label());
            }
        });
    if format != app.export_format() {
        actions.export_format = Some(format);
    }

    ui.horizontal(|ui| {
        actions.export_frame = ui.button("Export frame").clicked();
        actions.export_row = ui.button("Export row").clicked();
    });
}
