use crate::AnimateApp;

pub fn central_panel(app: &mut AnimateApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none().fill(egui::Color32::from_gray(48)))
        .show(ctx, |ui| {
            app.show_canvas(ui);
        });
}
