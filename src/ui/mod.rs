//! User interface using egui.
//!
//! Provides a debug side panel: frame rate, camera and ground state, batch
//! counts, time of day and mouse sensitivity.

use egui::Context;

use crate::batch::BatchStats;
use crate::camera::{Camera, Motion};
use crate::sky::DAY_LENGTH;

/// Read-only values shown in the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub stats: BatchStats,
    pub entities: usize,
    pub day_time: f32,
    pub night_factor: f32,
}

/// Time of day as `HH:MM` on a 24-hour clock.
pub fn clock_label(day_time: f32) -> String {
    let minutes = (day_time.rem_euclid(DAY_LENGTH) * 1440.0 / DAY_LENGTH) as u32;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn motion_label(motion: Motion) -> &'static str {
    match motion {
        Motion::Grounded => "Grounded",
        Motion::Airborne => "Airborne",
    }
}

/// UI state and rendering.
pub struct Ui {
    /// Whether the side panel is visible
    pub panel_visible: bool,
}

impl Ui {
    pub fn new() -> Self {
        Self {
            panel_visible: true,
        }
    }

    pub fn toggle(&mut self) {
        self.panel_visible = !self.panel_visible;
    }

    /// Render the UI and return what the caller should act on.
    pub fn render(&mut self, ctx: &Context, camera: &mut Camera, info: &DebugInfo) -> UiResponse {
        let mut response = UiResponse::default();

        if !self.panel_visible {
            return response;
        }

        egui::SidePanel::left("debug")
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Wander");
                ui.separator();

                ui.label(format!("FPS: {:.1}", info.fps));
                ui.label(format!(
                    "Drawn: {} of {} entities in {} batches",
                    info.stats.instances, info.entities, info.stats.groups
                ));
                ui.separator();

                ui.collapsing("Camera", |ui| {
                    let p = camera.position;
                    ui.label(format!("Position: {:.1}, {:.1}, {:.1}", p.x, p.y, p.z));
                    ui.label(format!("Pitch: {:.1}°  Yaw: {:.1}°", camera.pitch, camera.yaw));
                    ui.label(format!(
                        "{} (vertical speed {:.1})",
                        motion_label(camera.motion()),
                        camera.upward_speed()
                    ));

                    let mut horizontal = camera.horizontal_sensitivity;
                    let mut vertical = camera.vertical_sensitivity;
                    ui.horizontal(|ui| {
                        ui.label("Horizontal sensitivity:");
                        ui.add(egui::DragValue::new(&mut horizontal).speed(0.1));
                    });
                    ui.horizontal(|ui| {
                        ui.label("Vertical sensitivity:");
                        ui.add(egui::DragValue::new(&mut vertical).speed(0.1));
                    });
                    camera.set_sensitivity(horizontal, vertical);

                    if ui.button("Reset Camera").clicked() {
                        response.reset_camera = true;
                    }
                });

                ui.collapsing("Sky", |ui| {
                    ui.label(format!("Time: {}", clock_label(info.day_time)));
                    ui.label(format!("Night blend: {:.2}", info.night_factor));
                });

                ui.separator();

                // Help section
                ui.collapsing("Controls", |ui| {
                    ui.label("WASD: Walk");
                    ui.label("Space: Jump");
                    ui.label("E / Q: Fly up / down");
                    ui.label("G: Capture mouse");
                    ui.label("Tab: Toggle Panel");
                    ui.label("ESC: Quit");
                });
            });

        response
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from UI indicating what actions to take.
#[derive(Debug, Default)]
pub struct UiResponse {
    pub reset_camera: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_label() {
        assert_eq!(clock_label(0.0), "00:00");
        assert_eq!(clock_label(6000.0), "06:00");
        assert_eq!(clock_label(12500.0), "12:30");
        assert_eq!(clock_label(DAY_LENGTH), "00:00");
    }

    #[test]
    fn test_toggle() {
        let mut ui = Ui::new();
        ui.toggle();
        assert!(!ui.panel_visible);
        ui.toggle();
        assert!(ui.panel_visible);
    }

    #[test]
    fn test_hidden_panel_draws_nothing() {
        let ctx = Context::default();
        let mut ui = Ui::new();
        ui.toggle();
        let mut camera = Camera::new();
        let mut response = UiResponse::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            response = ui.render(ctx, &mut camera, &DebugInfo::default());
        });
        assert!(!response.reset_camera);
    }
}
