use std::{path::PathBuf, sync::Arc, time::Duration};

use eframe;
use egui::{Color32, Pos2, Sense, Shape, Stroke};

use crate::{
    constants::{
        CLOCK_RATE_MAX, CLOCK_RATE_MIN, GATE_LENGTH_MAX, GATE_LENGTH_MIN, RANGE_MAX, RANGE_MIN,
    },
    data_series::DataSeries,
    playback::EngineHandle,
    sequencer::{EngineCommand, Sequencer},
    session::SourceSession,
    settings::Settings,
};

/// The panel: source selection, knobs, manual trigger/reset and readouts
pub struct LoudNumbersApp {
    session: SourceSession,
    engine: EngineHandle,

    /// a UI-side copy of the playing series, used for drawing
    plot: DataSeries,

    range: f32,
    gate_length: f32,
    clock_enabled: bool,
    clock_rate: f32,

    /// kept alive for as long as the app runs
    _stream: Option<cpal::Stream>,
    audio_error: Option<String>,
}

impl LoudNumbersApp {
    const CURVE_HEIGHT: f32 = 140.0;
    const CURVE_THICKNESS: f32 = 1.5;
    const CURVE_COLOR: Color32 = Color32::LIGHT_BLUE;
    const CURSOR_COLOR: Color32 = Color32::YELLOW;
    const REPAINT_INTERVAL: Duration = Duration::from_millis(33);

    /// Called once before the first frame.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        session: SourceSession,
        engine: EngineHandle,
        plot: DataSeries,
        stream: Result<cpal::Stream, String>,
    ) -> Self {
        cc.egui_ctx.set_style({
            let mut style = egui::Style::default();
            style.wrap_mode = Some(egui::TextWrapMode::Extend);
            style.interaction.selectable_labels = false;
            Arc::new(style)
        });

        let controls = engine.controls.clone();
        let (stream, audio_error) = match stream {
            Ok(stream) => (Some(stream), None),
            Err(e) => (None, Some(e)),
        };

        Self {
            session,
            engine,
            plot,
            range: controls.range(),
            gate_length: controls.gate_length(),
            clock_enabled: controls.clock_enabled(),
            clock_rate: controls.clock_rate(),
            _stream: stream,
            audio_error,
        }
    }

    fn open_dialog(&mut self) {
        let picked: Option<PathBuf> = rfd::FileDialog::new()
            .set_title("Open Data Source")
            .add_filter("Delimited Text", &["csv", "tsv", "txt"])
            .add_filter("All Files", &["*"])
            .pick_file();

        if let Some(path) = picked {
            let command = self.session.open(&path);
            self.dispatch(command);
        }
    }

    fn select_column(&mut self, index: usize) {
        if let Some(command) = self.session.select_column(index) {
            self.dispatch(command);
        }
    }

    /// Sends a load outcome to the engine, remembering sources it accepted
    fn dispatch(&mut self, command: EngineCommand) {
        if let Some(plot) = submit(&mut self.session, &self.engine, command) {
            self.plot = plot;
            if let Err(e) = self.session.settings().save() {
                log::warn!("could not save settings: {e}");
            }
        }
    }

    fn show_source(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let source = match self.session.identity() {
                Some(path) => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                None => "Embedded series".to_string(),
            };
            ui.label(format!("Source: {source}"));
            if ui.button("Open...").clicked() {
                self.open_dialog();
            }
        });

        if !self.session.columns().is_empty() {
            let mut selected = self.session.selected_column();
            egui::ComboBox::from_label("Column")
                .selected_text(self.session.selected_column_name().unwrap_or("-"))
                .show_ui(ui, |ui| {
                    for (index, name) in self.session.columns().iter().enumerate() {
                        ui.selectable_value(&mut selected, index, name.as_str());
                    }
                });
            if selected != self.session.selected_column() {
                self.select_column(selected);
            }
        }

        match (self.engine.monitor.is_bad_source(), self.session.last_error()) {
            (true, reason) => {
                let reason = reason.unwrap_or("unknown error");
                ui.colored_label(Color32::RED, format!("Bad source: {reason}"));
            }
            (false, Some(reason)) => {
                ui.colored_label(Color32::ORANGE, reason);
            }
            (false, None) => {}
        }
        let dropped = self.engine.monitor.retired_dropped();
        if dropped > 0 {
            ui.weak(format!("{dropped} replaced series freed on the audio thread"));
        }
        if let Some(e) = &self.audio_error {
            ui.colored_label(Color32::ORANGE, format!("Audio unavailable: {e}"));
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        let controls = self.engine.controls.clone();

        let range = ui.add(
            egui::Slider::new(&mut self.range, RANGE_MIN..=RANGE_MAX)
                .step_by(1.0)
                .text("Range (octaves)"),
        );
        if range.changed() {
            controls.set_range(self.range);
        }

        let gate = ui.add(
            egui::Slider::new(&mut self.gate_length, GATE_LENGTH_MIN..=GATE_LENGTH_MAX)
                .logarithmic(true)
                .text("Gate Length (s)"),
        );
        if gate.changed() {
            controls.set_gate_length(self.gate_length);
        }

        ui.horizontal(|ui| {
            if ui.checkbox(&mut self.clock_enabled, "Clock").changed() {
                controls.set_clock_enabled(self.clock_enabled);
            }
            let rate = ui.add(
                egui::Slider::new(&mut self.clock_rate, CLOCK_RATE_MIN..=CLOCK_RATE_MAX)
                    .logarithmic(true)
                    .text("Hz"),
            );
            if rate.changed() {
                controls.set_clock_rate(self.clock_rate);
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Trigger").clicked() {
                controls.press_trigger();
            }
            if ui.button("Reset").clicked() {
                controls.press_reset();
            }
        });
    }

    fn show_outputs(&self, ui: &mut egui::Ui) {
        let monitor = &self.engine.monitor;
        let row = monitor.row();
        ui.label(format!("Row: {} / {}", row, self.plot.len()));

        let outputs = monitor.outputs().as_array();
        egui::Grid::new("outputs").num_columns(2).show(ui, |ui| {
            for (name, value) in Sequencer::SPECIFICATION.output_names.iter().zip(outputs) {
                ui.label(*name);
                ui.monospace(format!("{value:+.3} V"));
                ui.end_row();
            }
        });
    }

    /// Draws the series as a curve with the playback cursor over it.
    /// Missing samples break the line.
    fn show_curve(&self, ui: &mut egui::Ui) {
        let size = egui::vec2(ui.available_width(), Self::CURVE_HEIGHT);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let rect = response.rect;
        painter.rect_stroke(
            rect,
            0.0,
            Stroke::new(1.0, Color32::DARK_GRAY),
            egui::StrokeKind::Inside,
        );

        let count = self.plot.len();
        if count == 0 {
            return;
        }
        let x_at = |index: usize| {
            if count == 1 {
                rect.center().x
            } else {
                rect.left() + rect.width() * index as f32 / (count - 1) as f32
            }
        };

        let mut run: Vec<Pos2> = Vec::new();
        let stroke = Stroke::new(Self::CURVE_THICKNESS, Self::CURVE_COLOR);
        for index in 0..count {
            match self.plot.normalized(index) {
                Some(level) => run.push(egui::pos2(x_at(index), rect.bottom() - rect.height() * level)),
                None => Self::flush_run(&painter, &mut run, stroke),
            }
        }
        Self::flush_run(&painter, &mut run, stroke);

        let row = self.engine.monitor.row();
        if row >= 0 && (row as usize) < count {
            painter.vline(
                x_at(row as usize),
                rect.y_range(),
                Stroke::new(1.0, Self::CURSOR_COLOR),
            );
        }
    }

    fn flush_run(painter: &egui::Painter, run: &mut Vec<Pos2>, stroke: Stroke) {
        match run.len() {
            0 => {}
            1 => {
                painter.circle_filled(run[0], Self::CURVE_THICKNESS, stroke.color);
            }
            _ => {
                painter.add(Shape::line(std::mem::take(run), stroke));
            }
        }
        run.clear();
    }
}

impl eframe::App for LoudNumbersApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.engine.collect_retired();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open CSV...").clicked() {
                        ui.close();
                        self.open_dialog();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);

                egui::warn_if_debug_build(ui);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_source(ui);
            ui.separator();
            self.show_curve(ui);
            ui.separator();
            ui.columns(2, |columns| {
                self.show_controls(&mut columns[0]);
                self.show_outputs(&mut columns[1]);
            });
        });

        ctx.request_repaint_after(Self::REPAINT_INTERVAL);
    }
}

/// Persists the current source before the app closes
impl Drop for LoudNumbersApp {
    fn drop(&mut self) {
        if self.session.identity().is_some() {
            if let Err(e) = self.session.settings().save() {
                log::warn!("could not save settings: {e}");
            }
        }
    }
}

/// Hands a load outcome to the engine. Returns a copy of the series the
/// engine will play, or None if nothing new was adopted. When the engine
/// refuses the command the session goes back to its previous source.
pub fn submit(session: &mut SourceSession, engine: &EngineHandle, command: EngineCommand) -> Option<DataSeries> {
    let plot = match &command {
        EngineCommand::Adopt(series) => Some(series.clone()),
        EngineCommand::BadSource => None,
    };
    if !engine.send(command) {
        log::error!("audio engine did not accept the source change");
        session.revert("The audio engine did not accept the source change.");
        return None;
    }
    plot
}

/// Loads the remembered source, if any, and returns what the engine will play
pub fn restore_session(session: &mut SourceSession, engine: &EngineHandle, settings: &Settings) -> Option<DataSeries> {
    let command = session.restore(settings)?;
    submit(session, engine, command)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::*;
    use crate::{playback, sequencer::Sequencer};

    fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn accepted_source_is_returned_for_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "data.csv", "a\n1\n2\n");
        let (mut backend, engine) = playback::channel(Sequencer::default());
        let mut session = SourceSession::new();

        let command = session.open(&path);
        let plot = submit(&mut session, &engine, command).unwrap();
        assert_eq!(plot.values(), &[1.0, 2.0]);

        backend.drain_commands();
        assert_eq!(backend.sequencer().series(), &plot);
    }

    #[test]
    fn full_queue_rolls_session_back() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_source(dir.path(), "first.csv", "a\n1\n");
        let second = write_source(dir.path(), "second.csv", "b\n2\n");
        let (_backend, engine) = playback::channel(Sequencer::default());
        let mut session = SourceSession::new();

        let command = session.open(&first);
        assert!(submit(&mut session, &engine, command).is_some());
        while engine.send(EngineCommand::BadSource) {}

        let command = session.open(&second);
        assert!(submit(&mut session, &engine, command).is_none());
        assert_eq!(session.identity(), Some(first.as_path()));
        assert_eq!(session.columns(), &["a".to_string()]);
        assert!(session.last_error().is_some());
        assert_eq!(session.settings().source_path(), Some(first));
    }

    #[test]
    fn restore_without_engine_is_not_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "data.csv", "a\n1\n");
        let (backend, engine) = playback::channel(Sequencer::default());
        drop(backend);

        let settings = Settings {
            last_source_identity: Some(path.to_string_lossy().into_owned()),
            selected_column: 0,
        };
        let mut session = SourceSession::new();
        assert!(restore_session(&mut session, &engine, &settings).is_none());
        assert_eq!(session.identity(), None);
        assert!(session.last_error().is_some());
    }
}
