use loud_numbers::{
    app::{restore_session, LoudNumbersApp},
    data_series::DataSeries,
    playback,
    sequencer::Sequencer,
    session::SourceSession,
    settings::Settings,
};

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 420.0])
            .with_min_inner_size([400.0, 320.0]),
        ..Default::default()
    };

    let (backend, engine) = playback::channel(Sequencer::default());
    let stream = playback::start_default_output(backend).map_err(|e| {
        log::error!("audio output unavailable: {e}");
        e.to_string()
    });

    let mut session = SourceSession::new();
    let plot = restore_session(&mut session, &engine, &Settings::load())
        .unwrap_or_else(DataSeries::embedded);

    eframe::run_native(
        "Loud Numbers",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(
                LoudNumbersApp::new(cc, session, engine, plot, stream)
            ))
        })
    )
}
