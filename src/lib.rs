pub mod app;

pub mod circuit;

pub mod clock;

pub mod constants;

pub mod csv_loader;

pub mod data_series;

pub mod playback;

pub mod pulse;

pub mod sequencer;

pub mod session;

pub mod settings;

pub mod trigger;
