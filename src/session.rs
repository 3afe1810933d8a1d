use std::path::{Path, PathBuf};

use crate::{csv_loader, sequencer::EngineCommand, settings::Settings};

/// Tracks which source and column are selected and turns user actions into
/// commands for the sequencer.
///
/// Everything here runs on the UI thread. Loading may block on file IO and
/// allocate freely; only the resulting command crosses to the audio thread.
#[derive(Debug, Default)]
pub struct SourceSession {
    /// the last source that loaded successfully
    identity: Option<PathBuf>,
    selected_column: usize,
    /// column names from the last successful load
    columns: Vec<String>,
    /// the message from the most recent failed load, cleared on success
    last_error: Option<String>,
    /// identity, column and names from before the last successful load
    previous: Option<(Option<PathBuf>, usize, Vec<String>)>,
}

impl SourceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a source chosen by the user. A different path starts at column
    /// 0; reopening the current path keeps the selected column.
    pub fn open(&mut self, path: &Path) -> EngineCommand {
        let column = if self.identity.as_deref() == Some(path) {
            self.selected_column
        } else {
            0
        };
        self.load(path, column)
    }

    /// Switches the current source to another column. Returns None when no
    /// source has been loaded yet.
    pub fn select_column(&mut self, index: usize) -> Option<EngineCommand> {
        let path = self.identity.clone()?;
        Some(self.load(&path, index))
    }

    /// Reopens the source remembered in settings, if any
    pub fn restore(&mut self, settings: &Settings) -> Option<EngineCommand> {
        let path = settings.source_path()?;
        log::info!("restoring {} column {}", path.display(), settings.selected_column);
        Some(self.load(&path, settings.selected_column))
    }

    /// Undoes the last successful load after the engine refused it, and
    /// records why. A failed load changed nothing, so only the error is kept.
    pub fn revert(&mut self, reason: &str) {
        if let Some((identity, selected_column, columns)) = self.previous.take() {
            self.identity = identity;
            self.selected_column = selected_column;
            self.columns = columns;
        }
        self.last_error = Some(reason.to_string());
    }

    /// The settings that would bring this session back
    pub fn settings(&self) -> Settings {
        Settings {
            last_source_identity: self
                .identity
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned()),
            selected_column: self.selected_column,
        }
    }

    pub fn identity(&self) -> Option<&Path> {
        self.identity.as_deref()
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The display name of the selected column, if a source is loaded
    pub fn selected_column_name(&self) -> Option<&str> {
        self.columns.get(self.selected_column).map(String::as_str)
    }

    /// Runs the loader. Selection state only changes on success; a failure
    /// leaves it alone and asks the sequencer to go quiet.
    fn load(&mut self, path: &Path, column: usize) -> EngineCommand {
        match csv_loader::load(path, column) {
            Ok(loaded) => {
                log::info!(
                    "loaded {} column {} ({} samples, {} missing)",
                    path.display(),
                    column,
                    loaded.series.len(),
                    loaded.series.len() - loaded.series.valid_count()
                );
                self.previous = Some((
                    self.identity.replace(path.to_path_buf()),
                    std::mem::replace(&mut self.selected_column, column),
                    std::mem::replace(&mut self.columns, loaded.columns),
                ));
                self.last_error = None;
                EngineCommand::Adopt(loaded.series)
            }
            Err(e) => {
                log::warn!("could not load {} column {}: {}", path.display(), column, e);
                self.previous = None;
                self.last_error = Some(e.to_string());
                EngineCommand::BadSource
            }
        }
    }
}
