use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data_series::{DataSeries, MISSING};

const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// A parsed source: the header names and the chosen column as a series
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub columns: Vec<String>,
    pub series: DataSeries,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source has no header row.")]
    NoColumns,

    #[error("Column {index} does not exist; the source has {count} column(s).")]
    ColumnOutOfRange { index: usize, count: usize },
}

/// Reads the file at path and extracts the given column.
/// Blocks on file IO; never call this from the audio thread.
pub fn load(path: &Path, column_index: usize) -> Result<LoadedSource, SourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| SourceError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, column_index)
}

/// Extracts the given column from delimited text. The first non-empty line is
/// the header. Cells that are not numbers become missing samples.
pub fn parse(text: &str, column_index: usize) -> Result<LoadedSource, SourceError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or(SourceError::NoColumns)?;
    let delimiter = detect_delimiter(header);
    let columns: Vec<String> = header
        .split(delimiter)
        .map(|name| clean_cell(name).to_string())
        .collect();

    if columns.iter().all(|name| name.is_empty()) {
        return Err(SourceError::NoColumns);
    }
    if column_index >= columns.len() {
        return Err(SourceError::ColumnOutOfRange {
            index: column_index,
            count: columns.len(),
        });
    }

    let values = lines
        .map(|line| {
            line.split(delimiter)
                .nth(column_index)
                .map(parse_cell)
                .unwrap_or(MISSING)
        })
        .collect();

    Ok(LoadedSource {
        columns,
        series: DataSeries::from_values(values),
    })
}

/// Picks whichever known delimiter appears most in the header, preferring a comma
fn detect_delimiter(header: &str) -> char {
    let mut best = DELIMITERS[0];
    let mut best_count = header.matches(best).count();
    for delimiter in &DELIMITERS[1..] {
        let count = header.matches(*delimiter).count();
        if count > best_count {
            best = *delimiter;
            best_count = count;
        }
    }
    best
}

fn clean_cell(cell: &str) -> &str {
    let trimmed = cell.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
}

fn parse_cell(cell: &str) -> f32 {
    match clean_cell(cell).parse::<f32>() {
        Ok(value) if value.is_finite() => value,
        _ => MISSING,
    }
}
