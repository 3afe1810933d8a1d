/// Annual mean CO2 at Mauna Loa in ppm, 1959 through 2023.
const EMBEDDED_VALUES: [f32; 65] = [
    315.98, 316.91, 317.64, 318.45, 318.99, 319.62, 320.04, 321.37, 322.18, 323.05,
    324.62, 325.68, 326.32, 327.46, 329.68, 330.19, 331.13, 332.03, 333.84, 335.41,
    336.84, 338.76, 340.12, 341.48, 343.15, 344.87, 346.35, 347.61, 349.31, 351.69,
    353.20, 354.45, 355.70, 356.54, 357.21, 358.96, 360.97, 362.74, 363.88, 366.84,
    368.54, 369.71, 371.32, 373.45, 375.98, 377.70, 379.98, 382.09, 384.02, 385.83,
    387.64, 390.10, 391.85, 394.06, 396.74, 398.81, 401.01, 404.41, 406.76, 408.72,
    411.66, 414.24, 416.45, 418.56, 421.08,
];

/// The marker stored in place of a sample that failed to parse
pub const MISSING: f32 = f32::NAN;

/// Whether the given sample counts as missing.
/// Anything that is not finite is skipped for both normalization and output.
pub fn is_missing(value: f32) -> bool {
    !value.is_finite()
}

/// Linearly maps x from [in_min, in_max] onto [out_min, out_max].
/// A degenerate input range (in_min == in_max) maps everything to out_min.
pub fn scale(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if in_max == in_min {
        out_min
    } else {
        out_min + (out_max - out_min) * (x - in_min) / (in_max - in_min)
    }
}

/// An ordered column of samples along with the bounds of its valid values.
///
/// A series is never edited after construction; replacing the data means
/// building a new series and swapping it in whole.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSeries {
    values: Vec<f32>,
    valid_min: f32,
    valid_max: f32,
}

impl Default for DataSeries {
    fn default() -> Self {
        Self::from_values(Vec::new())
    }
}

impl DataSeries {
    /// Builds a series, computing its bounds over the non-missing values.
    /// Empty and all-missing series get bounds of 0/0.
    pub fn from_values(values: Vec<f32>) -> Self {
        let bounds = values
            .iter()
            .copied()
            .filter(|value| !is_missing(*value))
            .fold(None, |bounds: Option<(f32, f32)>, value| match bounds {
                Some((min, max)) => Some((min.min(value), max.max(value))),
                None => Some((value, value)),
            });
        let (valid_min, valid_max) = bounds.unwrap_or((0.0, 0.0));

        Self {
            values,
            valid_min,
            valid_max,
        }
    }

    /// The series the sequencer starts with before any source is loaded
    pub fn embedded() -> Self {
        Self::from_values(EMBEDDED_VALUES.to_vec())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn valid_min(&self) -> f32 {
        self.valid_min
    }

    pub fn valid_max(&self) -> f32 {
        self.valid_max
    }

    /// Returns the sample at index, or None if the index is out of bounds or
    /// the sample is missing.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values
            .get(index)
            .copied()
            .filter(|value| !is_missing(*value))
    }

    /// The sample at index mapped onto [0, 1] using the series bounds
    pub fn normalized(&self, index: usize) -> Option<f32> {
        self.get(index)
            .map(|value| scale(value, self.valid_min, self.valid_max, 0.0, 1.0))
    }

    /// Number of samples that are not missing
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|value| !is_missing(**value)).count()
    }
}
