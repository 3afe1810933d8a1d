pub const SAMPLE_RATE: u32 = 44100;

pub const SAMPLE_INTERVAL: f32 = 1.0_f32 / SAMPLE_RATE as f32;

/// Gate inputs are considered "low" once they fall below this
pub const GATE_LOW_THRESHOLD: f32 = 0.8;

/// Gate inputs are considered "high" once they rise above this
pub const GATE_HIGH_THRESHOLD: f32 = 1.6;

pub const GATE_OUT_HIGH: f32 = 10.0;

pub const GATE_OUT_LOW: f32 = 0.0;

/// Length of the end-of-data pulse in seconds
pub const END_PULSE_SECONDS: f32 = 0.01;

pub const BIPOLAR_MIN: f32 = -5.0;
pub const BIPOLAR_MAX: f32 = 5.0;

pub const UNIPOLAR_MIN: f32 = 0.0;
pub const UNIPOLAR_MAX: f32 = 10.0;

/// The octave the pitch output is anchored to once the range reaches it
pub const PITCH_ANCHOR_OCTAVE: f32 = 4.0;

pub const RANGE_MIN: f32 = 1.0;
pub const RANGE_MAX: f32 = 8.0;
pub const RANGE_DEFAULT: f32 = 2.0;

pub const GATE_LENGTH_MIN: f32 = 0.001;
pub const GATE_LENGTH_MAX: f32 = 1.0;
pub const GATE_LENGTH_DEFAULT: f32 = 0.1;

pub const CLOCK_RATE_MIN: f32 = 0.1;
pub const CLOCK_RATE_MAX: f32 = 50.0;
pub const CLOCK_RATE_DEFAULT: f32 = 2.0;

/// The voltage written to the audio device as a full-scale sample
pub const OUTPUT_FULL_SCALE: f32 = 10.0;
