/// Holds an output high for a fixed duration after being triggered.
///
/// The duration is converted to a whole number of samples on the first
/// `process` call after arming, so float drift in the sample interval never
/// adds or drops a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseGenerator {
    /// a requested duration in seconds, waiting for the next process call
    pending: Option<f32>,

    /// pulse length in samples
    length: u32,

    /// samples processed since arming
    elapsed: u32,
}

impl PulseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the pulse for the given duration, measured from the next call to
    /// process. Retriggering restarts the count.
    pub fn trigger(&mut self, duration: f32) {
        self.pending = Some(duration.max(0.0));
        self.elapsed = 0;
    }

    /// Advances the pulse by one sample. Returns true while the pulse is high.
    pub fn process(&mut self, delta: f32) -> bool {
        if let Some(duration) = self.pending.take() {
            self.length = if delta > 0.0 {
                (duration / delta).round() as u32
            } else {
                0
            };
        }

        if self.elapsed < self.length {
            self.elapsed += 1;
            self.elapsed < self.length
        } else {
            false
        }
    }

    /// Cancels any pulse in progress
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
