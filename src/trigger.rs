use crate::constants::{GATE_HIGH_THRESHOLD, GATE_LOW_THRESHOLD};

/// A two-threshold comparator used to turn an analog gate or trigger signal
/// into clean rising edges.
///
/// The signal must rise above the high threshold to register as high and
/// fall below the low threshold before it can register again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchmittTrigger {
    low: f32,
    high: f32,
    last_high: bool,
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new(GATE_LOW_THRESHOLD, GATE_HIGH_THRESHOLD)
    }
}

impl SchmittTrigger {
    /// Creates a trigger with the given thresholds. low must be below high.
    pub fn new(low: f32, high: f32) -> Self {
        debug_assert!(low < high, "Schmitt trigger low threshold must be below the high threshold.");
        Self {
            low,
            high,
            last_high: false,
        }
    }

    /// Feeds one sample. Returns true only on the sample where the signal
    /// goes from low to high.
    pub fn process(&mut self, voltage: f32) -> bool {
        if self.last_high {
            if voltage < self.low {
                self.last_high = false;
            }
            false
        } else if voltage > self.high {
            self.last_high = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_produces_single_edge_at_high_threshold() {
        let ramp: Vec<f32> = (0..=1000).map(|i| i as f32 * 0.01).collect();
        let expected = ramp
            .iter()
            .position(|v| *v > GATE_HIGH_THRESHOLD)
            .unwrap();

        let mut trigger = SchmittTrigger::default();
        let edges: Vec<usize> = ramp
            .iter()
            .enumerate()
            .filter_map(|(i, v)| trigger.process(*v).then_some(i))
            .collect();

        assert_eq!(edges, vec![expected]);
        // still latched high: holding the level gives no further edge
        assert!(!trigger.process(10.0));
    }

    #[test]
    fn noise_inside_hysteresis_band_does_not_retrigger() {
        let mut trigger = SchmittTrigger::default();
        assert!(trigger.process(10.0));

        for i in 0..1000 {
            let noise = if i % 2 == 0 { 0.9 } else { 1.5 };
            assert!(!trigger.process(noise), "retriggered on sample {i}");
        }
    }

    #[test]
    fn retriggers_after_falling_below_low_threshold() {
        let mut trigger = SchmittTrigger::default();
        assert!(trigger.process(5.0));
        assert!(!trigger.process(5.0));
        assert!(!trigger.process(0.5));
        assert!(trigger.process(5.0));
    }

    #[test]
    fn custom_thresholds() {
        let mut trigger = SchmittTrigger::new(0.1, 2.0);
        assert!(!trigger.process(1.9));
        assert!(trigger.process(2.1));
        // 0.2 is above the low threshold, so the trigger stays latched
        assert!(!trigger.process(0.2));
        assert!(!trigger.process(2.1));
        assert!(!trigger.process(0.05));
        assert!(trigger.process(2.1));
    }
}
