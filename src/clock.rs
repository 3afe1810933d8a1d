use crate::{
    circuit::{Circuit, CircuitSpecification},
    constants::{GATE_OUT_HIGH, GATE_OUT_LOW},
};

/// A square wave trigger source, high for the first half of each period.
/// Used to step the sequencer when nothing external is driving it.
#[derive(Debug, Default)]
pub struct Clock {
    index: f32,
}

impl Clock {
    pub const SPECIFICATION: CircuitSpecification = CircuitSpecification {
        input_names: &["Rate"],
        output_names: &["Out"],
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts the period so the next sample is a rising edge
    pub fn reset(&mut self) {
        self.index = 0.0;
    }
}

impl Circuit for Clock {
    fn specification(&self) -> &'static CircuitSpecification {
        &Self::SPECIFICATION
    }

    fn operate(&mut self, inputs: &[f32], outputs: &mut [f32], delta: f32) {
        outputs[0] = if self.index < 0.5 {
            GATE_OUT_HIGH
        } else {
            GATE_OUT_LOW
        };

        //Increment index by interval * rate, one period per 1 / rate seconds
        self.index += delta * inputs[0].max(0.0);
        self.index %= 1.0;
    }
}
