/// The specification "skeleton" for a circuit. Describes the ports a host
/// must supply and read every sample.
#[derive(Debug)]
pub struct CircuitSpecification {
    /// The names of each input to the circuit.
    pub input_names: &'static [&'static str],

    /// The names of each output of the circuit
    pub output_names: &'static [&'static str],
}

impl CircuitSpecification {
    pub fn input_count(&self) -> usize {
        self.input_names.len()
    }

    pub fn output_count(&self) -> usize {
        self.output_names.len()
    }
}

/// A circuit that processes signals into outputs, once per sample
pub trait Circuit: std::fmt::Debug + Send {
    /// gets the specification for the circuit
    fn specification(&self) -> &'static CircuitSpecification;

    /// Handles a slice of signals to produce some output signals.
    /// inputs and outputs are sized to match the specification; delta is the
    /// sample interval in seconds.
    fn operate(&mut self, inputs: &[f32], outputs: &mut [f32], delta: f32);
}
