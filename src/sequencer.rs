use crate::{
    circuit::{Circuit, CircuitSpecification},
    constants::{
        BIPOLAR_MAX, BIPOLAR_MIN, END_PULSE_SECONDS, GATE_LENGTH_MAX, GATE_LENGTH_MIN,
        GATE_OUT_HIGH, GATE_OUT_LOW, PITCH_ANCHOR_OCTAVE, RANGE_MAX, RANGE_MIN, UNIPOLAR_MAX,
        UNIPOLAR_MIN,
    },
    data_series::{scale, DataSeries},
    pulse::PulseGenerator,
    trigger::SchmittTrigger,
};

/// The three control voltages derived from the current sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CvOutputs {
    pub bipolar: f32,
    pub unipolar: f32,
    pub pitch: f32,
}

/// Everything the sequencer emits on one sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Outputs {
    pub bipolar: f32,
    pub unipolar: f32,
    pub pitch: f32,
    pub gate: f32,
    pub end: f32,
}

impl Outputs {
    /// Outputs in port order, matching Sequencer::SPECIFICATION
    pub fn as_array(&self) -> [f32; 5] {
        [self.bipolar, self.unipolar, self.pitch, self.gate, self.end]
    }

    pub fn from_array(values: [f32; 5]) -> Self {
        let [bipolar, unipolar, pitch, gate, end] = values;
        Self {
            bipolar,
            unipolar,
            pitch,
            gate,
            end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// no trigger received since the last load (row == -1)
    IdleBeforeStart,
    Playing,
    /// the cursor has run past the last sample
    Finished,
}

/// Changes sent from the loader side to the sequencer
#[derive(Debug)]
pub enum EngineCommand {
    /// replace the series and rewind to before the start
    Adopt(DataSeries),
    /// the requested source could not be loaded
    BadSource,
}

/// Returns the pitch output range, in volts, for an octave range parameter.
///
/// Ranges below the anchor octave start at 0V; wider ranges end at the anchor
/// and extend downward.
pub fn pitch_range(range: f32) -> (f32, f32) {
    let octaves = if range.is_finite() {
        range.round().clamp(RANGE_MIN, RANGE_MAX)
    } else {
        RANGE_MIN
    };

    if octaves < PITCH_ANCHOR_OCTAVE {
        (0.0, octaves)
    } else {
        (PITCH_ANCHOR_OCTAVE - octaves, PITCH_ANCHOR_OCTAVE)
    }
}

fn gate_voltage(high: bool) -> f32 {
    if high { GATE_OUT_HIGH } else { GATE_OUT_LOW }
}

/// Steps through a data series one sample per trigger edge, emitting control
/// voltages and a gate for each sample.
///
/// `tick` is called once per audio sample. It never allocates, locks, or fails.
#[derive(Debug)]
pub struct Sequencer {
    series: DataSeries,

    /// Invariants:
    /// 	1) -1 <= row <= series.len()
    row: isize,

    /// set on a trigger edge until the outputs for the new row are computed
    row_advanced_pending: bool,

    /// while set, every output is held at zero
    bad_source: bool,

    trigger: SchmittTrigger,
    reset: SchmittTrigger,
    gate: PulseGenerator,
    end: PulseGenerator,
    cv: CvOutputs,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DataSeries::embedded())
    }
}

impl Sequencer {
    pub const SPECIFICATION: CircuitSpecification = CircuitSpecification {
        input_names: &["Trigger", "Reset", "Range", "Gate Length"],
        output_names: &["-5..5", "0..10", "V/Oct", "Gate", "End"],
    };

    pub fn new(series: DataSeries) -> Self {
        Self {
            series,
            row: -1,
            row_advanced_pending: false,
            bad_source: false,
            trigger: SchmittTrigger::default(),
            reset: SchmittTrigger::default(),
            gate: PulseGenerator::new(),
            end: PulseGenerator::new(),
            cv: CvOutputs::default(),
        }
    }

    /// Processes one sample.
    ///
    /// trigger and reset are input voltages, range is the octave range
    /// parameter (1-8), gate_length is in seconds and delta is the sample
    /// interval in seconds.
    pub fn tick(
        &mut self,
        trigger: f32,
        reset: f32,
        range: f32,
        gate_length: f32,
        delta: f32,
    ) -> Outputs {
        if self.bad_source {
            return Outputs::default();
        }

        let len = self.len();

        if self.reset.process(reset) {
            self.row = 0;
            self.cv = match self.series.get(0) {
                Some(value) => self.map_value(value, range),
                None => CvOutputs::default(),
            };
        }

        if self.trigger.process(trigger) {
            self.row = (self.row + 1).min(len);
            if self.row >= len {
                self.end.trigger(END_PULSE_SECONDS);
            }
            self.row_advanced_pending = true;
        }

        let end = self.end.process(delta);

        // past the end the flag stays set, so a later reset picks up row 0
        if self.row_advanced_pending && self.row < len {
            self.row_advanced_pending = false;
            // missing samples keep their cursor slot but emit nothing
            if let Some(value) = self.current_value() {
                self.cv = self.map_value(value, range);
                self.gate
                    .trigger(gate_length.clamp(GATE_LENGTH_MIN, GATE_LENGTH_MAX));
            }
        }

        let gate = self.gate.process(delta);

        Outputs {
            bipolar: self.cv.bipolar,
            unipolar: self.cv.unipolar,
            pitch: self.cv.pitch,
            gate: gate_voltage(gate),
            end: gate_voltage(end),
        }
    }

    /// Swaps in a new series and rewinds to before the start. Clears the bad
    /// source flag and cuts off any gate or end pulse still sounding from the
    /// old series. Returns the previous series so the caller can drop it
    /// somewhere other than the audio thread.
    pub fn adopt(&mut self, series: DataSeries) -> DataSeries {
        let previous = std::mem::replace(&mut self.series, series);
        self.row = -1;
        self.row_advanced_pending = false;
        self.bad_source = false;
        self.gate.reset();
        self.end.reset();
        previous
    }

    /// Applies a command from the loader. Returns any series that was replaced.
    pub fn apply(&mut self, command: EngineCommand) -> Option<DataSeries> {
        match command {
            EngineCommand::Adopt(series) => Some(self.adopt(series)),
            EngineCommand::BadSource => {
                self.set_bad_source(true);
                None
            }
        }
    }

    pub fn set_bad_source(&mut self, bad: bool) {
        self.bad_source = bad;
    }

    pub fn is_bad_source(&self) -> bool {
        self.bad_source
    }

    pub fn row(&self) -> isize {
        self.row
    }

    pub fn series(&self) -> &DataSeries {
        &self.series
    }

    /// The most recently computed control voltages
    pub fn cv(&self) -> CvOutputs {
        self.cv
    }

    pub fn state(&self) -> SequencerState {
        if self.row < 0 {
            SequencerState::IdleBeforeStart
        } else if self.row < self.len() {
            SequencerState::Playing
        } else {
            SequencerState::Finished
        }
    }

    fn len(&self) -> isize {
        self.series.len() as isize
    }

    fn current_value(&self) -> Option<f32> {
        if self.row < 0 {
            None
        } else {
            self.series.get(self.row as usize)
        }
    }

    fn map_value(&self, value: f32, range: f32) -> CvOutputs {
        let (min, max) = (self.series.valid_min(), self.series.valid_max());
        let (pitch_min, pitch_max) = pitch_range(range);
        CvOutputs {
            bipolar: scale(value, min, max, BIPOLAR_MIN, BIPOLAR_MAX),
            unipolar: scale(value, min, max, UNIPOLAR_MIN, UNIPOLAR_MAX),
            pitch: scale(value, min, max, pitch_min, pitch_max),
        }
    }
}

impl Circuit for Sequencer {
    fn specification(&self) -> &'static CircuitSpecification {
        &Self::SPECIFICATION
    }

    fn operate(&mut self, inputs: &[f32], outputs: &mut [f32], delta: f32) {
        debug_assert!(inputs.len() == Self::SPECIFICATION.input_count(), "Input array size must match input count.");
        debug_assert!(outputs.len() == Self::SPECIFICATION.output_count(), "Output array size must match output count.");

        let result = self.tick(inputs[0], inputs[1], inputs[2], inputs[3], delta);
        outputs.copy_from_slice(&result.as_array());
    }
}
