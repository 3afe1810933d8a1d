use std::{
    sync::{
        atomic::{AtomicBool, AtomicIsize, AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BuildStreamError, DefaultStreamConfigError, FromSample, OutputCallbackInfo, PlayStreamError,
    Sample, SampleFormat, SizedSample, StreamConfig, StreamError,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::{
    circuit::Circuit,
    clock::Clock,
    constants::{
        CLOCK_RATE_DEFAULT, GATE_LENGTH_DEFAULT, GATE_OUT_HIGH, GATE_OUT_LOW, OUTPUT_FULL_SCALE,
        RANGE_DEFAULT,
    },
    data_series::DataSeries,
    sequencer::{EngineCommand, Outputs, Sequencer},
};

/// Capacity of the loader -> audio thread command queue
const COMMAND_CAPACITY: usize = 8;

/// Capacity of the queue carrying replaced series back off the audio thread
const RETIRED_CAPACITY: usize = 8;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No audio output device is available.")]
    NoDevice,

    #[error("Could not query the output device config: {0}")]
    DefaultConfig(#[from] DefaultStreamConfigError),

    #[error("Failed to build the output stream: {0}")]
    Build(#[from] BuildStreamError),

    #[error("Failed to start the output stream: {0}")]
    Play(#[from] PlayStreamError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
}

/// An f32 that can be shared with the audio thread without locking
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Panel parameters written by the UI and read by the audio thread
#[derive(Debug)]
pub struct Controls {
    range: AtomicF32,
    gate_length: AtomicF32,
    clock_rate: AtomicF32,
    clock_enabled: AtomicBool,
    trigger: AtomicBool,
    reset: AtomicBool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            range: AtomicF32::new(RANGE_DEFAULT),
            gate_length: AtomicF32::new(GATE_LENGTH_DEFAULT),
            clock_rate: AtomicF32::new(CLOCK_RATE_DEFAULT),
            clock_enabled: AtomicBool::new(false),
            trigger: AtomicBool::new(false),
            reset: AtomicBool::new(false),
        }
    }
}

impl Controls {
    pub fn range(&self) -> f32 {
        self.range.load()
    }

    pub fn set_range(&self, range: f32) {
        self.range.store(range);
    }

    pub fn gate_length(&self) -> f32 {
        self.gate_length.load()
    }

    pub fn set_gate_length(&self, seconds: f32) {
        self.gate_length.store(seconds);
    }

    pub fn clock_rate(&self) -> f32 {
        self.clock_rate.load()
    }

    pub fn set_clock_rate(&self, hz: f32) {
        self.clock_rate.store(hz);
    }

    pub fn clock_enabled(&self) -> bool {
        self.clock_enabled.load(Ordering::Relaxed)
    }

    pub fn set_clock_enabled(&self, enabled: bool) {
        self.clock_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Sends a single trigger sample on the next audio frame
    pub fn press_trigger(&self) {
        self.trigger.store(true, Ordering::Relaxed);
    }

    /// Sends a single reset sample on the next audio frame
    pub fn press_reset(&self) {
        self.reset.store(true, Ordering::Relaxed);
    }

    fn take(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Relaxed) && flag.swap(false, Ordering::Relaxed)
    }
}

/// The latest sequencer state, published by the audio thread for display
#[derive(Debug)]
pub struct Monitor {
    outputs: [AtomicF32; 5],
    row: AtomicIsize,
    bad_source: AtomicBool,
    /// replaced series that had to be freed on the audio thread
    retired_dropped: AtomicUsize,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            outputs: std::array::from_fn(|_| AtomicF32::new(0.0)),
            row: AtomicIsize::new(-1),
            bad_source: AtomicBool::new(false),
            retired_dropped: AtomicUsize::new(0),
        }
    }
}

impl Monitor {
    fn publish(&self, outputs: &Outputs, sequencer: &Sequencer) {
        for (slot, value) in self.outputs.iter().zip(outputs.as_array()) {
            slot.store(value);
        }
        self.row.store(sequencer.row(), Ordering::Relaxed);
        self.bad_source.store(sequencer.is_bad_source(), Ordering::Relaxed);
    }

    pub fn outputs(&self) -> Outputs {
        Outputs::from_array(std::array::from_fn(|i| self.outputs[i].load()))
    }

    pub fn row(&self) -> isize {
        self.row.load(Ordering::Relaxed)
    }

    pub fn is_bad_source(&self) -> bool {
        self.bad_source.load(Ordering::Relaxed)
    }

    /// How many replaced series were dropped on the audio thread because the
    /// UI had not collected the previous ones
    pub fn retired_dropped(&self) -> usize {
        self.retired_dropped.load(Ordering::Relaxed)
    }
}

/// The UI side of the audio thread: sends commands, reads back state
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: Sender<EngineCommand>,
    retired: Receiver<DataSeries>,
    pub controls: Arc<Controls>,
    pub monitor: Arc<Monitor>,
}

impl EngineHandle {
    /// Queues a command for the audio thread. Returns false if the queue is
    /// full or the audio side is gone.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("engine command queue is full; dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("audio engine is not running; dropping command");
                false
            }
        }
    }

    /// Drops any series the audio thread has finished with.
    /// Returns how many were collected.
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }
}

/// Owns the sequencer on the audio thread and drives it once per frame
#[derive(Debug)]
pub struct SequencerBackend {
    sequencer: Sequencer,
    clock: Clock,
    commands: Receiver<EngineCommand>,
    retired: Sender<DataSeries>,
    controls: Arc<Controls>,
    monitor: Arc<Monitor>,
}

/// Splits a sequencer into the audio-thread backend and its UI handle
pub fn channel(sequencer: Sequencer) -> (SequencerBackend, EngineHandle) {
    let (command_tx, command_rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
    let (retired_tx, retired_rx) = crossbeam_channel::bounded(RETIRED_CAPACITY);
    let controls = Arc::new(Controls::default());
    let monitor = Arc::new(Monitor::default());

    (
        SequencerBackend {
            sequencer,
            clock: Clock::new(),
            commands: command_rx,
            retired: retired_tx,
            controls: controls.clone(),
            monitor: monitor.clone(),
        },
        EngineHandle {
            commands: command_tx,
            retired: retired_rx,
            controls,
            monitor,
        },
    )
}

impl SequencerBackend {
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Applies every queued command. Replaced series are handed back to the UI
    /// thread to be dropped there.
    pub fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            if let Some(previous) = self.sequencer.apply(command) {
                // a full queue means the UI has stalled, so the series is freed here
                if self.retired.try_send(previous).is_err() {
                    self.monitor.retired_dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Runs the clock and sequencer for one frame
    pub fn process_frame(&mut self, delta: f32) -> Outputs {
        let controls = &self.controls;

        let mut trigger = if controls.clock_enabled() {
            let mut clock_out = [GATE_OUT_LOW];
            self.clock.operate(&[controls.clock_rate()], &mut clock_out, delta);
            clock_out[0]
        } else {
            // enabling the clock starts a fresh period
            self.clock.reset();
            GATE_OUT_LOW
        };
        if Controls::take(&controls.trigger) {
            trigger += GATE_OUT_HIGH;
        }
        let reset = if Controls::take(&controls.reset) {
            GATE_OUT_HIGH
        } else {
            GATE_OUT_LOW
        };

        self.sequencer.tick(
            trigger,
            reset,
            controls.range(),
            controls.gate_length(),
            delta,
        )
    }

    /// Processes one buffer of interleaved frames. The first five channels
    /// carry the outputs scaled so OUTPUT_FULL_SCALE volts is a full-scale sample.
    pub fn fill_buffer<T: Sample + FromSample<f32>>(&mut self, data: &mut [T], channels: usize, delta: f32) {
        self.drain_commands();

        let mut last = Outputs::default();
        for frame in data.chunks_mut(channels.max(1)) {
            last = self.process_frame(delta);
            let values = last.as_array();
            for (i, sample) in frame.iter_mut().enumerate() {
                let value = values
                    .get(i)
                    .map(|volts| (volts / OUTPUT_FULL_SCALE).clamp(-1.0, 1.0))
                    .unwrap_or(0.0);
                *sample = value.to_sample::<T>();
            }
        }

        self.monitor.publish(&last, &self.sequencer);
    }

    /// Converts the backend to a callback used for an audio stream
    pub fn stream_data_callback<T: Sample + FromSample<f32> + 'static>(
        mut self,
        config: &StreamConfig,
    ) -> impl FnMut(&mut [T], &OutputCallbackInfo) + Send + 'static {
        let delta = (1.0_f64 / (config.sample_rate.0 as f64)) as f32;
        let channels = config.channels as usize;
        move |data, _callback_info| {
            self.fill_buffer(data, channels, delta);
        }
    }

    /// Creates an output stream, consuming self
    pub fn into_output_stream<D: DeviceTrait, E: FnMut(StreamError) + Send + 'static>(
        self,
        device: &D,
        config: &StreamConfig,
        error_callback: E,
        timeout: Option<Duration>,
        sample_format: SampleFormat,
    ) -> Result<D::Stream, PlaybackError> {
        let stream = match sample_format {
            SampleFormat::I16 => self.build::<i16, D, E>(device, config, error_callback, timeout)?,
            SampleFormat::U16 => self.build::<u16, D, E>(device, config, error_callback, timeout)?,
            SampleFormat::I32 => self.build::<i32, D, E>(device, config, error_callback, timeout)?,
            SampleFormat::F32 => self.build::<f32, D, E>(device, config, error_callback, timeout)?,
            SampleFormat::F64 => self.build::<f64, D, E>(device, config, error_callback, timeout)?,
            other => return Err(PlaybackError::UnsupportedFormat(other)),
        };
        Ok(stream)
    }

    fn build<T, D, E>(
        self,
        device: &D,
        config: &StreamConfig,
        error_callback: E,
        timeout: Option<Duration>,
    ) -> Result<D::Stream, BuildStreamError>
    where
        T: SizedSample + FromSample<f32> + 'static,
        D: DeviceTrait,
        E: FnMut(StreamError) + Send + 'static,
    {
        device.build_output_stream(
            config,
            self.stream_data_callback::<T>(config),
            error_callback,
            timeout,
        )
    }
}

/// Opens the default output device and starts driving the backend from it
pub fn start_default_output(backend: SequencerBackend) -> Result<cpal::Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;
    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let config = supported.config();

    log::info!(
        "starting output on {} at {}Hz, {} channel(s), {:?}",
        device.name().unwrap_or_else(|_| "unknown device".into()),
        config.sample_rate.0,
        config.channels,
        sample_format
    );

    let stream = backend.into_output_stream(
        &device,
        &config,
        |err| log::error!("audio stream error: {err}"),
        None,
        sample_format,
    )?;
    stream.play()?;
    Ok(stream)
}
