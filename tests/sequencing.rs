use std::io::Write;

use loud_numbers::{
    circuit::Circuit,
    constants::{GATE_OUT_HIGH, SAMPLE_INTERVAL},
    csv_loader,
    data_series::DataSeries,
    playback,
    sequencer::{EngineCommand, Outputs, Sequencer, SequencerState},
};

const PERIOD: usize = 5000;
const HIGH_FOR: usize = 100;

/// Drives one trigger period and counts how long gate and end stay high
fn run_period(sequencer: &mut Sequencer, range: f32) -> (Outputs, usize, usize) {
    let mut first = Outputs::default();
    let mut gate_high = 0;
    let mut end_high = 0;
    for i in 0..PERIOD {
        let trigger = if i < HIGH_FOR { GATE_OUT_HIGH } else { 0.0 };
        let outputs = sequencer.tick(trigger, 0.0, range, 0.1, SAMPLE_INTERVAL);
        if i == 0 {
            first = outputs;
        }
        if outputs.gate == GATE_OUT_HIGH {
            gate_high += 1;
        }
        if outputs.end == GATE_OUT_HIGH {
            end_high += 1;
        }
    }
    (first, gate_high, end_high)
}

#[test]
fn plays_embedded_series_to_the_end() {
    let mut sequencer = Sequencer::default();
    let len = sequencer.series().len();
    assert_eq!(len, 65);
    assert_eq!(sequencer.state(), SequencerState::IdleBeforeStart);

    for row in 0..len {
        let (first, gate_high, end_high) = run_period(&mut sequencer, 2.0);
        assert_eq!(sequencer.row(), row as isize);
        assert_eq!(gate_high, 4409, "gate length at row {row}");
        assert_eq!(end_high, 0);
        assert!((-5.0..=5.0).contains(&first.bipolar));
        assert!((0.0..=10.0).contains(&first.unipolar));
        assert!((0.0..=2.0).contains(&first.pitch));

        if row == 0 {
            assert_eq!(first.unipolar, 0.0);
            assert_eq!(first.pitch, 0.0);
        }
        if row == len - 1 {
            assert!((first.unipolar - 10.0).abs() < 1e-4);
            assert!((first.bipolar - 5.0).abs() < 1e-4);
            assert_eq!(first.pitch, 2.0);
        }
    }

    // one edge past the last sample
    let (first, gate_high, end_high) = run_period(&mut sequencer, 2.0);
    assert_eq!(sequencer.state(), SequencerState::Finished);
    assert_eq!(sequencer.row(), len as isize);
    assert_eq!(gate_high, 0);
    assert_eq!(end_high, 440);
    // the last CV is held
    assert!((first.unipolar - 10.0).abs() < 1e-4);
}

#[test]
fn reset_after_finishing_replays_from_the_top() {
    let mut sequencer = Sequencer::default();
    let len = sequencer.series().len();
    for _ in 0..=len {
        run_period(&mut sequencer, 2.0);
    }
    assert_eq!(sequencer.state(), SequencerState::Finished);

    // further triggers only refire the end pulse
    let (first, gate_high, end_high) = run_period(&mut sequencer, 2.0);
    assert_eq!((gate_high, end_high), (0, 440));
    assert!((first.unipolar - 10.0).abs() < 1e-4);

    let mut gate_high = 0;
    for i in 0..PERIOD {
        let reset = if i < HIGH_FOR { GATE_OUT_HIGH } else { 0.0 };
        let outputs = sequencer.tick(0.0, reset, 2.0, 0.1, SAMPLE_INTERVAL);
        if i == 0 {
            assert_eq!(sequencer.row(), 0);
            assert_eq!((outputs.bipolar, outputs.unipolar, outputs.pitch), (-5.0, 0.0, 0.0));
            assert_eq!(outputs.end, 0.0);
        }
        if outputs.gate == GATE_OUT_HIGH {
            gate_high += 1;
        }
    }
    assert_eq!(gate_high, 4409);
    assert_eq!(sequencer.state(), SequencerState::Playing);

    run_period(&mut sequencer, 2.0);
    assert_eq!(sequencer.row(), 1);
}

#[test]
fn reset_mid_run_returns_to_first_sample() {
    let mut sequencer = Sequencer::default();
    for _ in 0..31 {
        run_period(&mut sequencer, 2.0);
    }
    assert_eq!(sequencer.row(), 30);

    let outputs = sequencer.tick(0.0, GATE_OUT_HIGH, 2.0, 0.1, SAMPLE_INTERVAL);
    assert_eq!(sequencer.row(), 0);
    assert_eq!(outputs.bipolar, -5.0);
    assert_eq!(outputs.unipolar, 0.0);
    sequencer.tick(0.0, 0.0, 2.0, 0.1, SAMPLE_INTERVAL);

    run_period(&mut sequencer, 2.0);
    assert_eq!(sequencer.row(), 1);
}

#[test]
fn missing_cells_hold_cv_and_skip_gate() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "day;rain\n1;0\n2;\n3;10\n").unwrap();

    let loaded = csv_loader::load(file.path(), 1).unwrap();
    assert_eq!(loaded.columns, vec!["day", "rain"]);

    let mut sequencer = Sequencer::default();
    sequencer.apply(EngineCommand::Adopt(loaded.series));

    let (first, gate_high, _) = run_period(&mut sequencer, 1.0);
    assert_eq!(first.unipolar, 0.0);
    assert_eq!(gate_high, 4409);

    let (first, gate_high, _) = run_period(&mut sequencer, 1.0);
    assert_eq!(sequencer.row(), 1);
    assert_eq!(first.unipolar, 0.0);
    assert_eq!(gate_high, 0);

    let (first, gate_high, _) = run_period(&mut sequencer, 1.0);
    assert_eq!(first.unipolar, 10.0);
    assert_eq!(first.pitch, 1.0);
    assert_eq!(gate_high, 4409);
}

#[test]
fn pitch_follows_range() {
    let cases = [(1.0, 0.0, 1.0), (3.0, 0.0, 3.0), (4.0, 0.0, 4.0), (6.0, -2.0, 4.0), (8.0, -4.0, 4.0)];
    for (range, low, high) in cases {
        let mut sequencer = Sequencer::new(DataSeries::from_values(vec![1.0, 2.0]));
        let (first, _, _) = run_period(&mut sequencer, range);
        assert_eq!(first.pitch, low, "range {range}");
        let (first, _, _) = run_period(&mut sequencer, range);
        assert_eq!(first.pitch, high, "range {range}");
    }
}

#[test]
fn circuit_ports_match_outputs() {
    let mut sequencer = Sequencer::new(DataSeries::from_values(vec![0.0, 1.0]));
    let ports = sequencer.specification();
    assert_eq!(ports.input_count(), 4);
    assert_eq!(ports.output_names[3], "Gate");

    let mut outputs = [0.0; 5];
    sequencer.operate(&[10.0, 0.0, 2.0, 0.1], &mut outputs, SAMPLE_INTERVAL);
    assert_eq!(Outputs::from_array(outputs).gate, GATE_OUT_HIGH);
    assert_eq!(outputs[0], -5.0);
}

#[test]
fn bad_source_silences_until_next_load() {
    let (mut backend, engine) = playback::channel(Sequencer::default());
    engine.controls.press_trigger();
    backend.process_frame(SAMPLE_INTERVAL);
    assert_eq!(backend.sequencer().row(), 0);

    assert!(engine.send(EngineCommand::BadSource));
    backend.drain_commands();
    let outputs = backend.process_frame(SAMPLE_INTERVAL);
    assert_eq!(outputs, Outputs::default());
    assert!(backend.sequencer().is_bad_source());

    assert!(engine.send(EngineCommand::Adopt(DataSeries::from_values(vec![3.0]))));
    backend.drain_commands();
    assert!(!backend.sequencer().is_bad_source());
    assert_eq!(backend.sequencer().row(), -1);
    assert_eq!(engine.collect_retired(), 1);
}
