//! Integration tests: channel-count panning dispatch
//!
//! The dispatcher picks a panner from the output channel count: one channel
//! mixes down, two balance, more go around the azimuthal circle. These tests
//! render real graphs and verify where the energy lands.

use std::cell::RefCell;
use std::sync::Arc;

use polaron::analysis::{dominant_frequency, rms};
use polaron::bus::ControlBus;
use polaron::graph::{BuildError, Signal, SignalNode, VoiceGraph};
use polaron::pan;

const SAMPLE_RATE: f32 = 44100.0;

fn test_graph() -> VoiceGraph {
    VoiceGraph::new(SAMPLE_RATE, Arc::new(ControlBus::new()))
}

/// Helper: one sine node per frequency, all starting at phase zero
fn sine_sources(graph: &mut VoiceGraph, freqs: &[f32]) -> Vec<Signal> {
    freqs
        .iter()
        .map(|&freq| {
            Signal::Node(graph.add_node(SignalNode::Sine {
                freq: Signal::Value(freq),
                phase: RefCell::new(0.0),
            }))
        })
        .collect()
}

/// Helper: dispatch and render in one go
fn render_dispatch(
    graph: &mut VoiceGraph,
    signals: &[Signal],
    output_channels: usize,
    pan: f32,
    mul: f32,
    frames: usize,
) -> Vec<Vec<f32>> {
    let outputs = pan::dispatch(
        graph,
        signals,
        output_channels,
        Signal::Value(pan),
        Signal::Value(mul),
        None,
    )
    .expect("dispatch should succeed");
    graph.set_outputs(outputs);
    graph.render(frames)
}

// ========== Mono Mixdown ==========

#[test]
fn test_mono_dispatch_sums_and_ignores_pan() {
    let signals = [Signal::Value(0.2), Signal::Value(0.3), Signal::Value(0.4)];

    for pan in [-1.0f32, -0.3, 0.0, 0.7, 1.0] {
        let mut graph = test_graph();
        let out = render_dispatch(&mut graph, &signals, 1, pan, 0.5, 16);
        assert_eq!(out.len(), 1, "mono dispatch emits one channel");
        for &v in &out[0] {
            assert!(
                (v - 0.45).abs() < 1e-6,
                "mono output must be mul * sum at pan={}, got {}",
                pan,
                v
            );
        }
    }
}

// ========== Stereo Balance ==========

#[test]
fn test_single_source_centered_is_equal_power() {
    let mut graph = test_graph();
    let signals = sine_sources(&mut graph, &[220.0]);
    let out = render_dispatch(&mut graph, &signals, 2, 0.0, 1.0, 44100);

    let left = rms(&out[0]);
    let right = rms(&out[1]);
    assert!(
        (left - right).abs() < 1e-4,
        "center pan splits evenly, got L={} R={}",
        left,
        right
    );

    // cos(pi/4) of the source's own RMS on each side
    let expected = std::f32::consts::FRAC_1_SQRT_2 * std::f32::consts::FRAC_1_SQRT_2;
    assert!(
        (left - expected).abs() < 0.01,
        "equal-power gain at center, got {}",
        left
    );
    println!("centered stereo RMS: L={} R={}", left, right);
}

#[test]
fn test_out_of_range_pan_folds_back() {
    // fold(1.5) = 0.5, so a pan of 1.5 must sound identical to 0.5
    let mut folded = test_graph();
    let signals = sine_sources(&mut folded, &[220.0]);
    let out_folded = render_dispatch(&mut folded, &signals, 2, 1.5, 1.0, 256);

    let mut direct = test_graph();
    let signals = sine_sources(&mut direct, &[220.0]);
    let out_direct = render_dispatch(&mut direct, &signals, 2, 0.5, 1.0, 256);

    for ch in 0..2 {
        for (a, b) in out_folded[ch].iter().zip(&out_direct[ch]) {
            assert!((a - b).abs() < 1e-6, "pan 1.5 should fold to pan 0.5");
        }
    }
}

#[test]
fn test_three_sources_reduce_to_balanced_stereo() {
    // Three sources spread -1/0/+1 across a stereo pair, balanced at center:
    // equal energy per channel, the outer sources audible on their own sides.
    let mut graph = test_graph();
    let signals = sine_sources(&mut graph, &[220.0, 330.0, 440.0]);
    let out = render_dispatch(&mut graph, &signals, 2, 0.0, 1.0, 44100);

    let left = rms(&out[0]);
    let right = rms(&out[1]);
    assert!(left > 0.1, "left channel audible, got RMS={}", left);
    assert!(right > 0.1, "right channel audible, got RMS={}", right);
    assert!(
        (left - right).abs() / left < 0.01,
        "centered balance keeps channels equal, got L={} R={}",
        left,
        right
    );

    let dom_left = dominant_frequency(&out[0], SAMPLE_RATE);
    let dom_right = dominant_frequency(&out[1], SAMPLE_RATE);
    assert!(
        (dom_left - 220.0).abs() < 25.0,
        "first source dominates the left channel, got {} Hz",
        dom_left
    );
    assert!(
        (dom_right - 440.0).abs() < 25.0,
        "last source dominates the right channel, got {} Hz",
        dom_right
    );
    println!("3->2 reduce: L dominated by {} Hz, R by {} Hz", dom_left, dom_right);
}

#[test]
fn test_hard_pan_balance_silences_far_side() {
    let mut graph = test_graph();
    let signals = sine_sources(&mut graph, &[220.0, 330.0]);
    let out = render_dispatch(&mut graph, &signals, 2, -1.0, 1.0, 4096);

    assert!(rms(&out[0]) > 0.1, "near side carries the signal");
    assert!(
        rms(&out[1]) < 1e-6,
        "far side fully attenuated, got RMS={}",
        rms(&out[1])
    );
}

// ========== Multichannel ==========

#[test]
fn test_single_source_six_channels_hard_left() {
    // pan -1 anchors the circular sweep at the first channel boundary
    let mut graph = test_graph();
    let out = render_dispatch(&mut graph, &[Signal::Value(1.0)], 6, -1.0, 1.0, 16);

    assert_eq!(out.len(), 6);
    for &v in &out[0] {
        assert!((v - 1.0).abs() < 1e-5, "channel 0 takes it all, got {}", v);
    }
    for (ch, channel) in out.iter().enumerate().skip(1) {
        for &v in channel {
            assert!(v.abs() < 1e-6, "channel {} should be silent, got {}", ch, v);
        }
    }
}

#[test]
fn test_pan_sweep_wraps_the_full_circle() {
    // pan +1 is one full circle from pan -1: both land on channel 0
    let mut low = test_graph();
    let out_low = render_dispatch(&mut low, &[Signal::Value(1.0)], 6, -1.0, 1.0, 4);

    let mut high = test_graph();
    let out_high = render_dispatch(&mut high, &[Signal::Value(1.0)], 6, 1.0, 1.0, 4);

    for ch in 0..6 {
        assert!(
            (out_low[ch][0] - out_high[ch][0]).abs() < 1e-5,
            "channel {} differs across one full turn",
            ch
        );
    }
}

// ========== Errors and Overrides ==========

#[test]
fn test_empty_signal_set_is_a_build_error() {
    for output_channels in [1usize, 2, 6] {
        let mut graph = test_graph();
        let err = pan::dispatch(
            &mut graph,
            &[],
            output_channels,
            Signal::Value(0.0),
            Signal::Value(1.0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::NoInputChannels));
        assert_eq!(err.to_string(), "cannot pan zero channels");
    }
}

#[test]
fn test_legacy_mixing_function_hook_is_refused() {
    let result = pan::set_default_mixing_function(|graph, signals, n, pan, mul| {
        pan::stereo_balance(graph, signals, Signal::Value(1.0), pan, mul).map(|mut out| {
            out.truncate(n);
            out
        })
    });
    assert!(matches!(
        result.unwrap_err(),
        BuildError::DeprecatedMixingFunction
    ));
}

#[test]
fn test_one_off_strategy_overrides_builtin_dispatch() {
    // Route everything to the last channel, ignoring pan entirely
    let strategy = |_graph: &mut VoiceGraph,
                    signals: &[Signal],
                    output_channels: usize,
                    _pan: Signal,
                    mul: Signal|
     -> Result<Vec<Signal>, BuildError> {
        let mut sum = signals[0].clone();
        for sig in &signals[1..] {
            sum = Signal::add(sum, sig.clone());
        }
        let mut outputs = vec![Signal::Value(0.0); output_channels - 1];
        outputs.push(Signal::multiply(sum, mul));
        Ok(outputs)
    };

    let mut graph = test_graph();
    let outputs = pan::dispatch(
        &mut graph,
        &[Signal::Value(0.25)],
        4,
        Signal::Value(-1.0),
        Signal::Value(2.0),
        Some(&strategy),
    )
    .expect("one-off strategy should run");
    graph.set_outputs(outputs);
    let out = graph.render(8);

    assert!(out[0][0].abs() < 1e-6, "built-in would have used channel 0");
    assert!(
        (out[3][0] - 0.5).abs() < 1e-6,
        "strategy owns the routing, got {}",
        out[3][0]
    );
}
