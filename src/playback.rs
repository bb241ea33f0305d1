//! Playback timing: rate ramp, phase generation, envelope engine
//!
//! A voice's sense of time lives here. The rate ramp turns speed/endSpeed
//! into an instantaneous speed curve, the phase generator integrates it into
//! a begin..end position signal (sign-aware for reverse play), and the
//! envelope engine time-dilates a breakpoint envelope against that phase so
//! one shape serves any playback speed.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::envelope::EnvelopeSpec;
use crate::graph::{Signal, SignalNode, VoiceGraph};

/// Per-voice playback parameters, fixed at trigger time.
///
/// `unit_duration` is how long one full 0..1 sweep takes at speed 1, in
/// seconds; for buffer playback this is the buffer's natural duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackState {
    pub begin: f32,
    pub end: f32,
    pub speed: f32,
    pub sustain: f32,
    pub end_speed: Option<f32>,
    pub loop_enabled: bool,
    pub unit_duration: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            begin: 0.0,
            end: 1.0,
            speed: 1.0,
            sustain: 1.0,
            end_speed: None,
            loop_enabled: false,
            unit_duration: 1.0,
        }
    }
}

impl PlaybackState {
    /// -1 for reverse playback, +1 otherwise. Zero speed counts as forward;
    /// the phase just never advances.
    pub fn polarity(&self) -> f32 {
        if self.speed < 0.0 {
            -1.0
        } else {
            1.0
        }
    }
}

/// Instantaneous playback speed over time: a line from `speed` to
/// `end_speed` (default `speed`) over `sustain` seconds, holding after.
pub fn rate_ramp(
    graph: &mut VoiceGraph,
    speed: f32,
    sustain: f32,
    end_speed: Option<f32>,
) -> Signal {
    let node = graph.add_node(SignalNode::Line {
        from: speed,
        to: end_speed.unwrap_or(speed),
        duration: sustain,
        elapsed: RefCell::new(0.0),
    });
    Signal::Node(node)
}

/// Playback position in `[begin, end]`, advancing at the live rate ramp.
///
/// Forward play sweeps begin to end, negative speed sweeps end to begin.
/// Without looping the sweep latches at its far edge and marks the voice
/// done; with looping it wraps and runs until something else ends the voice.
/// A zero-width begin..end window (or zero `unit_duration`) freezes.
pub fn phase_generator(graph: &mut VoiceGraph, state: &PlaybackState) -> Signal {
    let rate = rate_ramp(graph, state.speed, state.sustain, state.end_speed);
    let window = (state.end - state.begin).abs();
    let rate_scale = if window > 0.0 && state.unit_duration > 0.0 {
        1.0 / (state.unit_duration * window)
    } else {
        0.0
    };
    let polarity = state.polarity();
    let phasor = graph.add_node(SignalNode::Phasor {
        rate,
        rate_scale,
        polarity,
        looping: state.loop_enabled,
        phase: RefCell::new(-polarity),
        finished: RefCell::new(false),
    });
    Signal::scale(Signal::Node(phasor), state.begin, state.end)
}

/// Interpolated envelope read at an existing phase signal.
///
/// `stretch` converts the 0..1-style phase into envelope time; callers that
/// already built a phase generator share it here instead of paying for a
/// second one.
pub fn read_envelope(
    graph: &mut VoiceGraph,
    envelope: &EnvelopeSpec,
    phase: Signal,
    stretch: f32,
) -> Signal {
    let node = graph.add_node(SignalNode::EnvelopeRead {
        envelope: envelope.clone(),
        phase,
        stretch,
    });
    Signal::Node(node)
}

/// The full playback envelope engine: phase generation plus a time-dilated
/// envelope read. The stretch factor is the envelope's total time scaled by
/// the average playback speed, so doubling speed without an explicit
/// `end_speed` doubles the stretch.
pub fn playback_envelope(
    graph: &mut VoiceGraph,
    envelope: &EnvelopeSpec,
    state: &PlaybackState,
) -> Signal {
    let phase = phase_generator(graph, state);
    let stretch = envelope.stretch(state.speed, state.end_speed);
    read_envelope(graph, envelope, phase, stretch)
}
