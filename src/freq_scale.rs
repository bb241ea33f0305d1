//! Pitch-follows-speed scaling
//!
//! Variable-speed playback changes duration; whether it also changes pitch
//! is a choice. The frequency scaler turns the playback speed ramp into a
//! multiplier for oscillator frequencies: speedFreq 0 pins it to 1 (pitch
//! untouched), speedFreq 1 tracks the speed ramp exactly, values between
//! interpolate. Runs at control rate conceptually; the expression itself is
//! rate-agnostic.

use crate::bus::ControlField;
use crate::graph::{Signal, VoiceGraph};
use crate::playback::rate_ramp;

/// Frequency multiplier from the speed ramp.
///
/// The ramp runs from `|speed|` to `|speed| * (1 + accelerate)` over
/// `sustain` seconds; the output is `speedFreq * (ramp - 1) + 1`. When
/// `speed_freq` is not supplied it reads live from the control bus, which
/// defaults to 0.
pub fn frequency_scaler(
    graph: &mut VoiceGraph,
    speed: f32,
    accelerate: f32,
    sustain: f32,
    speed_freq: Option<Signal>,
) -> Signal {
    let base = speed.abs();
    let ramp = rate_ramp(graph, base, sustain, Some(base * (1.0 + accelerate)));
    let sf = speed_freq.unwrap_or(Signal::Bus(ControlField::SpeedFreq));
    Signal::add(
        Signal::multiply(sf, Signal::subtract(ramp, Signal::Value(1.0))),
        Signal::Value(1.0),
    )
}
