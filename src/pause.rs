//! Silence-driven pause and auto-free
//!
//! A voice that stops making sound should eventually stop costing anything.
//! The controller watches the rectified signal; `grace_time` of uninterrupted
//! sub-threshold output marks the voice done. Resume triggers grant a fresh
//! `grace_time` of immunity so a just-woken voice is not killed before it can
//! produce output, and `pause_immediately` starts the whole voice frozen
//! until the first trigger arrives.

use std::cell::RefCell;

use crate::graph::{Signal, SignalNode, VoiceGraph};

pub const SILENCE_THRESHOLD: f32 = 1e-4;
pub const DEFAULT_GRACE_TIME: f32 = 1.0;

/// Attach a silence monitor to `input` and return the passthrough signal.
///
/// The monitor is registered with the graph so it runs every frame even if
/// the caller drops the returned signal. With `pause_immediately` the voice
/// starts paused: it renders silence and holds all state until a resume
/// trigger on the bus, which also arms the monitor's grace credit.
pub fn silence_pause(
    graph: &mut VoiceGraph,
    input: Signal,
    grace_time: f32,
    pause_immediately: bool,
) -> Signal {
    let seen = graph.bus().resumed_count();
    let node = graph.add_node(SignalNode::SilenceGate {
        input,
        grace_time,
        threshold: SILENCE_THRESHOLD,
        quiet: RefCell::new(0.0),
        credit: RefCell::new(0.0),
        seen_resumes: RefCell::new(seen),
    });
    let signal = Signal::Node(node);
    graph.add_monitor(signal.clone());
    if pause_immediately {
        graph.start_paused();
    }
    signal
}
