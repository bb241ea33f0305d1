//! Cut-group gating
//!
//! Voices carry a fixed (sample id, cut-group id) pair; the control layer
//! broadcasts a (gate sample, gate cut, cut-all) triple. Each voice decides
//! for itself, once per control block, whether the broadcast applies to it
//! and releases over a short linear ramp if so. No central voice registry:
//! a stale or repeated read of the broadcast is harmless because the release
//! only ever moves toward zero.

use std::cell::RefCell;

use crate::graph::{Signal, SignalNode, VoiceGraph};

pub const DEFAULT_RELEASE_TIME: f32 = 0.02;

/// Does this voice match the live broadcast?
///
/// `cut_all` widens the sample match to every sample; the cut-group id must
/// match either way.
pub fn should_free(
    sample_id: i32,
    cut_group: i32,
    gate_sample: i32,
    gate_cut: i32,
    cut_all: bool,
) -> bool {
    let same_sample = sample_id == gate_sample;
    let same_cut = cut_group == gate_cut;
    (cut_all || same_sample) && same_cut
}

/// Add a cut-group gate for a voice and return its gain signal.
///
/// The gate reads the broadcast fields from the graph's control bus at
/// control rate, holds 1.0 until the broadcast matches, then ramps linearly
/// to zero over `release_time` seconds and marks the voice done. The ramp is
/// latched: once started it finishes even if the broadcast moves on.
pub fn cut_group_gate(
    graph: &mut VoiceGraph,
    sample_id: i32,
    cut_group: i32,
    release_time: f32,
) -> Signal {
    let node = graph.add_node(SignalNode::CutGate {
        sample_id,
        cut_group,
        release_time,
        releasing: RefCell::new(false),
        level: RefCell::new(1.0),
    });
    Signal::Node(node)
}

/// Convenience: gate with identity snapshotted from the bus and the default
/// release time.
pub fn cut_group_gate_from_bus(graph: &mut VoiceGraph) -> Signal {
    let sample_id = graph.bus().sample();
    let cut_group = graph.bus().cut();
    cut_group_gate(graph, sample_id, cut_group, DEFAULT_RELEASE_TIME)
}
