//! Voice assembly
//!
//! One triggered sound = one voice: a source (buffer channels or a test
//! oscillator) driven by the playback phase, shaped by the envelope engine,
//! panned across the output field, then gated by the cut group and watched
//! by the silence monitor. All parameters are snapshotted at trigger time;
//! live behavior comes in through the control bus.

use std::cell::RefCell;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::bus::{ControlBus, ControlField};
use crate::cut_group;
use crate::envelope::EnvelopeSpec;
use crate::freq_scale;
use crate::graph::{BuildError, DoneReason, Signal, SignalNode, VoiceGraph};
use crate::pan::{self, PanningStrategyFn};
use crate::pause;
use crate::playback::{self, PlaybackState};

/// What a voice plays.
pub enum VoiceSource {
    /// One mono buffer
    Buffer(Arc<Vec<f32>>),
    /// One buffer per input channel, all sharing the playback phase
    Buffers(Vec<Arc<Vec<f32>>>),
    /// Sine test tone at the given frequency, pitch-scaled by the
    /// frequency scaler
    Sine(f32),
    /// White noise test source
    Noise,
}

/// Trigger-time voice parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    pub output_channels: usize,
    pub envelope: EnvelopeSpec,
    pub playback: PlaybackState,
    pub accelerate: f32,
    pub pan: f32,
    pub mul: f32,
    pub sample_id: i32,
    pub cut_group: i32,
    pub release_time: f32,
    pub grace_time: f32,
    pub pause_immediately: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            output_channels: 2,
            envelope: EnvelopeSpec::linen(0.01, 0.98, 0.01),
            playback: PlaybackState::default(),
            accelerate: 0.0,
            pan: 0.0,
            mul: 1.0,
            sample_id: 0,
            cut_group: 0,
            release_time: cut_group::DEFAULT_RELEASE_TIME,
            grace_time: pause::DEFAULT_GRACE_TIME,
            pause_immediately: false,
        }
    }
}

impl VoiceParams {
    /// Snapshot the per-voice fields a trigger reads off the bus.
    pub fn from_bus(bus: &ControlBus) -> Self {
        Self {
            pan: bus.get(ControlField::Pan),
            sample_id: bus.sample(),
            cut_group: bus.cut(),
            ..Default::default()
        }
    }
}

/// A fully wired voice graph.
#[derive(Debug)]
pub struct Voice {
    graph: VoiceGraph,
}

impl Voice {
    pub fn build(
        sample_rate: f32,
        bus: Arc<ControlBus>,
        source: VoiceSource,
        params: &VoiceParams,
    ) -> Result<Self, BuildError> {
        Self::build_with_strategy(sample_rate, bus, source, params, None)
    }

    /// Build with a one-off panning strategy overriding the dispatch.
    pub fn build_with_strategy(
        sample_rate: f32,
        bus: Arc<ControlBus>,
        source: VoiceSource,
        params: &VoiceParams,
        strategy: Option<&PanningStrategyFn>,
    ) -> Result<Self, BuildError> {
        let mut graph = VoiceGraph::new(sample_rate, bus);

        let phase = playback::phase_generator(&mut graph, &params.playback);
        let stretch = params
            .envelope
            .stretch(params.playback.speed, params.playback.end_speed);
        let env = playback::read_envelope(&mut graph, &params.envelope, phase.clone(), stretch);

        let sources = Self::build_source(&mut graph, source, phase, params);
        if sources.is_empty() {
            return Err(BuildError::NoInputChannels);
        }
        let shaped: Vec<Signal> = sources
            .iter()
            .map(|s| Signal::multiply(s.clone(), env.clone()))
            .collect();

        let outputs = pan::dispatch(
            &mut graph,
            &shaped,
            params.output_channels,
            Signal::Value(params.pan),
            Signal::Value(params.mul),
            strategy,
        )?;

        let gate = cut_group::cut_group_gate(
            &mut graph,
            params.sample_id,
            params.cut_group,
            params.release_time,
        );
        let gated: Vec<Signal> = outputs
            .into_iter()
            .map(|o| Signal::multiply(o, gate.clone()))
            .collect();

        // The silence monitor watches the pre-pan mix so a hard-panned voice
        // is judged by what it produces, not where it lands.
        let mut mix = shaped[0].clone();
        for s in &shaped[1..] {
            mix = Signal::add(mix, s.clone());
        }
        let monitored = Signal::multiply(mix, gate);
        pause::silence_pause(
            &mut graph,
            monitored,
            params.grace_time,
            params.pause_immediately,
        );

        graph.set_outputs(gated);
        Ok(Self { graph })
    }

    fn build_source(
        graph: &mut VoiceGraph,
        source: VoiceSource,
        phase: Signal,
        params: &VoiceParams,
    ) -> Vec<Signal> {
        match source {
            VoiceSource::Buffer(buffer) => {
                let node = graph.add_node(SignalNode::BufferRead { buffer, phase });
                vec![Signal::Node(node)]
            }
            VoiceSource::Buffers(buffers) => buffers
                .into_iter()
                .map(|buffer| {
                    let node = graph.add_node(SignalNode::BufferRead {
                        buffer,
                        phase: phase.clone(),
                    });
                    Signal::Node(node)
                })
                .collect(),
            VoiceSource::Sine(freq) => {
                let scale = freq_scale::frequency_scaler(
                    graph,
                    params.playback.speed,
                    params.accelerate,
                    params.playback.sustain,
                    None,
                );
                let node = graph.add_node(SignalNode::Sine {
                    freq: Signal::multiply(Signal::Value(freq), scale),
                    phase: RefCell::new(0.0),
                });
                vec![Signal::Node(node)]
            }
            VoiceSource::Noise => {
                let node = graph.add_node(SignalNode::Noise {
                    rng: RefCell::new(SmallRng::from_entropy()),
                });
                vec![Signal::Node(node)]
            }
        }
    }

    pub fn num_channels(&self) -> usize {
        self.graph.num_outputs()
    }

    pub fn is_done(&self) -> bool {
        self.graph.is_done()
    }

    pub fn done_reason(&self) -> Option<DoneReason> {
        self.graph.done_reason()
    }

    pub fn is_paused(&self) -> bool {
        self.graph.is_paused()
    }

    pub fn render(&mut self, frames: usize) -> Vec<Vec<f32>> {
        self.graph.render(frames)
    }

    pub fn render_until_done(&mut self, max_frames: usize) -> Vec<Vec<f32>> {
        self.graph.render_until_done(max_frames)
    }

    pub fn render_interleaved(&mut self, frames: usize) -> Vec<f32> {
        self.graph.render_interleaved(frames)
    }

    pub fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut VoiceGraph {
        &mut self.graph
    }
}
