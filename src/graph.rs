//! Per-voice signal graph
//!
//! One voice is one dataflow graph: sources, ramps, gains and gates are nodes
//! in an arena, wired together by [`Signal`] handles and evaluated one frame
//! at a time. Building a voice never computes audio — panners and the
//! playback pipeline only add nodes and return handles; rendering happens
//! afterwards, frame by frame.
//!
//! Evaluation rules:
//! - Per-frame memoization: a node referenced by several outputs is evaluated
//!   (and its state advanced) exactly once per frame.
//! - Control-rate nodes (bus-driven gains, the cut gate) are recomputed on
//!   control-block edges (every `control_period` frames) and hold their value
//!   in between. `Signal::Bus` reads are fresh on every evaluation but are
//!   normally consumed inside control-rate nodes.
//! - Graphs are built acyclic: node inputs only reference already-created
//!   nodes. Evaluation recurses over inputs under that invariant.
//!
//! The graph also owns the voice lifecycle: a `done` edge (with its reason)
//! set by whichever terminal detector fires first, and a `paused` flag driven
//! by the control bus resume trigger.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use crate::bus::{ControlBus, ControlField};
use crate::cut_group;
use crate::envelope::EnvelopeSpec;
use crate::fold::fold;
use crate::pan::{self, PanLaw};

/// Handle to a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// A signal handle: constant, node output, control-bus read, or expression.
#[derive(Debug, Clone)]
pub enum Signal {
    Value(f32),
    Node(NodeId),
    Bus(ControlField),
    Expression(Box<SignalExpr>),
}

/// Arithmetic over signal handles, evaluated lazily during rendering.
#[derive(Debug, Clone)]
pub enum SignalExpr {
    Add(Signal, Signal),
    Multiply(Signal, Signal),
    Subtract(Signal, Signal),
    Divide(Signal, Signal),
    /// Map a [-1, 1] signal into [min, max]
    Scale { input: Signal, min: f32, max: f32 },
    /// Triangular reflection into [lo, hi]
    Fold { input: Signal, lo: f32, hi: f32 },
}

impl Signal {
    pub fn add(a: Signal, b: Signal) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Add(a, b)))
    }

    pub fn multiply(a: Signal, b: Signal) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Multiply(a, b)))
    }

    pub fn subtract(a: Signal, b: Signal) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Subtract(a, b)))
    }

    pub fn divide(a: Signal, b: Signal) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Divide(a, b)))
    }

    /// Map a [-1, 1] signal into [min, max].
    pub fn scale(input: Signal, min: f32, max: f32) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Scale { input, min, max }))
    }

    /// Reflect a signal into [lo, hi].
    pub fn fold_range(input: Signal, lo: f32, hi: f32) -> Signal {
        Signal::Expression(Box::new(SignalExpr::Fold { input, lo, hi }))
    }
}

/// Why a voice reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The playback phase completed its sweep
    EnvelopeEnded,
    /// A cut-group broadcast released the voice
    CutGroup,
    /// The output stayed below the silence threshold for the grace period
    SilenceTimeout,
}

/// Construction-time failures. Rendering itself never fails.
#[derive(Debug)]
pub enum BuildError {
    /// A panner was handed an empty signal set
    NoInputChannels,
    /// The retired global mixing-function hook was called
    DeprecatedMixingFunction,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoInputChannels => write!(f, "cannot pan zero channels"),
            BuildError::DeprecatedMixingFunction => write!(
                f,
                "the global mixing function hook is retired; use set_default_panning_strategy"
            ),
        }
    }
}

impl std::error::Error for BuildError {}

/// Evaluation rate of a node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    /// Recomputed every frame
    Audio,
    /// Recomputed on control-block edges, held in between
    Control,
}

/// Processing node. Stateful variants keep their run state in `RefCell`s so
/// the arena can hand out shared references during evaluation.
#[derive(Debug)]
pub enum SignalNode {
    /// Constant source
    Constant { value: f32 },

    /// Sine oscillator (demo and test source)
    Sine { freq: Signal, phase: RefCell<f32> },

    /// White noise source (demo and test source)
    Noise { rng: RefCell<SmallRng> },

    /// Linear ramp from `from` to `to` over `duration` seconds, holding `to`
    Line {
        from: f32,
        to: f32,
        duration: f32,
        elapsed: RefCell<f32>,
    },

    /// Variable-frequency sawtooth in [-1, 1]. `rate` is sweeps per second
    /// before `rate_scale`; `polarity` +1 runs -1 to 1, -1 runs 1 to -1.
    /// One-shot phasors latch at the terminal edge after their first sweep
    /// and mark the voice done.
    Phasor {
        rate: Signal,
        rate_scale: f32,
        polarity: f32,
        looping: bool,
        phase: RefCell<f32>,
        finished: RefCell<bool>,
    },

    /// Clamped interpolated envelope read at `phase * stretch`
    EnvelopeRead {
        envelope: EnvelopeSpec,
        phase: Signal,
        stretch: f32,
    },

    /// Interpolated mono buffer read; `phase` is a buffer fraction in [0, 1]
    BufferRead {
        buffer: Arc<Vec<f32>>,
        phase: Signal,
    },

    /// One channel's gain for a two-channel pan position
    PanGain {
        position: Signal,
        law: PanLaw,
        channel: usize,
    },

    /// One channel's gain under circular azimuthal panning
    AzimuthGain {
        position: Signal,
        width: Signal,
        orientation: Signal,
        channel: usize,
        num_channels: usize,
    },

    /// Cut-group release gate. Latches into a linear release when the bus
    /// broadcast matches; reaching zero marks the voice done.
    CutGate {
        sample_id: i32,
        cut_group: i32,
        release_time: f32,
        releasing: RefCell<bool>,
        level: RefCell<f32>,
    },

    /// Silence monitor and pause controller. Passes `input` through while
    /// accumulating sub-threshold time; a resume trigger grants `grace_time`
    /// of immunity; `grace_time` of uninterrupted silence marks the voice
    /// done.
    SilenceGate {
        input: Signal,
        grace_time: f32,
        threshold: f32,
        quiet: RefCell<f32>,
        credit: RefCell<f32>,
        seen_resumes: RefCell<u32>,
    },
}

impl SignalNode {
    pub fn rate(&self) -> Rate {
        match self {
            SignalNode::PanGain { .. }
            | SignalNode::AzimuthGain { .. }
            | SignalNode::CutGate { .. } => Rate::Control,
            _ => Rate::Audio,
        }
    }
}

const DEFAULT_CONTROL_PERIOD: usize = 64;

/// One voice's dataflow graph plus its lifecycle state.
#[derive(Debug)]
pub struct VoiceGraph {
    sample_rate: f32,
    control_period: usize,
    nodes: Vec<Option<Rc<SignalNode>>>,
    outputs: Vec<Signal>,
    monitors: Vec<Signal>,
    bus: Arc<ControlBus>,
    value_cache: Vec<Option<f32>>,
    control_cache: Vec<f32>,
    frame_count: u64,
    control_tick: bool,
    done: Option<DoneReason>,
    paused: bool,
    resumes_seen: u32,
}

impl VoiceGraph {
    pub fn new(sample_rate: f32, bus: Arc<ControlBus>) -> Self {
        let resumes_seen = bus.resumed_count();
        Self {
            sample_rate,
            control_period: DEFAULT_CONTROL_PERIOD,
            nodes: Vec::new(),
            outputs: Vec::new(),
            monitors: Vec::new(),
            bus,
            value_cache: Vec::new(),
            control_cache: Vec::new(),
            frame_count: 0,
            control_tick: true,
            done: None,
            paused: false,
            resumes_seen,
        }
    }

    /// Override the control block length (frames per control tick).
    pub fn set_control_period(&mut self, frames: usize) {
        self.control_period = frames.max(1);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn control_period(&self) -> usize {
        self.control_period
    }

    /// Seconds between control ticks.
    pub fn control_dt(&self) -> f32 {
        self.control_period as f32 / self.sample_rate
    }

    pub fn bus(&self) -> &Arc<ControlBus> {
        &self.bus
    }

    pub fn add_node(&mut self, node: SignalNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Rc::new(node)));
        self.value_cache.push(None);
        self.control_cache.push(0.0);
        id
    }

    /// Set the final output channels. Length fixes the channel count.
    pub fn set_outputs(&mut self, outputs: Vec<Signal>) {
        self.outputs = outputs;
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Register a signal evaluated once per frame for its control effects
    /// (done detection, silence accounting); its value is discarded.
    pub fn add_monitor(&mut self, signal: Signal) {
        self.monitors.push(signal);
    }

    /// Start the voice paused; it renders silence and advances nothing until
    /// a resume trigger arrives on the bus.
    pub fn start_paused(&mut self) {
        self.paused = true;
        debug!("voice starts paused");
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// First terminal edge wins; later edges keep the original reason.
    pub fn set_done(&mut self, reason: DoneReason) {
        if self.done.is_none() {
            debug!(?reason, frame = self.frame_count, "voice done");
            self.done = Some(reason);
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.is_some()
    }

    pub fn done_reason(&self) -> Option<DoneReason> {
        self.done
    }

    /// Render one frame into `frame_out` (one slot per output channel).
    /// A paused voice emits zeros and holds all node state.
    pub fn process_frame(&mut self, frame_out: &mut [f32]) {
        if self.paused {
            let count = self.bus.resumed_count();
            if count > self.resumes_seen {
                self.resumes_seen = count;
                self.paused = false;
                debug!(frame = self.frame_count, "voice resumed");
            } else {
                frame_out.fill(0.0);
                return;
            }
        }

        self.control_tick = self.frame_count % self.control_period as u64 == 0;
        self.value_cache.fill(None);

        let outputs = std::mem::take(&mut self.outputs);
        for (ch, slot) in frame_out.iter_mut().enumerate() {
            *slot = match outputs.get(ch) {
                Some(sig) => self.eval_signal(sig),
                None => 0.0,
            };
        }
        self.outputs = outputs;

        let monitors = std::mem::take(&mut self.monitors);
        for sig in &monitors {
            self.eval_signal(sig);
        }
        self.monitors = monitors;

        self.frame_count += 1;
    }

    /// Render `frames` frames into channel-major buffers.
    pub fn render(&mut self, frames: usize) -> Vec<Vec<f32>> {
        let channels = self.outputs.len();
        let mut buffers = vec![vec![0.0f32; frames]; channels];
        let mut frame = vec![0.0f32; channels];
        for i in 0..frames {
            self.process_frame(&mut frame);
            for (ch, buf) in buffers.iter_mut().enumerate() {
                buf[i] = frame[ch];
            }
        }
        buffers
    }

    /// Render until the voice reports done, bounded by `max_frames`.
    /// Returns channel-major buffers trimmed to the rendered length.
    pub fn render_until_done(&mut self, max_frames: usize) -> Vec<Vec<f32>> {
        let channels = self.outputs.len();
        let mut buffers = vec![Vec::new(); channels];
        let mut frame = vec![0.0f32; channels];
        for _ in 0..max_frames {
            if self.is_done() {
                break;
            }
            self.process_frame(&mut frame);
            for (ch, buf) in buffers.iter_mut().enumerate() {
                buf.push(frame[ch]);
            }
        }
        buffers
    }

    /// Render `frames` frames interleaved (frame-major).
    pub fn render_interleaved(&mut self, frames: usize) -> Vec<f32> {
        let channels = self.outputs.len();
        let mut out = vec![0.0f32; frames * channels];
        for i in 0..frames {
            let slot = &mut out[i * channels..(i + 1) * channels];
            self.process_frame(slot);
        }
        out
    }

    pub fn eval_signal(&mut self, signal: &Signal) -> f32 {
        match signal {
            Signal::Value(v) => *v,
            Signal::Node(id) => self.eval_node(*id),
            Signal::Bus(field) => self.bus.get(*field),
            Signal::Expression(expr) => self.eval_expr(expr),
        }
    }

    fn eval_expr(&mut self, expr: &SignalExpr) -> f32 {
        match expr {
            SignalExpr::Add(a, b) => self.eval_signal(a) + self.eval_signal(b),
            SignalExpr::Multiply(a, b) => self.eval_signal(a) * self.eval_signal(b),
            SignalExpr::Subtract(a, b) => self.eval_signal(a) - self.eval_signal(b),
            SignalExpr::Divide(a, b) => {
                let d = self.eval_signal(b);
                if d.abs() < 1e-10 {
                    0.0
                } else {
                    self.eval_signal(a) / d
                }
            }
            SignalExpr::Scale { input, min, max } => {
                let x = self.eval_signal(input);
                min + (x + 1.0) * 0.5 * (max - min)
            }
            SignalExpr::Fold { input, lo, hi } => {
                let x = self.eval_signal(input);
                fold(x, *lo, *hi)
            }
        }
    }

    fn eval_node(&mut self, id: NodeId) -> f32 {
        if let Some(Some(cached)) = self.value_cache.get(id.0) {
            return *cached;
        }
        let node = match self.nodes.get(id.0) {
            Some(Some(node)) => Rc::clone(node),
            _ => return 0.0,
        };

        if node.rate() == Rate::Control && !self.control_tick {
            let held = self.control_cache[id.0];
            self.value_cache[id.0] = Some(held);
            return held;
        }

        let value = self.eval_node_inner(&node);

        self.value_cache[id.0] = Some(value);
        if node.rate() == Rate::Control {
            self.control_cache[id.0] = value;
        }
        value
    }

    fn eval_node_inner(&mut self, node: &SignalNode) -> f32 {
        match node {
            SignalNode::Constant { value } => *value,

            SignalNode::Sine { freq, phase } => {
                let f = self.eval_signal(freq);
                let mut ph = phase.borrow_mut();
                let value = (*ph * std::f32::consts::TAU).sin();
                *ph = (*ph + f / self.sample_rate).rem_euclid(1.0);
                value
            }

            SignalNode::Noise { rng } => rng.borrow_mut().gen_range(-1.0..1.0),

            SignalNode::Line {
                from,
                to,
                duration,
                elapsed,
            } => {
                let mut t = elapsed.borrow_mut();
                let value = if *duration <= 0.0 || *t >= *duration {
                    *to
                } else {
                    from + (to - from) * (*t / *duration)
                };
                *t += 1.0 / self.sample_rate;
                value
            }

            SignalNode::Phasor {
                rate,
                rate_scale,
                polarity,
                looping,
                phase,
                finished,
            } => {
                let sweeps_per_sec = self.eval_signal(rate).abs() * rate_scale;
                let mut finish = false;
                let value = {
                    let mut ph = phase.borrow_mut();
                    let mut done = finished.borrow_mut();
                    let value = *ph;
                    if !*done {
                        let step = polarity * 2.0 * sweeps_per_sec / self.sample_rate;
                        let mut next = *ph + step;
                        if !(-1.0..=1.0).contains(&next) {
                            if *looping {
                                next -= polarity * 2.0;
                            } else {
                                next = *polarity;
                                *done = true;
                                finish = true;
                            }
                        }
                        *ph = next;
                    }
                    value
                };
                if finish {
                    self.set_done(DoneReason::EnvelopeEnded);
                }
                value
            }

            SignalNode::EnvelopeRead {
                envelope,
                phase,
                stretch,
            } => {
                let ph = self.eval_signal(phase);
                envelope.value_at(ph * stretch)
            }

            SignalNode::BufferRead { buffer, phase } => {
                if buffer.is_empty() {
                    return 0.0;
                }
                let ph = self.eval_signal(phase).clamp(0.0, 1.0);
                let pos = ph * (buffer.len() - 1) as f32;
                let i = pos.floor() as usize;
                let frac = pos - i as f32;
                let a = buffer[i];
                let b = buffer[(i + 1).min(buffer.len() - 1)];
                a + (b - a) * frac
            }

            SignalNode::PanGain {
                position,
                law,
                channel,
            } => {
                let pos = self.eval_signal(position);
                pan::pan_gain(*law, pos, *channel)
            }

            SignalNode::AzimuthGain {
                position,
                width,
                orientation,
                channel,
                num_channels,
            } => {
                let pos = self.eval_signal(position);
                let w = self.eval_signal(width);
                let o = self.eval_signal(orientation);
                pan::azimuth_gain(pos, w, o, *channel, *num_channels)
            }

            SignalNode::CutGate {
                sample_id,
                cut_group,
                release_time,
                releasing,
                level,
            } => {
                let should = cut_group::should_free(
                    *sample_id,
                    *cut_group,
                    self.bus.gate_sample(),
                    self.bus.gate_cut(),
                    self.bus.cut_all_samples(),
                );
                let mut finish = false;
                let value = {
                    let mut releasing = releasing.borrow_mut();
                    let mut level = level.borrow_mut();
                    if should && !*releasing {
                        *releasing = true;
                        debug!(sample = *sample_id, cut = *cut_group, "cut gate released");
                    }
                    if *releasing && *level > 0.0 {
                        if *release_time <= 0.0 {
                            *level = 0.0;
                        } else {
                            *level = (*level - self.control_dt() / release_time).max(0.0);
                        }
                        if *level <= 0.0 {
                            finish = true;
                        }
                    }
                    *level
                };
                if finish {
                    self.set_done(DoneReason::CutGroup);
                }
                value
            }

            SignalNode::SilenceGate {
                input,
                grace_time,
                threshold,
                quiet,
                credit,
                seen_resumes,
            } => {
                let x = self.eval_signal(input);
                let dt = 1.0 / self.sample_rate;
                let mut finish = false;
                {
                    let count = self.bus.resumed_count();
                    let mut seen = seen_resumes.borrow_mut();
                    let mut credit = credit.borrow_mut();
                    let mut quiet = quiet.borrow_mut();
                    if count > *seen {
                        *seen = count;
                        *credit = *grace_time;
                        *quiet = 0.0;
                        debug!(grace = *grace_time, "silence monitor granted resume credit");
                    }
                    if *credit > 0.0 {
                        *credit -= dt;
                    } else if x.abs() < *threshold {
                        *quiet += dt;
                        if *quiet >= *grace_time {
                            finish = true;
                        }
                    } else {
                        *quiet = 0.0;
                    }
                }
                if finish {
                    self.set_done(DoneReason::SilenceTimeout);
                }
                x
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_graph() -> VoiceGraph {
        VoiceGraph::new(44100.0, Arc::new(ControlBus::new()))
    }

    #[test]
    fn test_expression_arithmetic() {
        let mut graph = test_graph();
        let sum = Signal::add(Signal::Value(2.0), Signal::Value(3.0));
        assert_eq!(graph.eval_signal(&sum), 5.0);
        let prod = Signal::multiply(Signal::Value(2.0), Signal::Value(3.0));
        assert_eq!(graph.eval_signal(&prod), 6.0);
        let diff = Signal::subtract(Signal::Value(2.0), Signal::Value(3.0));
        assert_eq!(graph.eval_signal(&diff), -1.0);
        let quot = Signal::divide(Signal::Value(6.0), Signal::Value(3.0));
        assert_eq!(graph.eval_signal(&quot), 2.0);
    }

    #[test]
    fn test_divide_by_zero_yields_zero() {
        let mut graph = test_graph();
        let quot = Signal::divide(Signal::Value(1.0), Signal::Value(0.0));
        assert_eq!(graph.eval_signal(&quot), 0.0);
    }

    #[test]
    fn test_scale_maps_bipolar_range() {
        let mut graph = test_graph();
        let lo = Signal::scale(Signal::Value(-1.0), 0.25, 0.75);
        let mid = Signal::scale(Signal::Value(0.0), 0.25, 0.75);
        let hi = Signal::scale(Signal::Value(1.0), 0.25, 0.75);
        assert_eq!(graph.eval_signal(&lo), 0.25);
        assert_eq!(graph.eval_signal(&mid), 0.5);
        assert_eq!(graph.eval_signal(&hi), 0.75);
    }

    #[test]
    fn test_fold_expression_reflects() {
        let mut graph = test_graph();
        let folded = Signal::fold_range(Signal::Value(1.2), -1.0, 1.0);
        assert!((graph.eval_signal(&folded) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_bus_signal_reads_live_value() {
        let mut graph = test_graph();
        let pan = Signal::Bus(ControlField::Pan);
        assert_eq!(graph.eval_signal(&pan), 0.0);
        graph.bus().set_pan(-0.5);
        assert_eq!(graph.eval_signal(&pan), -0.5);
    }

    #[test]
    fn test_shared_node_advances_once_per_frame() {
        let mut graph = test_graph();
        let osc = graph.add_node(SignalNode::Sine {
            freq: Signal::Value(441.0),
            phase: RefCell::new(0.0),
        });
        graph.set_outputs(vec![Signal::Node(osc), Signal::Node(osc)]);
        let buffers = graph.render(200);
        assert_eq!(buffers[0], buffers[1], "both outputs read one oscillator");

        // A second graph with a single output must produce the same waveform:
        // sharing must not double-advance the phase.
        let mut solo = test_graph();
        let osc = solo.add_node(SignalNode::Sine {
            freq: Signal::Value(441.0),
            phase: RefCell::new(0.0),
        });
        solo.set_outputs(vec![Signal::Node(osc)]);
        let reference = solo.render(200);
        assert_eq!(buffers[0], reference[0]);
    }

    #[test]
    fn test_control_rate_node_holds_between_ticks() {
        let mut graph = test_graph();
        graph.set_control_period(32);
        let gain = graph.add_node(SignalNode::PanGain {
            position: Signal::Bus(ControlField::Pan),
            law: PanLaw::Balance,
            channel: 1,
        });
        graph.set_outputs(vec![Signal::Node(gain)]);

        // First block computes with pan = 0 -> right gain 1.0
        let first = graph.render(16);
        assert!(first[0].iter().all(|&v| (v - 1.0).abs() < 1e-6));

        // Change pan mid-block: the held value must survive to the block edge
        graph.bus().set_pan(-1.0);
        let rest_of_block = graph.render(16);
        assert!(
            rest_of_block[0].iter().all(|&v| (v - 1.0).abs() < 1e-6),
            "control value changed before the block edge"
        );

        // Next block picks up the new pan -> right gain 0.0
        let next_block = graph.render(16);
        assert!(
            next_block[0].iter().all(|&v| v.abs() < 1e-6),
            "control value not refreshed on the block edge"
        );
    }

    #[test]
    fn test_line_ramps_and_holds() {
        let mut graph = VoiceGraph::new(100.0, Arc::new(ControlBus::new()));
        let line = graph.add_node(SignalNode::Line {
            from: 0.0,
            to: 1.0,
            duration: 1.0,
            elapsed: RefCell::new(0.0),
        });
        graph.set_outputs(vec![Signal::Node(line)]);
        let out = graph.render(150);
        assert_eq!(out[0][0], 0.0);
        assert!((out[0][50] - 0.5).abs() < 1e-6, "midpoint of the ramp");
        assert_eq!(out[0][100], 1.0);
        assert_eq!(out[0][149], 1.0, "holds the end value");
    }

    #[test]
    fn test_paused_graph_renders_zeros_and_freezes_state() {
        let bus = Arc::new(ControlBus::new());
        let mut graph = VoiceGraph::new(100.0, bus.clone());
        let line = graph.add_node(SignalNode::Line {
            from: 0.0,
            to: 1.0,
            duration: 1.0,
            elapsed: RefCell::new(0.0),
        });
        graph.set_outputs(vec![Signal::Node(line)]);
        graph.start_paused();

        let silent = graph.render(50);
        assert!(silent[0].iter().all(|&v| v == 0.0));

        bus.trigger_resume();
        let out = graph.render(11);
        assert_eq!(out[0][0], 0.0, "ramp starts from zero after resume");
        assert!((out[0][10] - 0.1).abs() < 1e-6, "no time passed while paused");
    }

    #[test]
    fn test_done_keeps_first_reason() {
        let mut graph = test_graph();
        graph.set_done(DoneReason::CutGroup);
        graph.set_done(DoneReason::SilenceTimeout);
        assert_eq!(graph.done_reason(), Some(DoneReason::CutGroup));
    }

    #[test]
    fn test_missing_node_evaluates_to_silence() {
        let mut graph = test_graph();
        assert_eq!(graph.eval_signal(&Signal::Node(NodeId(99))), 0.0);
    }

    #[test]
    fn test_render_interleaved_matches_channel_render() {
        let mut graph = test_graph();
        graph.set_outputs(vec![Signal::Value(0.25), Signal::Value(-0.5)]);
        let inter = graph.render_interleaved(4);
        assert_eq!(inter, vec![0.25, -0.5, 0.25, -0.5, 0.25, -0.5, 0.25, -0.5]);
    }
}
