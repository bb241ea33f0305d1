//! Panners and the channel-count dispatcher
//!
//! Three output-width-specialized panners and the dispatcher that selects
//! among them: one channel is a pure mixdown, two channels go through the
//! stereo balance panner, anything wider goes through the azimuthal splay
//! panner. A process-wide default strategy can replace the whole dispatch,
//! and any single call can override it with a one-off strategy.
//!
//! Everything here is graph construction: panners add gain nodes and
//! expressions to the voice graph and return one `Signal` per output channel.
//! No audio is computed until the graph renders.

use std::f32::consts::{FRAC_PI_4, PI};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::bus::ControlField;
use crate::graph::{BuildError, Signal, SignalNode, VoiceGraph};

/// Two-channel gain law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanLaw {
    /// Quarter-cycle cos/sin law, constant power across the pair
    EqualPower,
    /// Per-side linear attenuation, unity at center
    Balance,
}

/// Gain of `channel` (0 = left, 1 = right) at `position` in [-1, 1].
///
/// Out-of-range positions clamp to the edges (table-lookup semantics); they
/// do not reflect. Callers wanting reflection fold the position first.
pub fn pan_gain(law: PanLaw, position: f32, channel: usize) -> f32 {
    let pos = position.clamp(-1.0, 1.0);
    match law {
        PanLaw::EqualPower => {
            let angle = (pos + 1.0) * FRAC_PI_4;
            if channel == 0 {
                angle.cos()
            } else {
                angle.sin()
            }
        }
        PanLaw::Balance => {
            if channel == 0 {
                (1.0 - pos).min(1.0)
            } else {
                (1.0 + pos).min(1.0)
            }
        }
    }
}

/// Gain of output `channel` out of `num_channels` for a circular panner.
///
/// `position` is cyclic with period 2 (a full circle); channel j peaks at
/// position `2j / num_channels`. `width` is the angular window in channel
/// units (2 spreads a source over an adjacent pair); `orientation` rotates
/// the whole field in channel units.
pub fn azimuth_gain(
    position: f32,
    width: f32,
    orientation: f32,
    channel: usize,
    num_channels: usize,
) -> f32 {
    if num_channels == 0 {
        return 0.0;
    }
    let m = num_channels as f32;
    let w = width.max(1e-6);
    let zpos = position * 0.5 * m + w * 0.5 + orientation;
    let range = m / w;
    let mut chanpos = (zpos - channel as f32) / w;
    chanpos -= range * (chanpos / range).floor();
    if chanpos >= 1.0 {
        0.0
    } else {
        (chanpos * PI).sin()
    }
}

/// Pan one signal across a pair of channels at a position signal.
fn pan_pair(
    graph: &mut VoiceGraph,
    input: Signal,
    position: Signal,
    mul: Signal,
    law: PanLaw,
) -> Vec<Signal> {
    (0..2)
        .map(|channel| {
            let gain = graph.add_node(SignalNode::PanGain {
                position: position.clone(),
                law,
                channel,
            });
            Signal::multiply(
                Signal::multiply(input.clone(), Signal::Node(gain)),
                mul.clone(),
            )
        })
        .collect()
}

/// Balance an existing stereo pair at a position signal.
fn balance_pair(
    graph: &mut VoiceGraph,
    left: Signal,
    right: Signal,
    position: Signal,
    mul: Signal,
) -> Vec<Signal> {
    let mut out = Vec::with_capacity(2);
    for (channel, side) in [left, right].into_iter().enumerate() {
        let gain = graph.add_node(SignalNode::PanGain {
            position: position.clone(),
            law: PanLaw::Balance,
            channel,
        });
        out.push(Signal::multiply(
            Signal::multiply(side, Signal::Node(gain)),
            mul.clone(),
        ));
    }
    out
}

/// Two-channel pan/balance.
///
/// One input is equal-power panned, two inputs are balanced, more are first
/// reduced to an equal-energy stereo pair (spread by `span`) and then
/// balanced. The pan position is folded into [-1, 1] in every case.
pub fn stereo_balance(
    graph: &mut VoiceGraph,
    signals: &[Signal],
    span: Signal,
    pan: Signal,
    mul: Signal,
) -> Result<Vec<Signal>, BuildError> {
    let position = Signal::fold_range(pan, -1.0, 1.0);
    match signals.len() {
        0 => Err(BuildError::NoInputChannels),
        1 => Ok(pan_pair(
            graph,
            signals[0].clone(),
            position,
            mul,
            PanLaw::EqualPower,
        )),
        2 => Ok(balance_pair(
            graph,
            signals[0].clone(),
            signals[1].clone(),
            position,
            mul,
        )),
        n => {
            let level = 1.0 / (n as f32).sqrt();
            let mut left = Signal::Value(0.0);
            let mut right = Signal::Value(0.0);
            for (i, sig) in signals.iter().enumerate() {
                let spread = i as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let pos = Signal::multiply(Signal::Value(spread), span.clone());
                for channel in 0..2 {
                    let gain = graph.add_node(SignalNode::PanGain {
                        position: pos.clone(),
                        law: PanLaw::EqualPower,
                        channel,
                    });
                    let term = Signal::multiply(sig.clone(), Signal::Node(gain));
                    if channel == 0 {
                        left = Signal::add(left, term);
                    } else {
                        right = Signal::add(right, term);
                    }
                }
            }
            left = Signal::multiply(left, Signal::Value(level));
            right = Signal::multiply(right, Signal::Value(level));
            Ok(balance_pair(graph, left, right, position, mul))
        }
    }
}

/// Non-azimuthal multichannel spread to a stereo pair.
///
/// A single input is equal-power panned at the raw `pan` value (no fold —
/// deliberately unlike [`stereo_balance`]; the gain law clamps instead, so
/// far-out positions pin to an edge rather than reflecting). Several inputs
/// are placed at `fold(i/(n-1) + pan*2 - 1)` and summed without
/// normalization. `_span` is accepted for signature parity with the other
/// panners; the position formula does not use it.
pub fn linear_splay(
    graph: &mut VoiceGraph,
    signals: &[Signal],
    _span: Signal,
    pan: Signal,
    mul: Signal,
) -> Result<Vec<Signal>, BuildError> {
    let n = signals.len();
    match n {
        0 => Err(BuildError::NoInputChannels),
        1 => Ok(pan_pair(
            graph,
            signals[0].clone(),
            pan,
            mul,
            PanLaw::EqualPower,
        )),
        _ => {
            let pan1 = Signal::subtract(
                Signal::multiply(pan, Signal::Value(2.0)),
                Signal::Value(1.0),
            );
            let mut left = Signal::Value(0.0);
            let mut right = Signal::Value(0.0);
            for (i, sig) in signals.iter().enumerate() {
                let base = i as f32 / (n - 1) as f32;
                let pos = Signal::fold_range(
                    Signal::add(Signal::Value(base), pan1.clone()),
                    -1.0,
                    1.0,
                );
                for channel in 0..2 {
                    let gain = graph.add_node(SignalNode::PanGain {
                        position: pos.clone(),
                        law: PanLaw::EqualPower,
                        channel,
                    });
                    let term = Signal::multiply(sig.clone(), Signal::Node(gain));
                    if channel == 0 {
                        left = Signal::add(left, term);
                    } else {
                        right = Signal::add(right, term);
                    }
                }
            }
            Ok(vec![
                Signal::multiply(left, mul.clone()),
                Signal::multiply(right, mul),
            ])
        }
    }
}

/// Circular N-to-M panning with span/splay/width/orientation.
///
/// The effective span is `span * (M/n + splay * (1 - M/n))`: at splay 0 the
/// n sources cluster within an M/n arc of the circle, at splay 1 they cover
/// the full circle. `pan + 1` anchors a [-1, 1] pan sweep at the first
/// output channel boundary. Source i sits at offset `(i/n) * 2 * span'`.
pub fn azimuthal_splay(
    graph: &mut VoiceGraph,
    num_channels: usize,
    signals: &[Signal],
    span: Signal,
    pan: Signal,
    mul: Signal,
    splay: Signal,
    width: Signal,
    orientation: Signal,
) -> Result<Vec<Signal>, BuildError> {
    if signals.is_empty() {
        return Err(BuildError::NoInputChannels);
    }
    let n = signals.len();
    let ratio = num_channels as f32 / n as f32;
    let effective_span = Signal::multiply(
        span,
        Signal::add(
            Signal::Value(ratio),
            Signal::multiply(splay, Signal::Value(1.0 - ratio)),
        ),
    );
    let anchor = Signal::add(pan, Signal::Value(1.0));

    let mut outputs: Vec<Signal> = vec![Signal::Value(0.0); num_channels];
    for (i, sig) in signals.iter().enumerate() {
        let offset = Signal::multiply(
            Signal::Value(2.0 * i as f32 / n as f32),
            effective_span.clone(),
        );
        let position = Signal::add(anchor.clone(), offset);
        for (channel, out) in outputs.iter_mut().enumerate() {
            let gain = graph.add_node(SignalNode::AzimuthGain {
                position: position.clone(),
                width: width.clone(),
                orientation: orientation.clone(),
                channel,
                num_channels,
            });
            *out = Signal::add(
                out.clone(),
                Signal::multiply(sig.clone(), Signal::Node(gain)),
            );
        }
    }
    Ok(outputs
        .into_iter()
        .map(|out| Signal::multiply(out, mul.clone()))
        .collect())
}

/// Replaceable dispatch signature: signal set, output channel count, pan and
/// overall gain in; one signal per output channel out.
pub type PanningStrategyFn = dyn Fn(&mut VoiceGraph, &[Signal], usize, Signal, Signal) -> Result<Vec<Signal>, BuildError>
    + Send
    + Sync;

struct PanningConfig {
    strategy: Option<Arc<PanningStrategyFn>>,
}

lazy_static! {
    static ref DEFAULT_PANNING: ArcSwap<PanningConfig> =
        ArcSwap::from_pointee(PanningConfig { strategy: None });
}

static STRATEGY_READS: AtomicUsize = AtomicUsize::new(0);

/// Install the process-wide default panning strategy.
///
/// Meant for configuration time, before any voice is built; the swap itself
/// is atomic, so a late replacement is safe but is logged because voices
/// built earlier keep the graphs the old strategy gave them.
pub fn set_default_panning_strategy<F>(strategy: F)
where
    F: Fn(&mut VoiceGraph, &[Signal], usize, Signal, Signal) -> Result<Vec<Signal>, BuildError>
        + Send
        + Sync
        + 'static,
{
    let reads = STRATEGY_READS.load(Ordering::Relaxed);
    if reads > 0 {
        warn!(
            voices = reads,
            "replacing the default panning strategy after voices were built"
        );
    }
    DEFAULT_PANNING.store(Arc::new(PanningConfig {
        strategy: Some(Arc::new(strategy)),
    }));
    debug!("default panning strategy installed");
}

/// Remove any installed strategy, restoring the built-in dispatch.
pub fn reset_default_panning_strategy() {
    DEFAULT_PANNING.store(Arc::new(PanningConfig { strategy: None }));
}

/// The currently installed strategy, if any.
pub fn default_panning_strategy() -> Option<Arc<PanningStrategyFn>> {
    DEFAULT_PANNING.load_full().strategy.clone()
}

/// Retired hook kept for source compatibility: the global mixing function
/// predates the strategy slot. Logs and refuses; nothing is installed.
pub fn set_default_mixing_function<F>(_mixing: F) -> Result<(), BuildError>
where
    F: Fn(&mut VoiceGraph, &[Signal], usize, Signal, Signal) -> Result<Vec<Signal>, BuildError>
        + Send
        + Sync
        + 'static,
{
    warn!("set_default_mixing_function is retired; use set_default_panning_strategy");
    Err(BuildError::DeprecatedMixingFunction)
}

/// Pan a signal set across `output_channels` outputs.
///
/// `strategy` overrides the dispatch for this call only; otherwise the
/// installed process-wide strategy applies, and with none installed the
/// built-in dispatch runs: 1 channel mixes down (pan ignored), 2 channels
/// balance, anything else splays azimuthally with span/splay/width/
/// orientation read live from the control bus.
pub fn dispatch(
    graph: &mut VoiceGraph,
    signals: &[Signal],
    output_channels: usize,
    pan: Signal,
    mul: Signal,
    strategy: Option<&PanningStrategyFn>,
) -> Result<Vec<Signal>, BuildError> {
    STRATEGY_READS.fetch_add(1, Ordering::Relaxed);
    if let Some(one_off) = strategy {
        return one_off(graph, signals, output_channels, pan, mul);
    }
    let config = DEFAULT_PANNING.load_full();
    if let Some(installed) = &config.strategy {
        return installed(graph, signals, output_channels, pan, mul);
    }
    built_in_dispatch(graph, signals, output_channels, pan, mul)
}

fn built_in_dispatch(
    graph: &mut VoiceGraph,
    signals: &[Signal],
    output_channels: usize,
    pan: Signal,
    mul: Signal,
) -> Result<Vec<Signal>, BuildError> {
    if signals.is_empty() {
        return Err(BuildError::NoInputChannels);
    }
    match output_channels {
        1 => {
            let mut sum = signals[0].clone();
            for sig in &signals[1..] {
                sum = Signal::add(sum, sig.clone());
            }
            Ok(vec![Signal::multiply(sum, mul)])
        }
        2 => stereo_balance(graph, signals, Signal::Bus(ControlField::Span), pan, mul),
        _ => azimuthal_splay(
            graph,
            output_channels,
            signals,
            Signal::Bus(ControlField::Span),
            pan,
            mul,
            Signal::Bus(ControlField::Splay),
            Signal::Bus(ControlField::PanWidth),
            Signal::Bus(ControlField::Orientation),
        ),
    }
}
