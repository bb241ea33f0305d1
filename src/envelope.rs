//! Breakpoint envelopes read by phase lookup
//!
//! Unlike a triggered ADSR, these envelopes have no internal clock: they are a
//! shape, evaluated at an arbitrary time by `value_at`. The playback engine
//! drives the lookup with its own stretched phase, so one shape serves
//! forward, reverse, looped and speed-warped playback unchanged.

use serde::{Deserialize, Serialize};

/// Segment curvature for the interpolated read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CurveType {
    /// Jump to the segment's end level at its start
    Step,
    Linear,
    /// Equal-ratio interpolation; falls back to linear when an endpoint is
    /// near zero or the endpoints disagree in sign
    Exponential,
    /// Half-cosine ease in/out
    Sine,
    /// Curvature factor: 0 is linear, negative bends early, positive late
    Curve(f32),
}

/// One breakpoint: reach `level` over `time` seconds with `curve`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub level: f32,
    pub time: f32,
    pub curve: CurveType,
}

impl Breakpoint {
    pub fn linear(level: f32, time: f32) -> Self {
        Self {
            level,
            time,
            curve: CurveType::Linear,
        }
    }

    pub fn curved(level: f32, time: f32, curve: f32) -> Self {
        Self {
            level,
            time,
            curve: CurveType::Curve(curve),
        }
    }
}

/// A breakpoint envelope shape.
///
/// The shape starts at `start_level` and traverses each breakpoint in order.
/// Reads outside `[0, total_time]` clamp to the boundary levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSpec {
    pub start_level: f32,
    pub breakpoints: Vec<Breakpoint>,
}

impl EnvelopeSpec {
    pub fn from_breakpoints(start_level: f32, breakpoints: Vec<Breakpoint>) -> Self {
        Self {
            start_level,
            breakpoints,
        }
    }

    /// Attack / hold / release trapezoid, peak level 1.
    pub fn linen(attack: f32, sustain: f32, release: f32) -> Self {
        Self::from_breakpoints(
            0.0,
            vec![
                Breakpoint::linear(1.0, attack.max(0.0)),
                Breakpoint::linear(1.0, sustain.max(0.0)),
                Breakpoint::linear(0.0, release.max(0.0)),
            ],
        )
    }

    /// Percussive attack/release with the conventional -4 curvature.
    pub fn perc(attack: f32, release: f32) -> Self {
        Self::from_breakpoints(
            0.0,
            vec![
                Breakpoint::curved(1.0, attack.max(0.0), -4.0),
                Breakpoint::curved(0.0, release.max(0.0), -4.0),
            ],
        )
    }

    /// Sum of all segment times.
    pub fn total_time(&self) -> f32 {
        self.breakpoints.iter().map(|b| b.time.max(0.0)).sum()
    }

    /// Duration scaling for variable-speed playback:
    /// `total_time * average_speed`, where the average is `speed` itself when
    /// no end speed is given, else the mean of the two.
    pub fn stretch(&self, speed: f32, end_speed: Option<f32>) -> f32 {
        let average = match end_speed {
            None => speed,
            Some(e) => (speed + e) / 2.0,
        };
        self.total_time() * average
    }

    /// Interpolated read at `t` seconds, clamped to the envelope's span.
    pub fn value_at(&self, t: f32) -> f32 {
        let mut level = self.start_level;
        if self.breakpoints.is_empty() {
            return level;
        }
        if t <= 0.0 {
            return level;
        }
        let mut start = 0.0f32;
        for bp in &self.breakpoints {
            let dur = bp.time.max(0.0);
            if t < start + dur {
                let pos = (t - start) / dur;
                return interpolate(level, bp.level, pos, bp.curve);
            }
            level = bp.level;
            start += dur;
        }
        // Past the final breakpoint: hold its level
        level
    }
}

fn interpolate(a: f32, b: f32, pos: f32, curve: CurveType) -> f32 {
    let pos = pos.clamp(0.0, 1.0);
    match curve {
        CurveType::Step => b,
        CurveType::Linear => a + (b - a) * pos,
        CurveType::Exponential => {
            if a.abs() < 1e-6 || b.abs() < 1e-6 || (a > 0.0) != (b > 0.0) {
                a + (b - a) * pos
            } else {
                a * (b / a).powf(pos)
            }
        }
        CurveType::Sine => {
            let eased = (1.0 - (pos * std::f32::consts::PI).cos()) * 0.5;
            a + (b - a) * eased
        }
        CurveType::Curve(c) => {
            if c.abs() < 1e-4 {
                a + (b - a) * pos
            } else {
                let warped = (1.0 - (pos * c).exp()) / (1.0 - c.exp());
                a + (b - a) * warped
            }
        }
    }
}
