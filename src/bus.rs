//! Control-rate parameter bus
//!
//! One `ControlBus` is shared between the external control layer (writer) and
//! every live voice (readers). Fields are independent atomics: only the latest
//! value of each field matters, so relaxed single-word reads and writes are
//! enough. Float fields are stored as `AtomicU32` bit patterns.
//!
//! The `resumed` trigger is a monotonically increasing counter; a voice
//! detects a trigger edge by comparing the count against the last value it
//! saw, so triggers are never lost between control blocks.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use tracing::debug;

/// Named fields of the control bus.
///
/// Typed keys instead of strings: a misspelled field is a compile error, and
/// `Signal::Bus` stays `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlField {
    /// Bipolar pan position, nominally [-1, 1]
    Pan,
    /// Panning spread of multiple inputs over the output field
    Span,
    /// Spread rescaling by output/input channel ratio, [0, 1]
    Splay,
    /// Azimuthal per-source angular width (2 = spread over adjacent pair)
    PanWidth,
    /// Azimuthal rotation offset
    Orientation,
    /// This voice's sample identity
    Sample,
    /// This voice's cut-group identity
    Cut,
    /// Broadcast: sample id to free
    GateSample,
    /// Broadcast: cut-group id to free
    GateCut,
    /// Broadcast: free matching cut group regardless of sample id
    CutAllSamples,
    /// Broadcast: voice resume trigger (monotonic counter)
    Resumed,
    /// Pitch-follows-speed amount, 0 disables
    SpeedFreq,
}

/// Shared parameter store realizing the control-bus field table.
#[derive(Debug)]
pub struct ControlBus {
    pan: AtomicU32,
    span: AtomicU32,
    splay: AtomicU32,
    pan_width: AtomicU32,
    orientation: AtomicU32,
    speed_freq: AtomicU32,
    sample: AtomicI32,
    cut: AtomicI32,
    gate_sample: AtomicI32,
    gate_cut: AtomicI32,
    cut_all_samples: AtomicBool,
    resumed: AtomicU32,
}

impl Default for ControlBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBus {
    /// Bus with every field at its documented default.
    pub fn new() -> Self {
        Self {
            pan: AtomicU32::new(0.0f32.to_bits()),
            span: AtomicU32::new(1.0f32.to_bits()),
            splay: AtomicU32::new(1.0f32.to_bits()),
            pan_width: AtomicU32::new(2.0f32.to_bits()),
            orientation: AtomicU32::new(0.0f32.to_bits()),
            speed_freq: AtomicU32::new(0.0f32.to_bits()),
            sample: AtomicI32::new(0),
            cut: AtomicI32::new(0),
            gate_sample: AtomicI32::new(0),
            gate_cut: AtomicI32::new(0),
            cut_all_samples: AtomicBool::new(false),
            resumed: AtomicU32::new(0),
        }
    }

    /// Read any field as f32 (bools as 0/1, ids and the trigger count as f32).
    pub fn get(&self, field: ControlField) -> f32 {
        match field {
            ControlField::Pan => load_f32(&self.pan),
            ControlField::Span => load_f32(&self.span),
            ControlField::Splay => load_f32(&self.splay),
            ControlField::PanWidth => load_f32(&self.pan_width),
            ControlField::Orientation => load_f32(&self.orientation),
            ControlField::SpeedFreq => load_f32(&self.speed_freq),
            ControlField::Sample => self.sample.load(Ordering::Relaxed) as f32,
            ControlField::Cut => self.cut.load(Ordering::Relaxed) as f32,
            ControlField::GateSample => self.gate_sample.load(Ordering::Relaxed) as f32,
            ControlField::GateCut => self.gate_cut.load(Ordering::Relaxed) as f32,
            ControlField::CutAllSamples => {
                if self.cut_all_samples.load(Ordering::Relaxed) {
                    1.0
                } else {
                    0.0
                }
            }
            ControlField::Resumed => self.resumed.load(Ordering::Relaxed) as f32,
        }
    }

    pub fn set_pan(&self, v: f32) {
        store_f32(&self.pan, v);
    }

    pub fn set_span(&self, v: f32) {
        store_f32(&self.span, v);
    }

    pub fn set_splay(&self, v: f32) {
        store_f32(&self.splay, v);
    }

    pub fn set_pan_width(&self, v: f32) {
        store_f32(&self.pan_width, v);
    }

    pub fn set_orientation(&self, v: f32) {
        store_f32(&self.orientation, v);
    }

    pub fn set_speed_freq(&self, v: f32) {
        store_f32(&self.speed_freq, v);
    }

    pub fn set_sample(&self, id: i32) {
        self.sample.store(id, Ordering::Relaxed);
    }

    pub fn set_cut(&self, id: i32) {
        self.cut.store(id, Ordering::Relaxed);
    }

    pub fn sample(&self) -> i32 {
        self.sample.load(Ordering::Relaxed)
    }

    pub fn cut(&self) -> i32 {
        self.cut.load(Ordering::Relaxed)
    }

    pub fn gate_sample(&self) -> i32 {
        self.gate_sample.load(Ordering::Relaxed)
    }

    pub fn gate_cut(&self) -> i32 {
        self.gate_cut.load(Ordering::Relaxed)
    }

    pub fn cut_all_samples(&self) -> bool {
        self.cut_all_samples.load(Ordering::Relaxed)
    }

    pub fn set_gate_sample(&self, id: i32) {
        self.gate_sample.store(id, Ordering::Relaxed);
    }

    pub fn set_gate_cut(&self, id: i32) {
        self.gate_cut.store(id, Ordering::Relaxed);
    }

    pub fn set_cut_all_samples(&self, on: bool) {
        self.cut_all_samples.store(on, Ordering::Relaxed);
    }

    /// Broadcast a cut: voices in `cut_group` whose sample matches `sample`
    /// (or any sample when `all` is set) begin their release on their next
    /// control block.
    pub fn broadcast_cut(&self, sample: i32, cut_group: i32, all: bool) {
        self.set_gate_sample(sample);
        self.set_gate_cut(cut_group);
        self.set_cut_all_samples(all);
        debug!(sample, cut_group, all, "cut broadcast");
    }

    /// Fire the resume trigger. Returns the new trigger count.
    pub fn trigger_resume(&self) -> u32 {
        let n = self.resumed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(count = n, "resume trigger");
        n
    }

    pub fn resumed_count(&self) -> u32 {
        self.resumed.load(Ordering::Relaxed)
    }
}

fn load_f32(a: &AtomicU32) -> f32 {
    f32::from_bits(a.load(Ordering::Relaxed))
}

fn store_f32(a: &AtomicU32, v: f32) {
    a.store(v.to_bits(), Ordering::Relaxed)
}
