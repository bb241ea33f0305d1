//! # Polaron - Per-Voice Spatialization and Playback Core
//!
//! Polaron is the per-voice heart of a sample-triggering audio engine: given
//! any number of input channels it produces a correctly panned signal across
//! any number of output channels, and computes the envelope, playback phase,
//! rate ramp and pitch scaling needed to play a sound at variable speed,
//! forwards or in reverse, with optional looping. Voices terminate on their
//! own: by finishing playback, by a broadcast cut-group release, or by a
//! silence timeout.
//!
//! ## Core Features
//!
//! - **Channel-Count Panning Dispatch**: mono mixdown, stereo balance, or
//!   azimuthal (circular) splay chosen by output width
//! - **Replaceable Panning Strategy**: one process-wide hook, plus per-call
//!   overrides, for custom speaker layouts
//! - **Variable-Speed Playback**: phase generation under a live speed ramp,
//!   with reverse play and begin/end windows
//! - **Time-Dilated Envelopes**: one breakpoint shape serves every playback
//!   speed through the stretch factor
//! - **Cut Groups**: broadcast-driven early release with no central voice
//!   bookkeeping
//! - **Silence Auto-Free**: paused and quiet voices release their own
//!   resources after a grace period
//!
//! ## Quick Start
//!
//! ### Render a Voice
//!
//! ```rust
//! use polaron::bus::ControlBus;
//! use polaron::voice::{Voice, VoiceParams, VoiceSource};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(ControlBus::new());
//! let params = VoiceParams {
//!     sample_id: 1, // identities for cut-group broadcasts
//!     cut_group: 1,
//!     ..Default::default() // stereo, centered, 1 s
//! };
//! let mut voice = Voice::build(44100.0, bus, VoiceSource::Sine(440.0), &params).unwrap();
//!
//! let stereo = voice.render(4410); // 100 ms, channel-major
//! assert_eq!(stereo.len(), 2);
//! ```
//!
//! ### Panning as Graph Construction
//!
//! ```rust
//! use polaron::bus::ControlBus;
//! use polaron::graph::{Signal, VoiceGraph};
//! use polaron::pan;
//! use std::sync::Arc;
//!
//! let mut graph = VoiceGraph::new(44100.0, Arc::new(ControlBus::new()));
//!
//! // One source across six speakers: pan -1 anchors it at channel 0
//! let outputs = pan::dispatch(
//!     &mut graph,
//!     &[Signal::Value(1.0)],
//!     6,
//!     Signal::Value(-1.0),
//!     Signal::Value(1.0),
//!     None,
//! )
//! .unwrap();
//! graph.set_outputs(outputs);
//! let frame = graph.render(1);
//! assert!((frame[0][0] - 1.0).abs() < 1e-5);
//! ```
//!
//! ### Cut a Voice From Outside
//!
//! ```rust
//! use polaron::bus::ControlBus;
//! use polaron::voice::{Voice, VoiceParams, VoiceSource};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(ControlBus::new());
//! let params = VoiceParams {
//!     sample_id: 3,
//!     cut_group: 7,
//!     ..Default::default()
//! };
//! let mut voice =
//!     Voice::build(44100.0, bus.clone(), VoiceSource::Sine(220.0), &params).unwrap();
//!
//! voice.render(1024);
//! bus.broadcast_cut(3, 7, false); // every (3, 7) voice releases
//! voice.render_until_done(44100);
//! assert!(voice.is_done());
//! ```

pub mod analysis;
pub mod bus;
pub mod cut_group;
pub mod envelope;
pub mod fold;
pub mod freq_scale;
pub mod graph;
pub mod pan;
pub mod pause;
pub mod playback;
pub mod voice;
