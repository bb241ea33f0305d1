/// Tests for cut group voice termination
/// Cut groups let samples stop each other when triggered (like open/closed
/// hi-hats): the control layer broadcasts (sample, group) once and every
/// live voice decides for itself, from the truth table, whether it is meant.
use std::sync::Arc;

use polaron::analysis::rms;
use polaron::bus::ControlBus;
use polaron::graph::DoneReason;
use polaron::playback::PlaybackState;
use polaron::voice::{Voice, VoiceParams, VoiceSource};

const SAMPLE_RATE: f32 = 1000.0;

fn long_voice(bus: &Arc<ControlBus>, sample_id: i32, cut_group: i32) -> Voice {
    let params = VoiceParams {
        sample_id,
        cut_group,
        playback: PlaybackState {
            unit_duration: 10.0,
            ..Default::default()
        },
        grace_time: 10.0,
        ..Default::default()
    };
    let mut voice = Voice::build(SAMPLE_RATE, bus.clone(), VoiceSource::Sine(100.0), &params)
        .expect("voice should build");
    voice.graph_mut().set_control_period(10);
    voice
}

#[test]
fn test_broadcast_frees_only_exact_matches() {
    let bus = Arc::new(ControlBus::new());
    let mut same_both = long_voice(&bus, 1, 5);
    let mut same_cut_only = long_voice(&bus, 2, 5);
    let mut same_sample_only = long_voice(&bus, 1, 6);
    let mut unrelated = long_voice(&bus, 9, 9);

    bus.broadcast_cut(1, 5, false);
    for voice in [
        &mut same_both,
        &mut same_cut_only,
        &mut same_sample_only,
        &mut unrelated,
    ] {
        voice.render(100);
    }

    assert_eq!(
        same_both.done_reason(),
        Some(DoneReason::CutGroup),
        "same sample and same cut frees"
    );
    assert!(!same_cut_only.is_done(), "same cut alone keeps playing");
    assert!(
        !same_sample_only.is_done(),
        "same sample alone keeps playing"
    );
    assert!(!unrelated.is_done());

    println!("✓ Truth table holds across four live voices");
}

#[test]
fn test_cut_all_crosses_samples_within_the_group() {
    let bus = Arc::new(ControlBus::new());
    let mut in_group_a = long_voice(&bus, 1, 5);
    let mut in_group_b = long_voice(&bus, 2, 5);
    let mut other_group = long_voice(&bus, 2, 6);

    // cutAllSamples widens the sample match, never the group match
    bus.broadcast_cut(42, 5, true);
    for voice in [&mut in_group_a, &mut in_group_b, &mut other_group] {
        voice.render(100);
    }

    assert_eq!(in_group_a.done_reason(), Some(DoneReason::CutGroup));
    assert_eq!(in_group_b.done_reason(), Some(DoneReason::CutGroup));
    assert!(!other_group.is_done(), "cut-all never crosses cut groups");

    println!("✓ cut-all freed both samples in group 5, spared group 6");
}

#[test]
fn test_cut_release_is_fast_but_not_a_click() {
    let bus = Arc::new(ControlBus::new());
    let mut voice = long_voice(&bus, 3, 7);

    let before = voice.render(200);
    assert!(
        rms(&before[0]) > 0.3,
        "voice audible before the cut, got RMS={}",
        rms(&before[0])
    );

    bus.broadcast_cut(3, 7, false);
    let after = voice.render_until_done(200);

    // Default release is 20 ms: two 10 ms control blocks of fade
    assert!(
        after[0].len() <= 40,
        "release finishes within a few control blocks, got {} frames",
        after[0].len()
    );
    let first_block = rms(&after[0][..10]);
    assert!(
        first_block > 1e-3,
        "fade passes audio during the ramp, got RMS={}",
        first_block
    );
    assert!(
        after[0][after[0].len() - 1].abs() < 1e-6,
        "fade lands on silence"
    );

    println!("✓ Cut released over {} frames", after[0].len());
}

#[test]
fn test_custom_release_time_stretches_the_fade() {
    let bus = Arc::new(ControlBus::new());
    let params = VoiceParams {
        sample_id: 3,
        cut_group: 7,
        release_time: 0.2,
        playback: PlaybackState {
            unit_duration: 10.0,
            ..Default::default()
        },
        grace_time: 10.0,
        ..Default::default()
    };
    let mut voice = Voice::build(SAMPLE_RATE, bus.clone(), VoiceSource::Sine(100.0), &params)
        .expect("voice should build");
    voice.graph_mut().set_control_period(10);

    voice.render(100);
    bus.broadcast_cut(3, 7, false);
    let fade = voice.render_until_done(1000);
    assert!(
        fade[0].len() >= 190 && fade[0].len() <= 215,
        "0.2 s release takes about 200 frames, got {}",
        fade[0].len()
    );
}

#[test]
fn test_repeated_broadcasts_do_not_restart_the_release() {
    let bus = Arc::new(ControlBus::new());
    let mut voice = long_voice(&bus, 3, 7);
    voice.render(100);

    bus.broadcast_cut(3, 7, false);
    voice.render(10);
    // A duplicate broadcast mid-release must not reset the ramp
    bus.broadcast_cut(3, 7, false);
    let rest = voice.render_until_done(200);

    assert_eq!(voice.done_reason(), Some(DoneReason::CutGroup));
    assert!(
        rest[0].len() <= 30,
        "release continues from where it was, got {} more frames",
        rest[0].len()
    );

    println!("✓ Duplicate broadcast was a no-op mid-release");
}

#[test]
fn test_later_trigger_replaces_earlier_in_same_group() {
    // The hi-hat idiom, sequenced by the control layer: broadcast the group,
    // give live voices a control block to latch, clear the broadcast, then
    // start the replacement so it does not match its own kill order.
    let bus = Arc::new(ControlBus::new());
    let mut open_hat = long_voice(&bus, 10, 3);
    open_hat.render(100);
    assert!(!open_hat.is_done());

    bus.broadcast_cut(0, 3, true);
    open_hat.render(20); // one control block is enough to latch
    bus.broadcast_cut(0, 0, false);

    let mut closed_hat = long_voice(&bus, 11, 3);
    let fresh = closed_hat.render(100);
    open_hat.render_until_done(100);

    assert_eq!(
        open_hat.done_reason(),
        Some(DoneReason::CutGroup),
        "latched release finishes after the broadcast is cleared"
    );
    assert!(!closed_hat.is_done());
    assert!(
        rms(&fresh[0]) > 0.3,
        "replacement voice plays on, got RMS={}",
        rms(&fresh[0])
    );

    println!("✓ New trigger stole the group from the running voice");
}
