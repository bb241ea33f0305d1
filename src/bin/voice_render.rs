//! Voice renderer - trigger one voice offline and write it to WAV
//!
//! Drives the whole per-voice pipeline from the command line: source, phase,
//! envelope, panning, cut-group and silence gating. Control-bus events (cut
//! broadcasts, resume triggers) can be scheduled at render offsets to
//! exercise the live-gating paths without a running engine.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use polaron::analysis;
use polaron::bus::ControlBus;
use polaron::envelope::EnvelopeSpec;
use polaron::playback::PlaybackState;
use polaron::voice::{Voice, VoiceParams, VoiceSource};

#[derive(Parser)]
#[command(name = "voice_render")]
#[command(about = "Render a single triggered voice to WAV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a voice to a WAV file
    Render {
        /// Output WAV file path
        output: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Print a level/spectrum report for a WAV file
    Analyze {
        /// Input WAV file path
        input: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Sample file to play (all channels become voice inputs)
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Test tone frequency in Hz, used when no sample is given
    #[arg(long, default_value = "440.0")]
    tone: f32,

    /// Use white noise instead of the test tone
    #[arg(long)]
    noise: bool,
}

#[derive(Args)]
struct ParamArgs {
    /// Output channel count (1 = mixdown, 2 = balance, more = azimuthal)
    #[arg(short, long, default_value = "2")]
    channels: usize,

    /// Pan position, -1 to 1
    #[arg(short, long, default_value = "0.0")]
    pan: f32,

    /// Panning spread across the output field
    #[arg(long, default_value = "1.0")]
    span: f32,

    /// Spread rescaling by output width, 0 to 1
    #[arg(long, default_value = "1.0")]
    splay: f32,

    /// Azimuthal per-source angular width in channels
    #[arg(long, default_value = "2.0")]
    width: f32,

    /// Azimuthal rotation offset in channels
    #[arg(long, default_value = "0.0")]
    orientation: f32,

    /// Playback start position, 0 to 1
    #[arg(long, default_value = "0.0")]
    begin: f32,

    /// Playback end position, 0 to 1
    #[arg(long, default_value = "1.0")]
    end: f32,

    /// Playback speed (negative plays in reverse)
    #[arg(short, long, default_value = "1.0")]
    speed: f32,

    /// Speed at the end of the ramp (defaults to the start speed)
    #[arg(long)]
    end_speed: Option<f32>,

    /// Sustain time in seconds (envelope base and speed-ramp length)
    #[arg(long, default_value = "1.0")]
    sustain: f32,

    /// Loop the playback window instead of finishing
    #[arg(long = "loop")]
    looping: bool,

    /// Speed-ramp acceleration for the frequency scaler
    #[arg(long, default_value = "0.0")]
    accelerate: f32,

    /// Pitch-follows-speed amount, 0 (off) to 1 (full tracking)
    #[arg(long, default_value = "0.0")]
    speed_freq: f32,

    /// Overall gain
    #[arg(short, long, default_value = "1.0")]
    gain: f32,

    /// Envelope spec as JSON (overrides --attack/--release)
    #[arg(long)]
    envelope: Option<PathBuf>,

    /// Attack time in seconds
    #[arg(long, default_value = "0.01")]
    attack: f32,

    /// Release time in seconds
    #[arg(long, default_value = "0.01")]
    release: f32,

    /// This voice's sample identity
    #[arg(long, default_value = "1")]
    sample_id: i32,

    /// This voice's cut-group identity
    #[arg(long, default_value = "1")]
    cut_group: i32,

    /// Broadcast a matching cut after this many seconds
    #[arg(long)]
    cut_after: Option<f32>,

    /// Silence grace time in seconds
    #[arg(long, default_value = "1.0")]
    grace: f32,

    /// Start the voice paused
    #[arg(long)]
    paused: bool,

    /// Fire a resume trigger after this many seconds
    #[arg(long)]
    resume_after: Option<f32>,

    /// Render sample rate in Hz
    #[arg(short = 'r', long, default_value = "44100")]
    sample_rate: u32,

    /// Hard render cap in seconds
    #[arg(long, default_value = "30.0")]
    max_duration: f32,
}

enum BusEvent {
    Cut,
    Resume,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            output,
            source,
            params,
        } => render(output, source, params),
        Commands::Analyze { input } => analyze(input),
    }
}

fn render(
    output: PathBuf,
    source: SourceArgs,
    args: ParamArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = args.sample_rate as f32;

    let bus = Arc::new(ControlBus::new());
    bus.set_span(args.span);
    bus.set_splay(args.splay);
    bus.set_pan_width(args.width);
    bus.set_orientation(args.orientation);
    bus.set_speed_freq(args.speed_freq);
    bus.set_sample(args.sample_id);
    bus.set_cut(args.cut_group);

    let (voice_source, unit_duration) = match &source.sample {
        Some(path) => {
            let (channels, file_rate) = load_wav(path)?;
            let frames = channels.first().map_or(0, |c| c.len());
            let duration = frames as f32 / file_rate as f32;
            println!(
                "Source:   {} ({} ch, {:.3} s)",
                path.display(),
                channels.len(),
                duration
            );
            let buffers = channels.into_iter().map(Arc::new).collect();
            (VoiceSource::Buffers(buffers), duration)
        }
        None if source.noise => (VoiceSource::Noise, args.sustain),
        None => (VoiceSource::Sine(source.tone), args.sustain),
    };

    let envelope = match &args.envelope {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => {
            let hold = (args.sustain - args.attack - args.release).max(0.0);
            EnvelopeSpec::linen(args.attack, hold, args.release)
        }
    };

    let params = VoiceParams {
        output_channels: args.channels,
        envelope,
        playback: PlaybackState {
            begin: args.begin,
            end: args.end,
            speed: args.speed,
            sustain: args.sustain,
            end_speed: args.end_speed,
            loop_enabled: args.looping,
            unit_duration,
        },
        accelerate: args.accelerate,
        pan: args.pan,
        mul: args.gain,
        sample_id: args.sample_id,
        cut_group: args.cut_group,
        grace_time: args.grace,
        pause_immediately: args.paused,
        ..Default::default()
    };

    let mut voice = Voice::build(sample_rate, bus.clone(), voice_source, &params)?;
    let channels = voice.num_channels();
    let max_frames = (args.max_duration * sample_rate) as usize;

    let mut events: Vec<(usize, BusEvent)> = Vec::new();
    if let Some(at) = args.cut_after {
        events.push(((at * sample_rate) as usize, BusEvent::Cut));
    }
    if let Some(at) = args.resume_after {
        events.push(((at * sample_rate) as usize, BusEvent::Resume));
    }
    events.sort_by_key(|(frame, _)| *frame);

    let mut rendered: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut cursor = 0usize;
    for (frame, event) in events {
        let until = frame.min(max_frames);
        if until > cursor {
            append(&mut rendered, voice.render(until - cursor));
            cursor = until;
        }
        match event {
            BusEvent::Cut => bus.broadcast_cut(args.sample_id, args.cut_group, false),
            BusEvent::Resume => {
                bus.trigger_resume();
            }
        }
    }
    if cursor < max_frames && !voice.is_done() {
        append(&mut rendered, voice.render_until_done(max_frames - cursor));
    }

    let frames = rendered.first().map_or(0, |c| c.len());
    write_wav(&output, &rendered, args.sample_rate)?;

    println!("Rendered: {:.3} s, {} channels", frames as f32 / sample_rate, channels);
    match voice.done_reason() {
        Some(reason) => println!("Ended:    {:?}", reason),
        None => println!("Ended:    render cap reached"),
    }
    for (ch, data) in rendered.iter().enumerate() {
        println!(
            "Ch {}:     rms {:.4}  peak {:.4}",
            ch,
            analysis::rms(data),
            analysis::peak(data)
        );
    }
    println!("Wrote:    {}", output.display());
    Ok(())
}

fn analyze(input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (channels, sample_rate) = load_wav(&input)?;
    let frames = channels.first().map_or(0, |c| c.len());
    let mono: Vec<f32> = (0..frames)
        .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / channels.len() as f32)
        .collect();

    println!("=== {} ===", input.display());
    println!(
        "Duration: {:.3} s ({} frames, {} Hz, {} ch)",
        frames as f32 / sample_rate as f32,
        frames,
        sample_rate,
        channels.len()
    );
    println!("RMS:      {:.4}", analysis::rms(&mono));
    println!("Peak:     {:.4}", analysis::peak(&mono));
    println!(
        "Dominant: {:.1} Hz",
        analysis::dominant_frequency(&mono, sample_rate as f32)
    );
    for (ch, data) in channels.iter().enumerate() {
        println!("Ch {} rms:  {:.4}", ch, analysis::rms(data));
    }
    Ok(())
}

fn append(rendered: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (buf, more) in rendered.iter_mut().zip(chunk) {
        buf.extend(more);
    }
}

fn load_wav(path: &PathBuf) -> Result<(Vec<Vec<f32>>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap_or(0.0)).collect(),
        hound::SampleFormat::Int => {
            let max_val = (1 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap_or(0) as f32 / max_val)
                .collect()
        }
    };
    let n = spec.channels as usize;
    let mut channels = vec![Vec::with_capacity(samples.len() / n); n];
    for frame in samples.chunks(n) {
        for (ch, &v) in frame.iter().enumerate() {
            channels[ch].push(v);
        }
    }
    Ok((channels, spec.sample_rate))
}

fn write_wav(
    path: &PathBuf,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = channels.first().map_or(0, |c| c.len());
    for i in 0..frames {
        for channel in channels {
            let s = (channel[i].clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(s)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
