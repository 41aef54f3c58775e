//! Offline note rendering command.
//!
//! Builds a one-container tree in memory, drives the stream feed tick by
//! tick the way the real-time scheduler does, and writes the playback
//! instance to a WAV file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use resonar_core::math::{db_to_linear, linear_to_db};
use resonar_signal::{
    AudioChannel, Channel, Container, DeviceInfo, Note, SampleFormat, Scope, SoundScope,
    Soundcard,
};
use resonar_synth::{FeedOutcome, Note256th, NoteMapping, Ports, StreamFeed, Tick};

use super::common::{load_config, load_preset, parse_port_value};

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// MIDI note to render; repeat for a chord
    #[arg(long = "note", default_value = "60")]
    notes: Vec<u8>,

    /// Note length in ticks, one buffer per tick
    #[arg(long, default_value = "64")]
    length: u64,

    /// Output gain in dB
    #[arg(long, default_value = "-6.0", allow_hyphen_values = true)]
    gain: f32,

    /// Engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Factory preset name or preset file
    #[arg(long)]
    preset: Option<String>,

    /// Port override applied after the preset (e.g. --set noise-gain=0.2)
    #[arg(long = "set", value_parser = parse_port_value)]
    sets: Vec<(String, f32)>,

    /// WAV bit depth: 8, 16, 24, or 32 (float). Follows the config format when omitted
    #[arg(long)]
    bits: Option<u16>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.length == 0 {
        anyhow::bail!("--length must be at least one tick");
    }
    let config = load_config(args.config.as_deref())?;
    let format = config.audio_format();
    let mapping = config.note_mapping();
    let bits = args.bits.unwrap_or_else(|| wav_bits(format.format));
    if !matches!(bits, 8 | 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {bits} (expected 8, 16, 24 or 32)");
    }

    let ports = Arc::new(Ports::new());
    if let Some(name) = &args.preset {
        let preset = load_preset(name)?;
        preset.apply(&ports)?;
        tracing::info!(preset = %preset.name, ports = preset.len(), "preset applied");
    }
    for (port, value) in &args.sets {
        let applied = ports.set(port, *value)?;
        if applied != *value {
            tracing::warn!(port = %port, requested = value, applied, "port value clamped");
        }
    }

    let notes = args
        .notes
        .iter()
        .map(|&midi| {
            note_row(mapping, midi)
                .map(|y| Note::new(0, args.length, y))
                .ok_or_else(|| anyhow::anyhow!("MIDI note {midi} has no row under the mapping"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let channel: Arc<dyn AudioChannel> = Arc::new(Channel::new(0, 0));
    let device: Arc<dyn Soundcard> = Arc::new(DeviceInfo::new("offline", format));
    let container = Container::connect(&channel, device);
    let instance = container.playback_instance(Scope::new(SoundScope::Playback));
    instance.stream_resize(args.length as usize);
    container.add_instance(&instance)?;

    let feed = StreamFeed::new(ports, mapping);

    tracing::info!(
        samplerate = format.samplerate,
        buffer_size = format.buffer_size,
        format = %format.format,
        notes = notes.len(),
        ticks = args.length,
        use_256th = config.timing.use_256th,
        "rendering"
    );

    let pb = ProgressBar::new(args.length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ticks ({eta})")?
            .progress_chars("##-"),
    );

    let mut sounded = Vec::new();
    for (index, offset_counter) in (0..args.length).enumerate() {
        instance.set_current(index);
        for note in &notes {
            let mut tick = Tick::new(*note, offset_counter, 1.0, format.buffer_size);
            if config.timing.use_256th {
                tick.note_256th = Some(Note256th {
                    offset_lower: offset_counter * 16,
                    delay: 1.0 / 16.0,
                });
            }
            match feed.stream_feed(&instance, &tick) {
                FeedOutcome::Rendered { onset: true, .. } => sounded.push(*note),
                FeedOutcome::Rendered { .. } => {}
                outcome => tracing::warn!(?outcome, tick = offset_counter, "tick not rendered"),
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    // one release per onset
    for note in &sounded {
        feed.notify_remove(&instance, note);
    }

    let gain = db_to_linear(args.gain);
    let samples: Vec<f32> = instance.to_vec().into_iter().map(|s| s * gain).collect();
    container.remove_instance(&instance);

    write_wav(&args.output, &samples, format.samplerate, bits)?;

    println!("\nRendered {} frames to {}", samples.len(), args.output.display());
    println!(
        "  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&samples)),
        linear_to_db(peak(&samples))
    );

    Ok(())
}

/// Row of `midi` under `mapping`, the inverse of [`NoteMapping::midi_note`].
fn note_row(mapping: NoteMapping, midi: u8) -> Option<u32> {
    let note = i64::from(midi);
    let y = if mapping.reverse {
        127 - mapping.audio_start + mapping.midi_start - note
    } else {
        note - mapping.midi_start + mapping.audio_start
    };
    u32::try_from(y)
        .ok()
        .filter(|&y| mapping.midi_note(y) == Some(midi))
}

fn wav_bits(format: SampleFormat) -> u16 {
    match format {
        SampleFormat::S8 => 8,
        SampleFormat::S16 => 16,
        SampleFormat::S24 => 24,
        SampleFormat::S32 | SampleFormat::S64 | SampleFormat::Float | SampleFormat::Double => 32,
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, bits: u16) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bits,
        sample_format: if bits == 32 {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    if bits == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_row_inverts_mapping() {
        let mappings = [
            NoteMapping::default(),
            NoteMapping {
                audio_start: 5,
                midi_start: 24,
                reverse: false,
            },
            NoteMapping {
                audio_start: 0,
                midi_start: 0,
                reverse: true,
            },
        ];
        for mapping in mappings {
            for midi in 24..100u8 {
                let y = note_row(mapping, midi).unwrap();
                assert_eq!(mapping.midi_note(y), Some(midi));
            }
        }
    }

    #[test]
    fn note_below_mapping_has_no_row() {
        let mapping = NoteMapping {
            audio_start: 0,
            midi_start: 36,
            reverse: false,
        };
        assert_eq!(note_row(mapping, 30), None);
    }

    #[test]
    fn wav_bits_follow_format() {
        assert_eq!(wav_bits(SampleFormat::S16), 16);
        assert_eq!(wav_bits(SampleFormat::Double), 32);
    }
}
