// Integration tests for audio input streaming and synthesized audio output
//
// WAV fixtures are generated on the fly in a temporary directory.

use anyhow::Result;
use qs_translator::audio::{
    AudioFile, AudioInput, AudioInputConfig, AudioInputFactory, AudioSink, AudioSinkFactory,
    AudioOutput, AudioSource, WavFileInput, WavFileSink,
};
use qs_translator::events::AudioChunk;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_tone(path: &Path, sample_rate: u32, channels: u16, secs: f32) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = (sample_rate as f32 * secs) as usize;
    for n in 0..frames {
        let sample = ((n % 100) as i16 - 50) * 100;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn fast(frame_ms: u64) -> AudioInputConfig {
    AudioInputConfig {
        target_sample_rate: 16000,
        target_channels: 1,
        buffer_duration_ms: frame_ms,
        realtime: false,
    }
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("tone.wav");
    write_tone(&path, 16000, 1, 1.5)?;

    let audio = AudioFile::open(&path)?;

    assert!((audio.duration_seconds - 1.5).abs() < 0.01);
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 24000);
    assert!(audio.path.contains("tone.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    assert!(AudioFile::open(&path).is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_rejects_float_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("float.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    writer.write_sample(0.5f32)?;
    writer.finalize()?;

    assert!(AudioFile::open(&path).is_err());
    Ok(())
}

#[test]
fn test_audio_file_frames_cover_all_samples() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("tone.wav");
    write_tone(&path, 16000, 1, 0.25)?;

    let frames = AudioFile::open(&path)?.frames(100);

    // 250ms = two full frames and a half frame
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[2].samples.len(), 800);
    assert_eq!(frames[2].timestamp_ms, 200);

    Ok(())
}

#[tokio::test]
async fn test_wav_input_streams_converted_frames_then_ends() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stereo48k.wav");
    write_tone(&path, 48000, 2, 1.0)?;

    let mut input = WavFileInput::new(&path, fast(100));
    let mut rx = input.open().await?;

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 10);
    for frame in &frames {
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.channels, 1);
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.duration_ms(), 100);
    }

    input.close();
    assert!(!input.is_open());
    Ok(())
}

#[tokio::test]
async fn test_wav_input_missing_file_fails_open() {
    let mut input = WavFileInput::new("/nonexistent/input.wav", fast(100));
    assert!(input.open().await.is_err());
}

#[tokio::test]
async fn test_factory_builds_requested_input() -> Result<()> {
    let silence = AudioInputFactory::create(AudioSource::Silence, fast(20))?;
    assert_eq!(silence.name(), "silence");

    let file = AudioInputFactory::create(AudioSource::File("x.wav".to_string()), fast(20))?;
    assert_eq!(file.name(), "wav-file");
    assert!(!file.is_open());

    Ok(())
}

#[test]
fn test_wav_sink_writes_one_file_per_utterance() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut sink = WavFileSink::new(temp_dir.path().join("out"), 16000)?;

    let pcm: Vec<u8> = [100i16, -100, 200, -200]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();

    sink.play(&AudioChunk::data(pcm.clone()))?;
    sink.play(&AudioChunk::end_of_synthesis())?;
    sink.play(&AudioChunk::data(pcm))?;
    sink.play(&AudioChunk::end_of_synthesis())?;
    // Empty final chunk with nothing open is ignored
    sink.play(&AudioChunk::end_of_synthesis())?;

    assert_eq!(sink.written_files().len(), 2);

    let mut reader = hound::WavReader::open(&sink.written_files()[0])?;
    let samples: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(samples, vec![100, -100, 200, -200]);

    Ok(())
}

#[test]
fn test_sink_factory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let none = AudioSinkFactory::create(AudioOutput::None, 16000)?;
    assert_eq!(none.name(), "none");

    let dir = temp_dir.path().join("wavs").display().to_string();
    let wav = AudioSinkFactory::create(AudioOutput::WavFiles(dir.clone()), 16000)?;
    assert_eq!(wav.name(), "wav");
    assert!(Path::new(&dir).is_dir());

    Ok(())
}
