pub mod file;
pub mod input;
pub mod output;

pub use file::{AudioFile, WavFileInput};
pub use input::{AudioFrame, AudioInput, AudioInputConfig, AudioInputFactory, AudioSource, SilenceInput};
pub use output::{
    AudioOutput, AudioPlayer, AudioSink, AudioSinkFactory, NullAudioSink, PlaybackHandle,
    PlaybackSummary, WavFileSink,
};
