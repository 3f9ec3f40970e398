use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioBuffer, DEVICE_SAMPLE_RATE};
use crate::SynthesizedLine;

use super::engine::ConcatError;
use super::samples::SampleLibrary;
use super::segment::{segment, Word};

/// Tuning for word and line assembly.
///
/// The defaults were picked by ear for the handheld target and are expected to
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct SynthesisParams {
    /// Time-compression applied to every word. Must be at least 1.0.
    pub speed_factor: f32,
    /// Gain applied to every word after compression, in dB.
    pub gain_db: f32,
    /// Chunk length used by time-compression.
    pub chunk_ms: u32,
    /// Overlap between compressed chunks.
    pub crossfade_ms: u32,
    /// Silence between words.
    pub word_gap_ms: u32,
    /// Frame rate of the inter-word silence.
    pub silence_sample_rate: u32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            speed_factor: 2.0,
            gain_db: 18.0,
            chunk_ms: 50,
            crossfade_ms: 25,
            word_gap_ms: 100,
            silence_sample_rate: DEVICE_SAMPLE_RATE,
        }
    }
}

/// Assembles words and lines from phoneme samples.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    params: SynthesisParams,
    silence: AudioBuffer,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisParams::default())
    }
}

impl Synthesizer {
    pub fn new(params: SynthesisParams) -> Self {
        let silence = AudioBuffer::silent(params.word_gap_ms, params.silence_sample_rate);
        Self { params, silence }
    }

    /// Use a custom gap between words instead of generated silence.
    pub fn with_silence(params: SynthesisParams, silence: AudioBuffer) -> Self {
        Self { params, silence }
    }

    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// Concatenate the samples of one word, speed it up and boost it.
    pub fn synthesize_word(
        &self,
        word: Word<'_>,
        library: &SampleLibrary,
    ) -> Result<AudioBuffer, ConcatError> {
        let samples = word
            .iter()
            .map(|symbol| {
                library
                    .get(symbol)
                    .cloned()
                    .ok_or_else(|| ConcatError::MissingSample(symbol.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let joined = AudioBuffer::concat_all(samples)?.ok_or(ConcatError::EmptyUnit("word"))?;
        let p = &self.params;
        let compressed = joined.speedup(p.speed_factor, p.chunk_ms, p.crossfade_ms)?;
        Ok(compressed.apply_gain(p.gain_db))
    }

    /// Synthesize `words` and join them with one gap of silence between each pair.
    pub fn synthesize_line(
        &self,
        words: &[Word<'_>],
        library: &SampleLibrary,
    ) -> Result<AudioBuffer, ConcatError> {
        let mut pieces = Vec::with_capacity(words.len() * 2);
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                pieces.push(self.silence.clone());
            }
            pieces.push(self.synthesize_word(word, library)?);
        }

        AudioBuffer::concat_all(pieces)?.ok_or(ConcatError::EmptyUnit("line"))
    }

    /// One clip per phonetic line, in order.
    ///
    /// A line with no word in the library's vocabulary is an error unless
    /// `skip_empty_lines` is set, in which case it produces no clip and the
    /// following lines keep their original indices.
    pub fn synthesize_text<L: AsRef<[String]>>(
        &self,
        lines: &[L],
        library: &SampleLibrary,
        skip_empty_lines: bool,
    ) -> Result<Vec<SynthesizedLine>, ConcatError> {
        let mut out = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            let words = segment(line.as_ref(), library.vocabulary());
            if words.is_empty() && skip_empty_lines {
                log::warn!("Line {index} has no synthesizable words, skipping");
                continue;
            }

            log::debug!("Line {index}: {} words", words.len());
            let audio = self.synthesize_line(&words, library)?;
            out.push(SynthesizedLine { index, audio });
        }

        Ok(out)
    }
}
