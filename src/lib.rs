//! # phoneme-tts
//!
//! Concatenative text-to-speech for small handheld devices.
//!
//! ## Features
//!
//! - **Phonetic transliteration**: text to g2p tokens, IPA allophones and IPA phonemes
//! - **Sample libraries**: directories of per-phoneme recordings, with device resampling
//! - **Word assembly**: sample concatenation, time-compression and gain, one WAV per line
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! phoneme-tts = "2026.10"
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use phoneme_tts::{engines::concat::{CmuDict, ConcatEngine, ConcatInferenceParams, Representation}, SynthesisEngine};
//!
//! let mut engine = ConcatEngine::new(Box::new(CmuDict::load(Path::new("cmudict.dict"))?));
//! engine.load_model(Path::new("phones/ipa_phons"))?;
//!
//! let params = ConcatInferenceParams::new(Representation::IpaPhonemes);
//! engine.synthesize_to_dir("Hello, world!", Path::new("out"), &params)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod engines;

use std::path::{Path, PathBuf};

pub use audio::{AudioBuffer, AudioError};

/// The synthesized audio for one line of input text.
#[derive(Debug, Clone)]
pub struct SynthesizedLine {
    /// 0-based index of the line in the input text
    pub index: usize,
    pub audio: AudioBuffer,
}

impl SynthesizedLine {
    /// File name the line is saved under: `<index>.wav`.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.index)
    }

    /// Write the line into `directory`, returning the path written.
    pub fn write_wav(&self, directory: &Path) -> Result<PathBuf, AudioError> {
        let path = directory.join(self.file_name());
        self.audio.export_wav(&path)?;
        Ok(path)
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior
    type SynthesisParams;
    /// Parameters for configuring model loading
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text, one clip per line.
    fn synthesize(
        &mut self,
        text: &str,
        params: &Self::SynthesisParams,
    ) -> Result<Vec<SynthesizedLine>, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write `<index>.wav` per line.
    ///
    /// Default implementation calls `synthesize()` then `SynthesizedLine::write_wav()`.
    fn synthesize_to_dir(
        &mut self,
        text: &str,
        output_dir: &Path,
        params: &Self::SynthesisParams,
    ) -> Result<Vec<SynthesizedLine>, Box<dyn std::error::Error>> {
        let lines = self.synthesize(text, params)?;
        std::fs::create_dir_all(output_dir)?;
        for line in &lines {
            let path = line.write_wav(output_dir)?;
            log::debug!("Wrote {}", path.display());
        }
        log::info!("Wrote {} lines to {}", lines.len(), output_dir.display());
        Ok(lines)
    }
}
