use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::audio::AudioError;
use crate::{SynthesisEngine, SynthesizedLine};

use super::g2p::Grapheme2Phoneme;
use super::samples::{SampleFilter, SampleLibrary, SampleTransform};
use super::synth::{SynthesisParams, Synthesizer};
use super::transliterate::{convert_and_persist, Representation, Transliteration, TransliterationOutputs};

/// Errors raised anywhere in the concatenative engine.
#[derive(thiserror::Error, Debug)]
pub enum ConcatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sample {}: {source}", .path.display())]
    Sample {
        path: PathBuf,
        #[source]
        source: AudioError,
    },
    #[error("Cannot synthesize an empty {0}")]
    EmptyUnit(&'static str),
    #[error("No sample recorded for phonetic symbol {0:?}")]
    MissingSample(String),
    #[error("Word {0:?} is not in the pronunciation dictionary")]
    UnknownWord(String),
    #[error("Invalid pronunciation dictionary: {0}")]
    Dictionary(String),
    #[error("g2p command not found: {0}")]
    G2pNotFound(String),
    #[error("Grapheme-to-phoneme conversion failed: {0}")]
    G2pFailed(String),
    #[error("Sample library not loaded. Call load_model() first.")]
    LibraryNotLoaded,
}

/// Parameters for loading a sample directory.
#[derive(Debug, Clone, Default)]
pub struct ConcatModelParams {
    /// Which files in the directory are samples.
    pub filter: SampleFilter,
    /// Applied to every sample as it is loaded.
    pub transform: SampleTransform,
}

/// Parameters for a synthesis request.
///
/// `representation` has no default: it must match the alphabet the sample
/// files are named in.
///
/// ```
/// use phoneme_tts::engines::concat::{ConcatInferenceParamsBuilder, Representation};
///
/// let params = ConcatInferenceParamsBuilder::default()
///     .representation(Representation::IpaPhonemes)
///     .build()
///     .unwrap();
/// assert!(!params.skip_empty_lines);
///
/// assert!(ConcatInferenceParamsBuilder::default().build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ConcatInferenceParams {
    pub representation: Representation,
    #[builder(default)]
    pub synthesis: SynthesisParams,
    /// Skip lines that contain no synthesizable word instead of failing.
    #[builder(default)]
    pub skip_empty_lines: bool,
}

impl ConcatInferenceParams {
    pub fn new(representation: Representation) -> Self {
        Self {
            representation,
            synthesis: SynthesisParams::default(),
            skip_empty_lines: false,
        }
    }
}

/// Concatenative text-to-speech engine.
///
/// The "model" is a directory of single-phoneme recordings named after their
/// symbol. Text goes through the g2p implementation the engine was built with,
/// is converted to the requested representation and assembled word by word
/// from the samples.
///
/// ```rust,no_run
/// use phoneme_tts::engines::concat::{CmuDict, ConcatEngine, ConcatInferenceParams, Representation};
/// use phoneme_tts::SynthesisEngine;
/// use std::path::Path;
///
/// let dict = CmuDict::load(Path::new("cmudict.dict"))?;
/// let mut engine = ConcatEngine::new(Box::new(dict));
/// engine.load_model(Path::new("phones/ipa"))?;
///
/// let params = ConcatInferenceParams::new(Representation::IpaPhonemes);
/// engine.synthesize_to_dir("Hello there.\nGeneral Kenobi.", Path::new("out"), &params)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ConcatEngine {
    library: Option<SampleLibrary>,
    library_path: Option<PathBuf>,
    g2p: Box<dyn Grapheme2Phoneme>,
}

impl ConcatEngine {
    pub fn new(g2p: Box<dyn Grapheme2Phoneme>) -> Self {
        Self {
            library: None,
            library_path: None,
            g2p,
        }
    }

    /// Use an already loaded sample library.
    pub fn with_library(g2p: Box<dyn Grapheme2Phoneme>, library: SampleLibrary) -> Self {
        Self {
            library: Some(library),
            library_path: None,
            g2p,
        }
    }

    pub fn library(&self) -> Option<&SampleLibrary> {
        self.library.as_ref()
    }

    /// Directory the current library was loaded from.
    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }

    /// List all symbols with a sample (requires a loaded library).
    pub fn list_symbols(&self) -> Vec<&str> {
        self.library
            .as_ref()
            .map(|l| l.symbols())
            .unwrap_or_default()
    }

    /// Transliterate `text` line by line, writing any requested JSON outputs.
    pub fn transliterate(
        &self,
        text: &str,
        outputs: &TransliterationOutputs,
    ) -> Result<Transliteration, ConcatError> {
        convert_and_persist(text.lines(), self.g2p.as_ref(), outputs)
    }

    fn synthesize_lines(
        &self,
        text: &str,
        params: &ConcatInferenceParams,
    ) -> Result<Vec<SynthesizedLine>, ConcatError> {
        let library = self.library.as_ref().ok_or(ConcatError::LibraryNotLoaded)?;
        let transliteration = self.transliterate(text, &TransliterationOutputs::default())?;
        let lines = transliteration.lines(params.representation);

        log::debug!(
            "Synthesizing {} lines as {}",
            lines.len(),
            params.representation
        );
        Synthesizer::new(params.synthesis.clone()).synthesize_text(
            lines,
            library,
            params.skip_empty_lines,
        )
    }
}

impl SynthesisEngine for ConcatEngine {
    type SynthesisParams = ConcatInferenceParams;
    type ModelParams = ConcatModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let library = SampleLibrary::load(model_path, &params.filter, &params.transform)?;
        self.library = Some(library);
        self.library_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.library = None;
        self.library_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &Self::SynthesisParams,
    ) -> Result<Vec<SynthesizedLine>, Box<dyn std::error::Error>> {
        Ok(self.synthesize_lines(text, params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBuffer;
    use crate::engines::concat::g2p::CmuDict;
    use tempfile::TempDir;

    const DICT: &str = "CAT  K AE1 T\nSAT  S AE1 T\n";

    fn engine() -> ConcatEngine {
        ConcatEngine::new(Box::new(CmuDict::parse(DICT).unwrap()))
    }

    fn write_samples(dir: &Path, symbols: &[&str]) {
        for symbol in symbols {
            AudioBuffer::from_samples(vec![0.1; 8000], 8000, 1)
                .export_wav(&dir.join(format!("{symbol}.wav")))
                .unwrap();
        }
    }

    fn params(representation: Representation) -> ConcatInferenceParams {
        ConcatInferenceParamsBuilder::default()
            .representation(representation)
            .skip_empty_lines(true)
            .build()
            .unwrap()
    }

    #[test]
    fn synthesis_requires_a_library() {
        let mut engine = engine();
        let err = engine
            .synthesize("cat", &params(Representation::IpaPhonemes))
            .unwrap_err();
        assert!(err.to_string().contains("not loaded"));
    }

    #[test]
    fn writes_one_wav_per_line() {
        let phones = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_samples(phones.path(), &["k", "æ", "t", "s"]);

        let mut engine = engine();
        engine.load_model(phones.path()).unwrap();
        assert_eq!(engine.list_symbols().len(), 4);

        let lines = engine
            .synthesize_to_dir(
                "cat sat\n\ncat.",
                out.path(),
                &params(Representation::IpaPhonemes),
            )
            .unwrap();

        assert_eq!(lines.iter().map(|l| l.index).collect::<Vec<_>>(), vec![0, 2]);
        assert!(out.path().join("0.wav").exists());
        assert!(!out.path().join("1.wav").exists());
        assert!(out.path().join("2.wav").exists());
        assert!(lines[0].audio.duration_secs() > lines[1].audio.duration_secs());
    }

    #[test]
    fn g2p_named_samples_are_matched_by_token() {
        let phones = TempDir::new().unwrap();
        write_samples(phones.path(), &["ae1"]);

        let mut engine = engine();
        engine.load_model(phones.path()).unwrap();
        let lines = engine
            .synthesize("cat", &params(Representation::G2pAllophones))
            .unwrap();
        assert_eq!(lines.len(), 1);

        // `ˈæ` has no sample, so the line has no words.
        let lines = engine
            .synthesize("cat", &params(Representation::IpaAllophones))
            .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn unload_drops_the_library() {
        let phones = TempDir::new().unwrap();
        write_samples(phones.path(), &["k"]);

        let mut engine = engine();
        engine.load_model(phones.path()).unwrap();
        assert_eq!(engine.library_path(), Some(phones.path()));
        engine.unload_model();
        assert!(engine.library().is_none());
        assert!(engine.list_symbols().is_empty());
    }
}
