//! Concatenative text-to-speech from single-phoneme recordings.
//!
//! Built for a handheld console with no room for a neural voice: every word is
//! stitched together from short per-phoneme samples, sped up and boosted, and
//! words are separated by a short silence.
//!
//! # Pipeline
//!
//! 1. **g2p**: each line of text becomes ARPAbet tokens (`k ae1 t`) through a
//!    [`Grapheme2Phoneme`] implementation.
//! 2. **Alphabet conversion**: tokens are rewritten as IPA allophones
//!    (`k ˈæ t`) and bare IPA phonemes (`k æ t`).
//! 3. **Segmentation**: a line is split into words, the maximal runs of symbols
//!    that have a sample.
//! 4. **Assembly**: samples are concatenated per word, time-compressed and
//!    amplified; words are joined with silence, one clip per line.
//!
//! # Sample Directory Layout
//!
//! ```text
//! phones/ipa_phons/
//! ├── k.wav
//! ├── æ.wav
//! ├── t.wav
//! └── ...
//! ```
//!
//! File stems must be spelled in the representation passed at synthesis time
//! (`g2p_allos`, `ipa_allos` or `ipa_phons`). A library recorded under IPA
//! names can be re-exported under g2p names with [`SymbolRename::IpaToG2p`].
//!
//! # Device Format
//!
//! [`SampleTransform::DeviceResample`] converts samples to unsigned 8-bit PCM
//! at 22 050 Hz, the format the handheld's sound engine plays.
//!
//! ```rust,no_run
//! use phoneme_tts::engines::concat::{SampleFilter, SampleLibrary, SampleTransform, SymbolRename};
//! use std::path::Path;
//!
//! SampleLibrary::load_and_export(
//!     Path::new("recordings"),
//!     Path::new("phones/ipa_phons"),
//!     &SampleFilter::Any,
//!     &SampleTransform::DeviceResample,
//!     &SymbolRename::Keep,
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alphabet;
pub mod engine;
pub mod g2p;
pub mod samples;
pub mod segment;
pub mod synth;
pub mod transliterate;

pub use engine::{
    ConcatEngine, ConcatError, ConcatInferenceParams, ConcatInferenceParamsBuilder,
    ConcatModelParams,
};
pub use g2p::{CmuDict, ExternalG2p, Grapheme2Phoneme};
pub use samples::{ExportReport, SampleFilter, SampleLibrary, SampleTransform, SymbolRename};
pub use segment::{segment, Word};
pub use synth::{SynthesisParams, SynthesisParamsBuilder, Synthesizer};
pub use transliterate::{
    convert_and_persist, PhoneticLine, Representation, Transliteration, TransliterationOutputs,
};
