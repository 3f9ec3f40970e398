use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{AudioBuffer, AudioError, DEVICE_BITS_PER_SAMPLE, DEVICE_SAMPLE_RATE};

use super::alphabet;
use super::engine::ConcatError;

/// Which files in a sample directory are loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SampleFilter {
    /// Every regular file.
    #[default]
    Any,
    /// Files with this extension (case-insensitive, without the dot).
    Extension(String),
}

impl SampleFilter {
    fn matches(&self, path: &Path) -> bool {
        match self {
            SampleFilter::Any => true,
            SampleFilter::Extension(wanted) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(wanted)),
        }
    }
}

/// Processing applied to every sample as it is loaded.
#[derive(Clone, Default)]
pub enum SampleTransform {
    /// Keep samples as decoded.
    #[default]
    Identity,
    /// Convert to the handheld's format: unsigned 8-bit PCM at 22 050 Hz.
    DeviceResample,
    Custom(Arc<dyn Fn(AudioBuffer) -> Result<AudioBuffer, AudioError> + Send + Sync>),
}

impl SampleTransform {
    pub fn apply(&self, audio: AudioBuffer) -> Result<AudioBuffer, AudioError> {
        match self {
            SampleTransform::Identity => Ok(audio),
            SampleTransform::DeviceResample => {
                audio.resample(DEVICE_BITS_PER_SAMPLE, DEVICE_SAMPLE_RATE)
            }
            SampleTransform::Custom(transform) => transform(audio),
        }
    }
}

impl fmt::Debug for SampleTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleTransform::Identity => f.write_str("Identity"),
            SampleTransform::DeviceResample => f.write_str("DeviceResample"),
            SampleTransform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How symbols are renamed when a library is written back to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SymbolRename {
    #[default]
    Keep,
    /// IPA allophone file names become g2p token file names.
    IpaToG2p,
    Map(HashMap<String, String>),
}

impl SymbolRename {
    fn target(&self, symbol: &str) -> Option<String> {
        match self {
            SymbolRename::Keep => Some(symbol.to_string()),
            SymbolRename::IpaToG2p => alphabet::g2p_token(symbol).map(str::to_string),
            SymbolRename::Map(map) => map.get(symbol).cloned(),
        }
    }
}

/// Outcome of [`SampleLibrary::export`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written, in no particular order.
    pub written: Vec<PathBuf>,
    /// Symbols left out because the rename had no target for them.
    pub skipped: Vec<String>,
}

/// Single-phoneme recordings keyed by phonetic symbol.
///
/// The set of symbols is kept alongside the samples so word segmentation can
/// test membership without rebuilding it.
#[derive(Debug, Clone, Default)]
pub struct SampleLibrary {
    samples: HashMap<String, AudioBuffer>,
    vocabulary: HashSet<String>,
}

impl SampleLibrary {
    pub fn from_samples(samples: HashMap<String, AudioBuffer>) -> Self {
        let vocabulary = samples.keys().cloned().collect();
        Self {
            samples,
            vocabulary,
        }
    }

    /// Load every sample directly under `directory` (no recursion).
    ///
    /// Each file's stem is its symbol, so `ˈæ.wav` is the sample for `ˈæ`.
    pub fn load(
        directory: &Path,
        filter: &SampleFilter,
        transform: &SampleTransform,
    ) -> Result<Self, ConcatError> {
        let mut samples = HashMap::new();

        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            if !path.is_file() || !filter.matches(&path) {
                continue;
            }

            let Some(symbol) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("Skipping sample with non UTF-8 name: {}", path.display());
                continue;
            };

            let audio = AudioBuffer::decode_wav(&path)
                .and_then(|audio| transform.apply(audio))
                .map_err(|source| ConcatError::Sample {
                    path: path.clone(),
                    source,
                })?;
            samples.insert(symbol.to_string(), audio);
        }

        log::info!(
            "Loaded {} phoneme samples from {}",
            samples.len(),
            directory.display()
        );
        Ok(Self::from_samples(samples))
    }

    /// Load a directory, transform it and write the result to `output_directory`.
    pub fn load_and_export(
        input_directory: &Path,
        output_directory: &Path,
        filter: &SampleFilter,
        transform: &SampleTransform,
        rename: &SymbolRename,
    ) -> Result<(Self, ExportReport), ConcatError> {
        let library = Self::load(input_directory, filter, transform)?;
        let report = library.export(output_directory, rename)?;
        Ok((library, report))
    }

    /// Write every sample as `<symbol>.wav` under `directory`.
    ///
    /// Existing files are overwritten. Symbols the rename cannot map are
    /// skipped with a warning.
    pub fn export(&self, directory: &Path, rename: &SymbolRename) -> Result<ExportReport, ConcatError> {
        fs::create_dir_all(directory)?;

        let mut report = ExportReport::default();
        for (symbol, audio) in &self.samples {
            let Some(name) = rename.target(symbol) else {
                log::warn!("No rename target for sample {symbol:?}, skipping");
                report.skipped.push(symbol.clone());
                continue;
            };

            let path = directory.join(format!("{name}.wav"));
            audio.export_wav(&path).map_err(|source| ConcatError::Sample {
                path: path.clone(),
                source,
            })?;
            report.written.push(path);
        }

        log::info!(
            "Exported {} samples to {} ({} skipped)",
            report.written.len(),
            directory.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    pub fn get(&self, symbol: &str) -> Option<&AudioBuffer> {
        self.samples.get(symbol)
    }

    /// Symbols that have a sample.
    pub fn vocabulary(&self) -> &HashSet<String> {
        &self.vocabulary
    }

    /// All symbols in sorted order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samples.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn clip(value: f32, frames: usize, sample_rate: u32) -> AudioBuffer {
        AudioBuffer::from_samples(vec![value; frames], sample_rate, 1)
    }

    fn library(symbols: &[&str]) -> SampleLibrary {
        SampleLibrary::from_samples(
            symbols
                .iter()
                .map(|s| (s.to_string(), clip(0.25, 64, 8000)))
                .collect(),
        )
    }

    #[test]
    fn loads_files_keyed_by_stem() {
        let dir = TempDir::new().unwrap();
        clip(0.5, 100, 16_000)
            .export_wav(&dir.path().join("ˈæ.wav"))
            .unwrap();
        clip(0.25, 50, 16_000)
            .export_wav(&dir.path().join("k.wav"))
            .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let lib =
            SampleLibrary::load(dir.path(), &SampleFilter::Any, &SampleTransform::Identity).unwrap();
        assert_eq!(lib.symbols(), vec!["k", "ˈæ"]);
        assert!(lib.vocabulary().contains("ˈæ"));
        assert_eq!(lib.get("k").unwrap().frames(), 50);
    }

    #[test]
    fn extension_filter_skips_other_files() {
        let dir = TempDir::new().unwrap();
        clip(0.5, 10, 8000).export_wav(&dir.path().join("t.wav")).unwrap();
        fs::write(dir.path().join("README.txt"), "not audio").unwrap();

        let filter = SampleFilter::Extension("WAV".to_string());
        let lib = SampleLibrary::load(dir.path(), &filter, &SampleTransform::Identity).unwrap();
        assert_eq!(lib.symbols(), vec!["t"]);
    }

    #[test]
    fn undecodable_file_fails_the_load() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.wav"), "not audio").unwrap();

        let err = SampleLibrary::load(dir.path(), &SampleFilter::Any, &SampleTransform::Identity)
            .unwrap_err();
        assert!(matches!(err, ConcatError::Sample { .. }));
    }

    #[test]
    fn device_resample_is_applied_on_load() {
        let dir = TempDir::new().unwrap();
        clip(0.5, 44_100, 44_100)
            .export_wav(&dir.path().join("s.wav"))
            .unwrap();

        let lib = SampleLibrary::load(
            dir.path(),
            &SampleFilter::Any,
            &SampleTransform::DeviceResample,
        )
        .unwrap();
        let sample = lib.get("s").unwrap();
        assert_eq!(sample.sample_rate(), DEVICE_SAMPLE_RATE);
        assert_eq!(sample.bits_per_sample(), DEVICE_BITS_PER_SAMPLE);
    }

    #[test]
    fn export_skips_symbols_without_rename_target() {
        let dir = TempDir::new().unwrap();
        let lib = library(&["k", "æ"]);
        let rename = SymbolRename::Map(HashMap::from([("k".to_string(), "k".to_string())]));

        let report = lib.export(dir.path(), &rename).unwrap();
        assert_eq!(report.written, vec![dir.path().join("k.wav")]);
        assert_eq!(report.skipped, vec!["æ".to_string()]);
        assert!(!dir.path().join("æ.wav").exists());
    }

    #[test]
    fn export_renames_ipa_to_g2p_tokens() {
        let dir = TempDir::new().unwrap();
        let lib = library(&["ˈæ", "ɹ"]);

        let report = lib.export(dir.path(), &SymbolRename::IpaToG2p).unwrap();
        assert!(report.skipped.is_empty());
        assert!(dir.path().join("ae1.wav").exists());
        assert!(dir.path().join("r.wav").exists());
    }

    #[test]
    fn export_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("k.wav");
        clip(0.5, 10, 8000).export_wav(&path).unwrap();

        library(&["k"]).export(dir.path(), &SymbolRename::Keep).unwrap();
        assert_eq!(AudioBuffer::decode_wav(&path).unwrap().frames(), 64);
    }

    #[test]
    fn load_and_export_writes_transformed_samples() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        clip(0.5, 44_100, 44_100)
            .export_wav(&input.path().join("z.wav"))
            .unwrap();

        let (lib, report) = SampleLibrary::load_and_export(
            input.path(),
            output.path(),
            &SampleFilter::Any,
            &SampleTransform::DeviceResample,
            &SymbolRename::Keep,
        )
        .unwrap();
        assert_eq!(lib.len(), 1);
        assert_eq!(report.written.len(), 1);

        let written = AudioBuffer::decode_wav(&output.path().join("z.wav")).unwrap();
        assert_eq!(written.sample_rate(), DEVICE_SAMPLE_RATE);
        assert_eq!(written.bits_per_sample(), 8);
    }
}
