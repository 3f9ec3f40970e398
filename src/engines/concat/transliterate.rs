use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::alphabet;
use super::g2p::Grapheme2Phoneme;
use super::engine::ConcatError;

/// One line of text as phonetic symbols.
pub type PhoneticLine = Vec<String>;

/// The phonetic alphabet a line (and a sample library) is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Representation {
    /// g2p tokens, e.g. `ae1`.
    #[serde(rename = "g2p_allos")]
    #[cfg_attr(feature = "cli", value(name = "g2p_allos"))]
    G2pAllophones,
    /// IPA with stress and length markers, e.g. `ˈæ`.
    #[serde(rename = "ipa_allos")]
    #[cfg_attr(feature = "cli", value(name = "ipa_allos"))]
    IpaAllophones,
    /// Bare IPA, e.g. `æ`.
    #[serde(rename = "ipa_phons")]
    #[cfg_attr(feature = "cli", value(name = "ipa_phons"))]
    IpaPhonemes,
}

impl Representation {
    pub const ALL: [Representation; 3] = [
        Representation::G2pAllophones,
        Representation::IpaAllophones,
        Representation::IpaPhonemes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Representation::G2pAllophones => "g2p_allos",
            Representation::IpaAllophones => "ipa_allos",
            Representation::IpaPhonemes => "ipa_phons",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unknown representation {0:?}, expected one of g2p_allos, ipa_allos, ipa_phons")]
pub struct UnknownRepresentation(pub String);

impl FromStr for Representation {
    type Err = UnknownRepresentation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Representation::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRepresentation(s.to_string()))
    }
}

/// A text in all three representations, one entry per input line.
///
/// Both IPA forms are derived from the same g2p tokens, so
/// `ipa_phonemes[i][j] == strip_markers(&ipa_allophones[i][j])`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transliteration {
    pub g2p_allophones: Vec<PhoneticLine>,
    pub ipa_allophones: Vec<PhoneticLine>,
    pub ipa_phonemes: Vec<PhoneticLine>,
}

impl Transliteration {
    pub fn from_g2p(g2p_allophones: Vec<PhoneticLine>) -> Self {
        let ipa_allophones = g2p_allophones
            .iter()
            .map(|line| alphabet::to_ipa(line, true))
            .collect();
        let ipa_phonemes = g2p_allophones
            .iter()
            .map(|line| alphabet::to_ipa(line, false))
            .collect();
        Self {
            g2p_allophones,
            ipa_allophones,
            ipa_phonemes,
        }
    }

    pub fn lines(&self, representation: Representation) -> &[PhoneticLine] {
        match representation {
            Representation::G2pAllophones => &self.g2p_allophones,
            Representation::IpaAllophones => &self.ipa_allophones,
            Representation::IpaPhonemes => &self.ipa_phonemes,
        }
    }

    pub fn len(&self) -> usize {
        self.g2p_allophones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.g2p_allophones.is_empty()
    }
}

/// Where each representation is written as JSON. `None` skips it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransliterationOutputs {
    pub g2p_allophones: Option<PathBuf>,
    pub ipa_allophones: Option<PathBuf>,
    pub ipa_phonemes: Option<PathBuf>,
}

/// Run g2p over each line. Tokens are lowercased.
pub fn text_to_g2p<I, S>(lines: I, g2p: &dyn Grapheme2Phoneme) -> Result<Vec<PhoneticLine>, ConcatError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| -> Result<PhoneticLine, ConcatError> {
            let tokens = g2p.phonemize(line.as_ref())?;
            Ok(tokens.into_iter().map(|t| t.to_lowercase()).collect())
        })
        .collect()
}

/// Transliterate `lines` and write the requested representations.
pub fn convert_and_persist<I, S>(
    lines: I,
    g2p: &dyn Grapheme2Phoneme,
    outputs: &TransliterationOutputs,
) -> Result<Transliteration, ConcatError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let transliteration = Transliteration::from_g2p(text_to_g2p(lines, g2p)?);
    log::debug!("Transliterated {} lines", transliteration.len());

    let targets = [
        (&outputs.g2p_allophones, Representation::G2pAllophones),
        (&outputs.ipa_allophones, Representation::IpaAllophones),
        (&outputs.ipa_phonemes, Representation::IpaPhonemes),
    ];
    for (path, representation) in targets {
        if let Some(path) = path {
            dump_lines(path, transliteration.lines(representation))?;
            log::info!("Wrote {representation} to {}", path.display());
        }
    }

    Ok(transliteration)
}

/// Write lines as a JSON array of arrays of strings (UTF-8, not escaped).
pub fn dump_lines(path: &Path, lines: &[PhoneticLine]) -> Result<(), ConcatError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, lines)?;
    writer.flush()?;
    Ok(())
}
