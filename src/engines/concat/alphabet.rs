//! Conversion between g2p tokens and IPA.
//!
//! The g2p model emits lowercase ARPAbet tokens, with a stress digit on vowels
//! (`ah1`). Each token maps to one IPA allophone carrying stress/length
//! markers (`ˈʌ`); stripping the markers yields the bare phoneme (`ʌ`).

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Primary stress.
pub const PRIMARY_STRESS: char = 'ˈ';
/// Secondary stress.
pub const SECONDARY_STRESS: char = 'ˌ';
/// Vowel length.
pub const LENGTH: char = 'ː';

/// Non-phonemic decoration removed by [`strip_markers`].
pub const MARKERS: [char; 3] = [SECONDARY_STRESS, PRIMARY_STRESS, LENGTH];

const ALLOPHONES: &[(&str, &str)] = &[
    ("aa0", "ɑ"),
    ("aa1", "ˈɑː"),
    ("aa2", "ˌɑ"),
    ("ae0", "æ"),
    ("ae1", "ˈæ"),
    ("ae2", "ˌæ"),
    ("ah0", "ə"),
    ("ah1", "ˈʌ"),
    ("ah2", "ˌʌ"),
    ("ao0", "ɔ"),
    ("ao1", "ˈɔː"),
    ("ao2", "ˌɔ"),
    ("aw0", "aʊ"),
    ("aw1", "ˈaʊ"),
    ("aw2", "ˌaʊ"),
    ("ay0", "aɪ"),
    ("ay1", "ˈaɪ"),
    ("ay2", "ˌaɪ"),
    ("b", "b"),
    ("ch", "tʃ"),
    ("d", "d"),
    ("dh", "ð"),
    ("eh0", "ɛ"),
    ("eh1", "ˈɛ"),
    ("eh2", "ˌɛ"),
    ("er0", "ɚ"),
    ("er1", "ˈɚ"),
    ("er2", "ˌɚ"),
    ("ey0", "eɪ"),
    ("ey1", "ˈeɪ"),
    ("ey2", "ˌeɪ"),
    ("f", "f"),
    ("g", "g"),
    ("hh", "h"),
    ("ih0", "ɪ"),
    ("ih1", "ˈɪ"),
    ("ih2", "ˌɪ"),
    ("iy0", "i"),
    ("iy1", "ˈiː"),
    ("iy2", "ˌi"),
    ("jh", "dʒ"),
    ("k", "k"),
    ("l", "l"),
    ("m", "m"),
    ("n", "n"),
    ("ng", "ŋ"),
    ("ow0", "oʊ"),
    ("ow1", "ˈoʊ"),
    ("ow2", "ˌoʊ"),
    ("oy0", "ɔɪ"),
    ("oy1", "ˈɔɪ"),
    ("oy2", "ˌɔɪ"),
    ("p", "p"),
    ("r", "ɹ"),
    ("s", "s"),
    ("sh", "ʃ"),
    ("t", "t"),
    ("th", "θ"),
    ("uh0", "ʊ"),
    ("uh1", "ˈʊ"),
    ("uh2", "ˌʊ"),
    ("uw", "uː"),
    ("uw0", "u"),
    ("uw1", "ˈuː"),
    ("uw2", "ˌu"),
    ("v", "v"),
    ("w", "w"),
    ("y", "j"),
    ("z", "z"),
    ("zh", "ʒ"),
];

static ALLOPHONE_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALLOPHONES.iter().copied().collect());

static PHONEME_LOOKUP: Lazy<HashMap<&'static str, String>> = Lazy::new(|| {
    ALLOPHONES
        .iter()
        .map(|&(token, ipa)| (token, strip_markers(ipa)))
        .collect()
});

static REVERSE_ALLOPHONE_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALLOPHONES.iter().map(|&(token, ipa)| (ipa, token)).collect());

/// Remove stress and length markers.
pub fn strip_markers(allophone: &str) -> String {
    allophone.chars().filter(|c| !MARKERS.contains(c)).collect()
}

/// All g2p tokens in the table.
pub fn g2p_tokens() -> impl Iterator<Item = &'static str> {
    ALLOPHONES.iter().map(|&(token, _)| token)
}

/// IPA allophone (with markers) for a g2p token. Case-insensitive.
pub fn allophone(token: &str) -> Option<&'static str> {
    ALLOPHONE_LOOKUP
        .get(token.to_lowercase().as_str())
        .copied()
}

/// Bare IPA phoneme for a g2p token. Case-insensitive.
pub fn phoneme(token: &str) -> Option<&'static str> {
    PHONEME_LOOKUP
        .get(token.to_lowercase().as_str())
        .map(String::as_str)
}

/// g2p token for an IPA allophone (with markers).
pub fn g2p_token(allophone: &str) -> Option<&'static str> {
    REVERSE_ALLOPHONE_LOOKUP.get(allophone).copied()
}

/// Convert g2p tokens to IPA.
///
/// Emits allophones when `use_markers` is true, bare phonemes otherwise.
/// Symbols missing from the table (punctuation, word breaks) are kept as is.
pub fn to_ipa<S: AsRef<str>>(symbols: &[S], use_markers: bool) -> Vec<String> {
    symbols
        .iter()
        .map(|symbol| {
            let symbol = symbol.as_ref();
            let ipa = if use_markers {
                allophone(symbol)
            } else {
                phoneme(symbol)
            };
            ipa.unwrap_or(symbol).to_string()
        })
        .collect()
}
