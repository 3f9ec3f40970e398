use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::engine::ConcatError;

/// Token emitted between words.
pub const WORD_BREAK: &str = " ";

/// Grapheme-to-phoneme conversion of a single line of text.
///
/// Implementations return g2p tokens (ARPAbet with stress digits, any case),
/// with [`WORD_BREAK`] between words and punctuation as separate tokens.
pub trait Grapheme2Phoneme {
    fn phonemize(&self, line: &str) -> Result<Vec<String>, ConcatError>;
}

/// Dictionary lookup in the CMU Pronouncing Dictionary format.
///
/// ```text
/// ;;; comment
/// CAT  K AE1 T
/// READ  R EH1 D
/// READ(1)  R IY1 D
/// ```
///
/// Alternate pronunciations (`WORD(n)`) are ignored; the first entry wins.
pub struct CmuDict {
    entries: HashMap<String, Vec<String>>,
}

impl CmuDict {
    pub fn load(path: &Path) -> Result<Self, ConcatError> {
        let content = std::fs::read_to_string(path)?;
        let dict = Self::parse(&content)?;
        log::info!(
            "Loaded {} pronunciations from {}",
            dict.len(),
            path.display()
        );
        Ok(dict)
    }

    pub fn parse(content: &str) -> Result<Self, ConcatError> {
        let mut entries = HashMap::new();

        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(";;;") {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            if word.ends_with(')') && word.contains('(') {
                continue;
            }

            let phones: Vec<String> = fields.map(str::to_lowercase).collect();
            if phones.is_empty() {
                return Err(ConcatError::Dictionary(format!(
                    "line {}: no phones for {word:?}",
                    n + 1
                )));
            }
            entries.entry(word.to_lowercase()).or_insert(phones);
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Grapheme2Phoneme for CmuDict {
    fn phonemize(&self, line: &str) -> Result<Vec<String>, ConcatError> {
        let mut tokens = Vec::new();

        for (i, part) in split_text_parts(line).into_iter().enumerate() {
            if i > 0 {
                tokens.push(WORD_BREAK.to_string());
            }
            match part {
                TextPart::Word(word) => {
                    let phones = self
                        .entries
                        .get(&word)
                        .ok_or_else(|| ConcatError::UnknownWord(word.clone()))?;
                    tokens.extend(phones.iter().cloned());
                }
                TextPart::Punct(ch) => tokens.push(ch.to_string()),
            }
        }

        Ok(tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Word(String),
    Punct(char),
}

/// Lowercased words (letters, digits, apostrophes) and every other
/// non-space character as a part of its own. Only whitespace is dropped.
fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '\'' {
            current.extend(ch.to_lowercase());
            continue;
        }

        flush_word(&mut parts, &mut current);
        if !ch.is_whitespace() {
            parts.push(TextPart::Punct(ch));
        }
    }

    flush_word(&mut parts, &mut current);
    parts
}

fn flush_word(parts: &mut Vec<TextPart>, current: &mut String) {
    let word = current.trim_matches('\'');
    if !word.is_empty() {
        parts.push(TextPart::Word(word.to_string()));
    }
    current.clear();
}

/// An external g2p program.
///
/// The line is written to the program's stdin (newline-terminated) and a JSON
/// array of token strings is expected on stdout, e.g.
/// `["K", "AE1", "T", " ", "."]`.
#[derive(Debug, Clone)]
pub struct ExternalG2p {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalG2p {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a shell-like command line (whitespace separated, no quoting).
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut fields = command.split_whitespace();
        let program = fields.next()?;
        Some(Self::new(program).with_args(fields))
    }

    fn run(&self, input: &str) -> Result<String, ConcatError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConcatError::G2pNotFound(self.program.display().to_string())
                } else {
                    ConcatError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(newline_terminated(input).as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConcatError::G2pFailed(format!(
                "{} exited with code {:?}: {stderr}",
                self.program.display(),
                output.status.code()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Grapheme2Phoneme for ExternalG2p {
    fn phonemize(&self, line: &str) -> Result<Vec<String>, ConcatError> {
        let stdout = self.run(line)?;
        serde_json::from_str(stdout.trim()).map_err(|e| {
            ConcatError::G2pFailed(format!("expected a JSON array of tokens: {e}"))
        })
    }
}

fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &str = ";;; test dictionary
CAT  K AE1 T
SAT  S AE1 T
READ  R EH1 D
READ(1)  R IY1 D
DON'T  D OW1 N T
";

    #[test]
    fn parses_dictionary_and_ignores_alternates() {
        let dict = CmuDict::parse(DICT).unwrap();
        assert_eq!(dict.len(), 4);
        assert_eq!(dict.phonemize("read").unwrap(), vec!["r", "eh1", "d"]);
    }

    #[test]
    fn rejects_entry_without_phones() {
        assert!(matches!(
            CmuDict::parse("CAT\n"),
            Err(ConcatError::Dictionary(_))
        ));
    }

    #[test]
    fn single_word_has_no_breaks() {
        let dict = CmuDict::parse(DICT).unwrap();
        assert_eq!(dict.phonemize("cat").unwrap(), vec!["k", "ae1", "t"]);
    }

    #[test]
    fn words_and_punctuation_are_separated() {
        let dict = CmuDict::parse(DICT).unwrap();
        assert_eq!(
            dict.phonemize("Cat, don't sat!").unwrap(),
            vec!["k", "ae1", "t", " ", ",", " ", "d", "ow1", "n", "t", " ", "s", "ae1", "t", " ", "!"]
        );
    }

    #[test]
    fn unknown_word_is_an_error() {
        let dict = CmuDict::parse(DICT).unwrap();
        assert!(matches!(
            dict.phonemize("cat dog"),
            Err(ConcatError::UnknownWord(w)) if w == "dog"
        ));
    }

    #[test]
    fn digits_are_looked_up_like_words() {
        let dict = CmuDict::parse("I  AY1\nHAVE  HH AE1 V\nCATS  K AE1 T S\n").unwrap();
        assert!(matches!(
            dict.phonemize("I have 2 cats"),
            Err(ConcatError::UnknownWord(w)) if w == "2"
        ));
        assert!(matches!(
            dict.phonemize("cats 3&4"),
            Err(ConcatError::UnknownWord(w)) if w == "3"
        ));
    }

    #[test]
    fn symbols_are_kept_as_tokens() {
        let dict = CmuDict::parse(DICT).unwrap();
        assert_eq!(
            dict.phonemize("cat; sat & cat:").unwrap(),
            vec![
                "k", "ae1", "t", " ", ";", " ", "s", "ae1", "t", " ", "&", " ", "k", "ae1", "t",
                " ", ":"
            ]
        );
    }

    #[test]
    fn splits_text_into_words_and_punctuation() {
        assert_eq!(
            split_text_parts("  Hello,   'world'?  r2d2 "),
            vec![
                TextPart::Word("hello".to_string()),
                TextPart::Punct(','),
                TextPart::Word("world".to_string()),
                TextPart::Punct('?'),
                TextPart::Word("r2d2".to_string()),
            ]
        );
    }

    #[test]
    fn stdin_payload_is_newline_terminated() {
        assert_eq!(newline_terminated("cat"), "cat\n");
        assert_eq!(newline_terminated("cat\n"), "cat\n");
    }

    #[test]
    fn command_line_is_split_into_program_and_args() {
        let g2p = ExternalG2p::from_command_line("python3 g2p.py --json").unwrap();
        assert_eq!(g2p.program, PathBuf::from("python3"));
        assert_eq!(g2p.args, vec!["g2p.py", "--json"]);
        assert!(ExternalG2p::from_command_line("   ").is_none());
    }

    #[test]
    fn missing_program_is_reported() {
        let g2p = ExternalG2p::new("definitely-not-a-g2p-binary-7f3a");
        assert!(matches!(
            g2p.phonemize("cat"),
            Err(ConcatError::G2pNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn external_program_output_is_parsed_as_json() {
        let g2p = ExternalG2p::new("sh").with_args(["-c", r#"cat >/dev/null; echo '["K","AE1","T"]'"#]);
        assert_eq!(g2p.phonemize("cat").unwrap(), vec!["K", "AE1", "T"]);
    }

    #[cfg(unix)]
    #[test]
    fn external_program_failure_is_reported() {
        let g2p = ExternalG2p::new("sh").with_args(["-c", "cat >/dev/null; echo boom >&2; exit 3"]);
        assert!(matches!(g2p.phonemize("cat"), Err(ConcatError::G2pFailed(_))));
    }
}
