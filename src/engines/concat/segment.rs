use std::collections::HashSet;

/// A run of consecutive symbols that all have a recorded sample.
pub type Word<'a> = &'a [String];

/// Split a phonetic line into words.
///
/// Words are maximal runs of symbols found in `vocabulary`; everything else
/// (spaces, punctuation, symbols without a sample) separates words and is
/// dropped.
pub fn segment<'a>(line: &'a [String], vocabulary: &HashSet<String>) -> Vec<Word<'a>> {
    let mut words = Vec::new();
    let mut start = None;

    for (i, symbol) in line.iter().enumerate() {
        match (vocabulary.contains(symbol), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                words.push(&line[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push(&line[s..]);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn vocabulary(symbols: &[&str]) -> HashSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_separator_tokens() {
        let line = strings(&["k", "æ", "t", " ", "s", "æ", "t"]);
        let words = segment(&line, &vocabulary(&["k", "æ", "t", "s"]));
        assert_eq!(words, vec![&line[0..3], &line[4..7]]);
    }

    #[test]
    fn drops_leading_trailing_and_repeated_separators() {
        let line = strings(&[".", " ", "k", " ", " ", "t", "!"]);
        let words = segment(&line, &vocabulary(&["k", "t"]));
        assert_eq!(words, vec![&line[2..3], &line[5..6]]);
    }

    #[test]
    fn line_without_vocabulary_symbols_has_no_words() {
        let line = strings(&[" ", ",", "?"]);
        assert!(segment(&line, &vocabulary(&["k"])).is_empty());
        assert!(segment(&[], &vocabulary(&["k"])).is_empty());
    }

    #[test]
    fn words_cover_exactly_the_vocabulary_symbols() {
        let vocab = vocabulary(&["a", "b", "c"]);
        let line = strings(&["a", "x", "b", "c", "y", "z", "a", "a", "q"]);
        let words = segment(&line, &vocab);

        assert!(words.iter().all(|w| !w.is_empty()));
        let flattened: Vec<&String> = words.iter().flat_map(|w| w.iter()).collect();
        let expected: Vec<&String> = line.iter().filter(|s| vocab.contains(*s)).collect();
        assert_eq!(flattened, expected);
        assert_eq!(words.len(), 3);
    }
}
