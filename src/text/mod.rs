use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+(\s+|$)").unwrap();
}

/// Clean up raw request text before phonemization: unify typographic
/// punctuation to ASCII, drop control characters, collapse whitespace runs.
pub fn normalize(input: &str) -> String {
    let mut mapped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => mapped.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => mapped.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2015}' => mapped.push('-'),
            '\u{2026}' => mapped.push_str("..."),
            c if c.is_control() => mapped.push(' '),
            c => mapped.push(c),
        }
    }
    WHITESPACE.replace_all(&mapped, " ").trim().to_string()
}

/// Split text into synthesis chunks of at most `max_chars` characters.
///
/// Sentences are detected on final punctuation and packed greedily; a single
/// sentence longer than the limit is split on whitespace instead. Words are
/// never split, so a single oversized word passes through unchanged.
pub fn split_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    for sentence in sentences {
        let len = sentence.chars().count();
        if len > max_chars {
            chunks.extend(split_on_words(sentence, max_chars));
            continue;
        }
        match chunks.last_mut() {
            Some(last) if last.chars().count() + 1 + len <= max_chars => {
                last.push(' ');
                last.push_str(sentence);
            }
            _ => chunks.push(sentence.to_string()),
        }
    }
    chunks
}

fn split_on_words(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        if count > 0 && count + 1 + word_len > max_chars {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
        if count > 0 {
            current.push(' ');
            count += 1;
        }
        current.push_str(word);
        count += word_len;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Hello\t\n  world  "), "Hello world");
    }

    #[test]
    fn test_normalize_typographic_punctuation() {
        assert_eq!(normalize("\u{201C}It\u{2019}s fine\u{201D}"), "\"It's fine\"");
        assert_eq!(normalize("one \u{2014} two"), "one - two");
        assert_eq!(normalize("wait\u{2026}"), "wait...");
    }

    #[test]
    fn test_normalize_strips_control_chars() {
        assert_eq!(normalize("a\u{0007}b"), "a b");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_split_single_sentence() {
        let chunks = split_sentences("Hello world.", 400);
        assert_eq!(chunks, vec!["Hello world."]);
    }

    #[test]
    fn test_split_packs_short_sentences() {
        let chunks = split_sentences("One. Two. Three.", 400);
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn test_split_respects_limit() {
        let chunks = split_sentences("First sentence here. Second sentence here.", 25);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 25);
        }
    }

    #[test]
    fn test_split_long_sentence_on_words() {
        let text = "one two three four five six seven eight";
        let chunks = split_sentences(text, 10);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10, "chunk too long: {chunk}");
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_split_no_trailing_punctuation() {
        let chunks = split_sentences("No final stop here", 400);
        assert_eq!(chunks, vec!["No final stop here"]);
    }

    #[test]
    fn test_split_multibyte_text() {
        let chunks = split_sentences("Grüße aus München! Schöne Straße.", 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
    }

    #[test]
    fn test_split_empty() {
        assert!(split_sentences("", 400).is_empty());
    }
}
