use serde::{Deserialize, Serialize};

/// Generated narration text together with its whitespace-split words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    text: String,
    words: Vec<String>,
}

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let words = text.split_whitespace().map(str::to_string).collect();
        Self { text, words }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// First `max_chars` characters of the text, never splitting a code point.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => &self.text[..cut],
            None => &self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let script = Script::new("  You are\tcapable of\n\namazing things!  ");
        assert_eq!(
            script.words(),
            ["You", "are", "capable", "of", "amazing", "things!"]
        );
        assert_eq!(script.word_count(), 6);
        assert_eq!(script.text(), "  You are\tcapable of\n\namazing things!  ");
    }

    #[test]
    fn blank_text_has_no_words() {
        assert!(Script::new(" \n\t ").is_empty());
        assert!(Script::new("").is_empty());
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let script = Script::new("héllo wörld");
        assert_eq!(script.excerpt(4), "héll");
        assert_eq!(script.excerpt(100), "héllo wörld");
        assert_eq!(script.excerpt(0), "");
    }
}
