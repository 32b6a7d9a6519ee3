//! Dialogue pagination.
//!
//! A dialogue box holds a limited number of characters. Long replies are cut
//! into pages, preferring the last sentence boundary inside each window and
//! keeping a closing quote or bracket with the sentence it closes.

use vnchat_config::DirectorConfig;

#[derive(Debug, Clone)]
pub struct TextPaginator {
    terminators: Vec<char>,
    close_punctuation: Vec<char>,
    max_chars: usize,
}

impl TextPaginator {
    pub fn new(terminators: Vec<char>, close_punctuation: Vec<char>, max_chars: usize) -> Self {
        Self {
            terminators,
            close_punctuation,
            max_chars: max_chars.max(1),
        }
    }

    pub fn from_config(config: &DirectorConfig) -> Self {
        Self::new(
            config.sentence_terminators.clone(),
            config.close_punctuation.clone(),
            config.page_max_chars,
        )
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into pages of at most `max_chars` characters.
    ///
    /// Whitespace-only pages are dropped.
    pub fn paginate(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut pages = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.max_chars).min(chars.len());
            let split_at = self.last_boundary(&chars, start, end).map_or(end, |pos| pos + 1);

            let page: String = chars[start..split_at].iter().collect();
            if !page.trim().is_empty() {
                pages.push(page);
            }
            start = split_at;
        }
        pages
    }

    /// Index of the last character that may end a page within `[start, end)`.
    fn last_boundary(&self, chars: &[char], start: usize, end: usize) -> Option<usize> {
        let mut last = None;
        let mut i = start;
        while i < end {
            if self.terminators.contains(&chars[i]) {
                let mut boundary = i;
                if chars
                    .get(i + 1)
                    .is_some_and(|c| self.close_punctuation.contains(c))
                {
                    boundary = i + 1;
                    if boundary >= end {
                        break;
                    }
                    i += 1;
                }
                last = Some(boundary);
            }
            i += 1;
        }
        last
    }
}
