//! Directive extraction from model replies.
//!
//! The model embeds instructions in its reply between configurable
//! delimiters, e.g. `<<<Alice:smile>>>`. The extractor pulls each kind out
//! and produces the plain dialogue text with every directive removed.
//!
//! Extraction only considers spans on a single line. Cleanup removes spans
//! across lines too, so stray multi-line directives never reach the screen.

use serde::Serialize;
use vnchat_config::{DirectorConfig, MatchRule};

/// A `speaker:pose` pair from a Live2D span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Live2DDirective {
    pub speaker_key: String,
    pub live2d_key: String,
}

/// Everything extracted from one reply paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveBundle {
    pub speakers: Vec<String>,
    pub live2d: Vec<Live2DDirective>,
    pub background: Option<String>,
    pub bgm: Option<String>,
    pub scene: Option<String>,
    pub memory: Option<String>,
    /// Dialogue text with every directive span removed
    pub cleaned: String,
    pub raw: String,
}

/// Extracts directives according to the configured delimiter rules.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    speaker: MatchRule,
    live2d: MatchRule,
    background: MatchRule,
    bgm: MatchRule,
    scene: MatchRule,
    memory: MatchRule,
    speaker_indicators: Vec<char>,
}

impl TagExtractor {
    pub fn new(config: &DirectorConfig) -> Self {
        Self {
            speaker: config.speaker.clone(),
            live2d: config.live2d.clone(),
            background: config.background.clone(),
            bgm: config.bgm.clone(),
            scene: config.scene.clone(),
            memory: config.memory.clone(),
            speaker_indicators: config.speaker_indicators.clone(),
        }
    }

    /// First single-line span between `front` and the next `back`.
    pub fn extract<'t>(text: &'t str, rule: &MatchRule) -> Option<&'t str> {
        if !rule.is_enabled() {
            return None;
        }
        let (front, back) = (rule.front.as_str(), rule.back.as_str());

        let mut search_from = 0;
        while let Some(found) = text[search_from..].find(front) {
            let start = search_from + found;
            let body_start = start + front.len();
            let line_end = text[body_start..]
                .find(is_line_break)
                .map_or(text.len(), |i| body_start + i);
            if let Some(len) = text[body_start..line_end].find(back) {
                return Some(&text[body_start..body_start + len]);
            }
            // Retry from the next character, like an unanchored regex scan.
            search_from = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        None
    }

    pub fn speakers(&self, text: &str) -> Vec<String> {
        let Some(span) = Self::extract(text, &self.speaker) else {
            return Vec::new();
        };
        split_items(span, &self.speaker.splitter)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn live2d(&self, text: &str) -> Vec<Live2DDirective> {
        let Some(span) = Self::extract(text, &self.live2d) else {
            return Vec::new();
        };
        split_items(span, &self.live2d.splitter)
            .filter_map(|item| {
                let mut parts = item.split(|c| self.speaker_indicators.contains(&c));
                let speaker = parts.next()?.trim();
                let key = parts.next()?.trim();
                (!speaker.is_empty() && !key.is_empty()).then(|| Live2DDirective {
                    speaker_key: speaker.to_string(),
                    live2d_key: key.to_string(),
                })
            })
            .collect()
    }

    pub fn background(&self, text: &str) -> Option<String> {
        Self::extract(text, &self.background).map(String::from)
    }

    pub fn bgm(&self, text: &str) -> Option<String> {
        Self::extract(text, &self.bgm).map(String::from)
    }

    pub fn scene(&self, text: &str) -> Option<String> {
        Self::extract(text, &self.scene).map(String::from)
    }

    pub fn memory(&self, text: &str) -> Option<String> {
        Self::extract(text, &self.memory).map(String::from)
    }

    /// Remove every directive span and collapse leftover whitespace.
    ///
    /// Repeats until nothing changes, so `cleanup(cleanup(x)) == cleanup(x)`.
    pub fn cleanup(&self, text: &str) -> String {
        let rules = [
            &self.speaker,
            &self.live2d,
            &self.background,
            &self.bgm,
            &self.scene,
            &self.memory,
        ];

        let mut current = text.to_string();
        loop {
            let mut next = current.clone();
            for rule in rules.iter().filter(|r| r.is_enabled()) {
                next = remove_spans(&next, &rule.front, &rule.back);
            }
            let next = collapse_whitespace(&next);
            if next == current {
                return next;
            }
            current = next;
        }
    }

    pub fn analyze(&self, feedback: &str) -> DirectiveBundle {
        DirectiveBundle {
            speakers: self.speakers(feedback),
            live2d: self.live2d(feedback),
            background: self.background(feedback),
            bgm: self.bgm(feedback),
            scene: self.scene(feedback),
            memory: self.memory(feedback),
            cleaned: self.cleanup(feedback),
            raw: feedback.to_string(),
        }
    }
}

/// Characters a single-line span may not cross.
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn split_items<'a>(span: &'a str, splitter: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    if splitter.is_empty() {
        Box::new(std::iter::once(span))
    } else {
        Box::new(span.split(splitter))
    }
}

/// Non-greedy, non-overlapping removal of `front…back` spans (may cross lines).
fn remove_spans(text: &str, front: &str, back: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(front) {
        let body = &rest[start + front.len()..];
        let Some(end) = body.find(back) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &body[end + back.len()..];
    }
    out.push_str(rest);
    out
}

/// Runs of two or more whitespace characters become one space; then trim.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(c);
    }
    flush_run(&mut out, &mut run);
    out.trim().to_string()
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.chars().count() >= 2 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}
