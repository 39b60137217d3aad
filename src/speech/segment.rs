//! Sentence segmentation for speech playback
//!
//! A boundary falls after `.`, `!` or `?` when followed by one or more
//! whitespace characters. There is no abbreviation or decimal detection,
//! so "Mr. Smith" becomes two segments.

/// One speakable unit of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    index: usize,
    text: String,
}

impl Segment {
    /// Create a segment at a zero-based position
    #[must_use]
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Zero-based position in the pipeline sequence
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// One-based position, for humans
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.index + 1
    }

    /// Cleaned text to synthesize
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Splits raw text into ordered, speakable segments
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSegmenter;

impl TextSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Split `text` into segments
    ///
    /// Returns an empty vector when nothing speakable remains, which callers
    /// treat as "nothing to speak" rather than an error.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Segment> {
        sentences(text)
            .into_iter()
            .map(clean_text)
            .filter(|s| is_speakable(s))
            .enumerate()
            .map(|(index, text)| Segment::new(index, text.trim()))
            .collect()
    }
}

/// Break text at sentence punctuation followed by whitespace
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(ws_start, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        out.push(&text[start..ws_start]);

        // Swallow the whole whitespace run
        start = ws_start;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            start = j + w.len_utf8();
            chars.next();
        }
    }

    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Remove characters the synthesis engine cannot take verbatim
///
/// Single quotes are dropped. Line breaks and other control characters
/// become spaces since the engine reads one utterance per stdin line.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c != '\'')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// A segment is dropped only if it is whitespace and punctuation
///
/// Symbols such as emoji are kept; the engine decides what they sound like.
fn is_speakable(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace() && !is_punctuation(c))
}

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '"' | '(' | ')' | '[' | ']' | '{' | '}' | '-' | '_'
            | '/' | '\\' | '…' | '‘' | '’' | '“' | '”' | '«' | '»' | '–' | '—' | '¡' | '¿'
            | '·' | '•'
    )
}
