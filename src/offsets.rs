use crate::text::WordSequence;

/// Character range of the current word inside the display text.
///
/// Offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

impl HighlightSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<(usize, usize)> for HighlightSpan {
    fn from(v: (usize, usize)) -> Self {
        HighlightSpan::new(v.0, v.1)
    }
}

impl From<HighlightSpan> for (usize, usize) {
    fn from(s: HighlightSpan) -> Self {
        (s.start, s.end)
    }
}

fn char_len(word: &str) -> usize {
    word.chars().count()
}

/// Span of `words[index]` in the words joined by single separators.
///
/// Panics when `index` is out of range.
pub fn span_for(index: usize, words: &WordSequence) -> HighlightSpan {
    assert!(
        index < words.len(),
        "word index {index} out of range for {} words",
        words.len()
    );
    let start: usize = words.iter().take(index).map(|w| char_len(w) + 1).sum();
    HighlightSpan::new(start, start + char_len(&words[index]))
}

/// Cumulative start offsets computed once per session.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    starts: Vec<usize>,
    lens: Vec<usize>,
}

impl OffsetIndex {
    pub fn new(words: &WordSequence) -> Self {
        let mut starts = Vec::with_capacity(words.len());
        let mut lens = Vec::with_capacity(words.len());
        let mut pos = 0;
        for word in words.iter() {
            let len = char_len(word);
            starts.push(pos);
            lens.push(len);
            pos += len + 1;
        }
        Self { starts, lens }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Same result as [`span_for`], in constant time.
    pub fn span(&self, index: usize) -> HighlightSpan {
        assert!(
            index < self.len(),
            "word index {index} out of range for {} words",
            self.len()
        );
        let start = self.starts[index];
        HighlightSpan::new(start, start + self.lens[index])
    }
}
