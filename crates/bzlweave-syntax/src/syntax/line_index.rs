use rowan::TextSize;

/// Maps byte offsets of a source text to 1-based line numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    newlines: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> LineIndex {
        let newlines = text
            .match_indices('\n')
            .map(|(offset, _)| TextSize::from(offset as u32))
            .collect();

        LineIndex { newlines }
    }

    pub fn line(&self, offset: TextSize) -> usize {
        match self.newlines.binary_search(&offset) {
            // The newline character itself belongs to the line it terminates
            Ok(idx) => idx + 1,
            Err(idx) => idx + 1,
        }
    }
}
