//! Splitting extracted text into bounded-size chunks.

/// A strategy for splitting extracted text into chunks.
///
/// Chunking is pure and deterministic: the same text always yields the same
/// sequence, so callers may re-derive it at any time. Ordering is positional
/// and carries no meaning downstream — records are content-addressed, not
/// position-addressed.
pub trait Chunker: Send + Sync {
    /// Split text into chunks. Empty input yields an empty sequence.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Fixed-window chunker: consecutive windows of at most `window` characters,
/// no overlap, with internal newlines normalized to spaces.
///
/// The final chunk may be shorter than the window. Windows count characters,
/// not bytes, so multi-byte text never splits inside a code point.
#[derive(Debug, Clone)]
pub struct FixedWindowChunker {
    window: usize,
}

impl FixedWindowChunker {
    /// Create a chunker with the given window size in characters.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero. [`PipelineConfig`](crate::PipelineConfig)
    /// validation rejects a zero `chunk_len` before it reaches this point.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "chunk window must be non-zero");
        Self { window }
    }
}

impl Chunker for FixedWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.window)
            .map(|window| {
                window.iter().map(|&c| if c == '\n' { ' ' } else { c }).collect::<String>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = FixedWindowChunker::new(2000);
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn windows_are_bounded_and_final_chunk_is_shorter() {
        let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = FixedWindowChunker::new(2000);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 2000);
        assert_eq!(chunks[2].chars().count(), 500);
    }

    #[test]
    fn newlines_are_normalized_to_spaces() {
        let chunker = FixedWindowChunker::new(10);
        let chunks = chunker.chunk("one\ntwo\nthree");
        assert_eq!(chunks, vec!["one two th".to_string(), "ree".to_string()]);
    }

    #[test]
    fn chunking_is_restartable() {
        let text: String = (0..5000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = FixedWindowChunker::new(2000);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }

    #[test]
    fn concatenation_reconstructs_text_modulo_normalization() {
        let text = "alpha\nbravo charlie\ndelta echo foxtrot golf hotel india";
        let chunker = FixedWindowChunker::new(7);
        let rejoined: String = chunker.chunk(text).concat();
        assert_eq!(rejoined, text.replace('\n', " "));
    }

    #[test]
    fn multibyte_text_splits_on_character_boundaries() {
        let text = "héllo wörld ünïcode".repeat(3);
        let chunker = FixedWindowChunker::new(5);
        let chunks = chunker.chunk(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
