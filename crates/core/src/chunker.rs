//! Fixed-window character chunking with overlap.
//!
//! Window `i` starts at character `i * (chunk_size - overlap)` and spans at
//! most `chunk_size` characters. The last window always ends at the end of
//! the text, so the union of windows covers the whole input.

use crate::error::{DocQaError, Result};
use crate::models::{Fragment, FragmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocQaError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if overlap >= chunk_size {
            return Err(DocQaError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<Fragment> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string, so
        // windows can be sliced by character count without re-scanning.
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        let total_chars = bounds.len() - 1;

        let step = self.chunk_size - self.overlap;
        let mut fragments = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(total_chars);
            fragments.push(Fragment::new(
                FragmentId(fragments.len()),
                &text[bounds[start]..bounds[end]],
                start,
            ));
            if end == total_chars {
                break;
            }
            start += step;
        }
        fragments
    }
}

/// Splits `text` into overlapping windows. See [`Chunker`].
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Fragment>> {
    Ok(Chunker::new(chunk_size, overlap)?.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: &str =
        "Paris is the capital of France. It has a population of over 2 million.";

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(split("abc", 0, 0), Err(DocQaError::InvalidConfig(_))));
        assert!(matches!(split("abc", 5, 5), Err(DocQaError::InvalidConfig(_))));
        assert!(matches!(split("abc", 5, 9), Err(DocQaError::InvalidConfig(_))));
    }

    #[test]
    fn short_text_is_a_single_fragment() {
        let frags = split("hello", 50, 10).unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text(), "hello");
        assert_eq!(frags[0].source_offset(), 0);
    }

    #[test]
    fn windows_overlap_by_the_configured_amount() {
        let frags = split(PARIS, 50, 10).unwrap();
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].source_offset(), 0);
        assert_eq!(frags[1].source_offset(), 40);
        assert!(frags[0].text().starts_with("Paris is the capital of France."));
        let tail_of_first: String = frags[0].text().chars().skip(40).collect();
        let head_of_second: String = frags[1].text().chars().take(10).collect();
        assert_eq!(tail_of_first, head_of_second);
        assert!(frags[1].text().ends_with("2 million."));
    }

    #[test]
    fn ids_follow_document_order() {
        let frags = split(&"abcdefghij".repeat(10), 15, 5).unwrap();
        for (i, f) in frags.iter().enumerate() {
            assert_eq!(f.id(), FragmentId(i));
        }
    }

    #[test]
    fn deterministic_bounded_and_covering() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(13);
        let total = text.chars().count();
        for (size, overlap) in [(1, 0), (7, 3), (20, 0), (50, 10), (64, 63), (1000, 1)] {
            let a = split(&text, size, overlap).unwrap();
            let b = split(&text, size, overlap).unwrap();
            assert_eq!(a, b);

            let mut covered = 0usize;
            for f in &a {
                assert!(f.char_len() <= size);
                assert!(f.source_offset() <= covered, "gap before {}", f.id());
                covered = covered.max(f.source_offset() + f.char_len());
            }
            assert_eq!(covered, total);
        }
    }

    #[test]
    fn never_splits_multibyte_characters() {
        let text = "héllo wörld ünïcödé ✓✓✓";
        let frags = split(text, 4, 1).unwrap();
        assert!(frags.iter().all(|f| f.char_len() <= 4));
        let rebuilt: String = frags
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if i == 0 {
                    f.text().to_string()
                } else {
                    f.text().chars().skip(1).collect()
                }
            })
            .collect();
        assert_eq!(rebuilt, text);
    }
}
