//! Recursive character text splitter.
//!
//! Splits on the coarsest separator that occurs in the text, recursing into
//! pieces that are still too long with the next separator, then merges
//! adjacent pieces back into chunks of at most `chunk_size` characters with
//! `chunk_overlap` characters carried between neighbours.

use std::collections::VecDeque;

pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short, separator));
                short.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&current, total) > self.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current, separator);
                // Drop from the front until the carried tail fits the overlap
                // and leaves room for the incoming piece.
                while total > self.chunk_overlap
                    || (joined_len(&current, total) > self.chunk_size && total > 0)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
        }
        push_joined(&mut docs, &current, separator);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    let joined = current.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let splitter = TextSplitter::new(500, 100);
        assert_eq!(splitter.split("Article 21 protects life."), vec!["Article 21 protects life."]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let splitter = TextSplitter::new(500, 100);
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("\n\n\n\n").is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let splitter = TextSplitter::new(30, 0);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = splitter.split(text);
        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here.", "Third one."]
        );
    }

    #[test]
    fn chunks_never_exceed_size() {
        let splitter = TextSplitter::new(40, 10);
        let text = "The President of India is the head of state. ".repeat(20);
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn neighbouring_chunks_overlap() {
        let splitter = TextSplitter::new(20, 8);
        let chunks = splitter.split("one two three four five six seven eight nine ten");
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].starts_with(last_word),
                "{:?} should carry over into {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn unbreakable_text_falls_back_to_characters() {
        let splitter = TextSplitter::new(10, 0);
        let chunks = splitter.split(&"x".repeat(25));
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn multibyte_text_is_split_safely() {
        let splitter = TextSplitter::new(5, 0).with_separators(&[""]);
        let chunks = splitter.split("대한민국헌법제일조");
        assert_eq!(chunks, vec!["대한민국헌", "법제일조"]);
    }
}
