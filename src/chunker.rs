//! Sliding-window text chunking for long documents.

/// Splits `text` into overlapping fixed-size character windows.
///
/// Each chunk covers `[start, start + size)` clipped to the end of the text;
/// the next window begins `overlap` characters before the previous one ended,
/// so neighboring chunks share that much context. The final chunk always ends
/// exactly at the end of the text, even when shorter than `size`, and text
/// shorter than `size` yields a single chunk equal to the whole text.
///
/// Windows are measured in characters, not bytes, so multi-byte input never
/// splits mid-codepoint. Callers must uphold `size > 0` and `overlap < size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(size > 0, "chunk size must be positive");
    debug_assert!(overlap < size, "overlap must be smaller than chunk size");

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let end = (start + size).min(total);
        chunks.push(chars[start..end].iter().collect());
        if end == total {
            break;
        }
        start = end - overlap;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk_text("tiny", 800, 120);
        assert_eq!(chunks, vec!["tiny".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 10, 2).is_empty());
    }

    #[test]
    fn exact_windows_without_overlap() {
        let chunks = chunk_text("0123456789abcdefghij", 10, 0);
        assert_eq!(chunks, vec!["0123456789", "abcdefghij"]);
    }

    #[test]
    fn neighbors_share_overlap_characters() {
        let chunks = chunk_text("0123456789abcdefghij", 10, 5);
        assert_eq!(chunks[0], "0123456789");
        assert_eq!(chunks[1], "56789abcde");
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(5).collect::<Vec<_>>().into_iter().rev().collect();
            let head: String = pair[1].chars().take(5).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn final_chunk_ends_at_text_end() {
        let text = "the quick brown fox jumps over the lazy dog";
        let chunks = chunk_text(text, 10, 3);
        let last = chunks.last().expect("at least one chunk");
        assert!(text.ends_with(last.as_str()));
    }

    #[test]
    fn trimmed_concatenation_reconstructs_text() {
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let overlap = 4;
        let chunks = chunk_text(text, 9, overlap);
        let mut rebuilt: String = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn multibyte_text_chunks_on_char_boundaries() {
        let text = "héllo wörld 👋 grüße";
        let chunks = chunk_text(text, 5, 2);
        let rebuilt: String = {
            let mut out = chunks[0].clone();
            for chunk in &chunks[1..] {
                out.extend(chunk.chars().skip(2));
            }
            out
        };
        assert_eq!(rebuilt, text);
    }
}
