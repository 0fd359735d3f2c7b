//! Chunking (§4.1): turns a block of source text into an ordered list of
//! `(start, end)` byte spans that tile the input exactly.
//!
//! Positions in this crate are UTF-8 byte offsets, not UTF-16 code units or
//! Unicode scalar counts — the natural unit for Rust `&str` slicing. Every
//! boundary produced here falls on a `char` boundary.

/// Chunking strategy (`chunkType` setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Split at sentence terminators, §4.1.
    #[default]
    Sentence,
    /// Split on blank-line runs, §4.1.
    Paragraph,
}

/// Characters that, trailing a sentence terminator, are greedily folded
/// into the same chunk (closing quotes/emphasis markers).
fn is_trailing_punctuation(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | '\u{201D}' | '\u{2019}' | ')' | ']' | '*' | '_' | '`'
    )
}

/// Split `text` into chunks per `mode`. Returned spans are byte offsets
/// local to `text` (callers add the document's base offset). Concatenating
/// `text[start..end]` for every returned span reproduces `text` exactly.
pub fn split_chunks(text: &str, mode: ChunkMode, min_chunk_length: usize) -> Vec<(usize, usize)> {
    if text.is_empty() {
        return Vec::new();
    }
    match mode {
        ChunkMode::Sentence => split_sentences(text, min_chunk_length),
        ChunkMode::Paragraph => split_paragraphs(text),
    }
}

fn split_sentences(text: &str, min_chunk_length: usize) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let n = chars.len();
    let mut spans = Vec::new();
    let mut chunk_start_idx = 0usize;

    while chunk_start_idx < n {
        // Consume at least `min_chunk_length` characters before looking
        // for a terminator.
        let mut i = chunk_start_idx;
        let mut consumed = 0usize;
        while i < n && consumed < min_chunk_length {
            i += 1;
            consumed += 1;
        }

        // Scan forward for the next sentence terminator not immediately
        // followed by an alphanumeric character (so "3.14" doesn't split).
        let mut terminator = None;
        let mut j = i;
        while j < n {
            let (_, c) = chars[j];
            if matches!(c, '.' | '!' | '?' | '\n') {
                let next_is_alnum = chars
                    .get(j + 1)
                    .map(|(_, c2)| c2.is_alphanumeric())
                    .unwrap_or(false);
                if !next_is_alnum {
                    terminator = Some(j);
                    break;
                }
            }
            j += 1;
        }

        match terminator {
            None => {
                let start_byte = chars[chunk_start_idx].0;
                spans.push((start_byte, text.len()));
                break;
            }
            Some(t) => {
                let mut end_idx = t + 1;
                while end_idx < n && is_trailing_punctuation(chars[end_idx].1) {
                    end_idx += 1;
                }
                while end_idx < n && chars[end_idx].1.is_whitespace() {
                    end_idx += 1;
                }
                let start_byte = chars[chunk_start_idx].0;
                let end_byte = chars.get(end_idx).map(|(b, _)| *b).unwrap_or(text.len());
                spans.push((start_byte, end_byte));
                chunk_start_idx = end_idx;
            }
        }
    }

    spans
}

fn split_paragraphs(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let n = chars.len();
    let mut spans = Vec::new();
    let mut chunk_start_idx = 0usize;
    let mut i = 0usize;

    while i < n {
        if chars[i].1 == '\n' {
            let run_start = i;
            let mut j = i;
            let mut newline_count = 0usize;
            while j < n && chars[j].1.is_whitespace() {
                if chars[j].1 == '\n' {
                    newline_count += 1;
                }
                j += 1;
            }
            if newline_count >= 2 {
                // Blank-line run: fold the whole run into the preceding
                // chunk, then start the next chunk right after it.
                let start_byte = chars[chunk_start_idx].0;
                let end_byte = chars.get(j).map(|(b, _)| *b).unwrap_or(text.len());
                spans.push((start_byte, end_byte));
                chunk_start_idx = j;
                i = j;
                continue;
            } else {
                i = run_start + 1;
                continue;
            }
        }
        i += 1;
    }

    if chunk_start_idx < n {
        let start_byte = chars[chunk_start_idx].0;
        spans.push((start_byte, text.len()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(text: &str, spans: &[(usize, usize)]) -> String {
        spans.iter().map(|&(s, e)| &text[s..e]).collect()
    }

    #[test]
    fn sentence_mode_tiles_source_exactly() {
        let text = "First there was one bottle top. Then there were two bottle tops. \
                     Penultimately there were three bottle tops. Finally there were four bottle tops.";
        let spans = split_chunks(text, ChunkMode::Sentence, 0);
        assert_eq!(spans.len(), 4);
        assert_eq!(reconstruct(text, &spans), text);
        assert_eq!(spans[0].0, 0);
        assert_eq!(spans.last().unwrap().1, text.len());
    }

    #[test]
    fn sentence_mode_respects_min_chunk_length() {
        let text = "A. B. C. D.";
        // with min_chunk_length 0 every sentence is its own chunk
        let spans = split_chunks(text, ChunkMode::Sentence, 0);
        assert_eq!(spans.len(), 4);

        // a large minimum folds short sentences together
        let spans = split_chunks(text, ChunkMode::Sentence, 5);
        assert!(spans.len() < 4);
        assert_eq!(reconstruct(text, &spans), text);
    }

    #[test]
    fn sentence_mode_does_not_split_decimals() {
        let text = "Pi is 3.14 and that is that.";
        let spans = split_chunks(text, ChunkMode::Sentence, 0);
        assert_eq!(spans.len(), 1);
        assert_eq!(reconstruct(text, &spans), text);
    }

    #[test]
    fn sentence_mode_no_terminator_is_one_chunk() {
        let text = "no terminator here just words";
        let spans = split_chunks(text, ChunkMode::Sentence, 0);
        assert_eq!(spans, vec![(0, text.len())]);
    }

    #[test]
    fn paragraph_mode_preserves_separator_in_preceding_chunk() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let spans = split_chunks(text, ChunkMode::Paragraph, 0);
        assert_eq!(spans.len(), 2);
        assert_eq!(reconstruct(text, &spans), text);
        assert_eq!(&text[spans[0].0..spans[0].1], "First paragraph.\n\n");
        assert_eq!(&text[spans[1].0..spans[1].1], "Second paragraph.");
    }

    #[test]
    fn paragraph_mode_single_paragraph_stays_whole() {
        let text = "Just one paragraph with no blank lines.\nStill one paragraph.";
        let spans = split_chunks(text, ChunkMode::Paragraph, 0);
        assert_eq!(spans.len(), 1);
        assert_eq!(reconstruct(text, &spans), text);
    }
}
