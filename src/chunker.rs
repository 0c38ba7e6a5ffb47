//! Content identity and overlapping chunking.
//!
//! Sizes and overlaps are measured in characters, never bytes, so chunk
//! boundaries always fall on UTF-8 character boundaries.

use sha2::{Digest, Sha256};

/// A chunk of text plus how many leading characters were copied from the
/// previous chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub overlap: usize,
}

impl TextChunk {
    /// The chunk text with its overlap prefix removed.
    pub fn body(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None if self.overlap == 0 => &self.text,
            None => "",
        }
    }
}

/// Deterministic content identity: lowercase hex SHA-256 of the raw bytes.
pub fn identify(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Split content into ordered chunk texts.
pub fn chunk(content: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    chunk_with_overlap(content, chunk_size, overlap)
        .into_iter()
        .map(|c| c.text)
        .collect()
}

/// Split content into chunks, recording the overlap length of each.
///
/// Content no longer than `chunk_size` yields a single chunk. Otherwise
/// blank-line separated paragraphs are packed into chunks of at most
/// `chunk_size` characters; a paragraph that alone exceeds `chunk_size` is
/// cut with a sliding window advancing by `chunk_size - overlap`. Every chunk
/// after the first is prefixed with the `overlap` characters that precede it.
pub fn chunk_with_overlap(content: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= chunk_size {
        return vec![TextChunk {
            text: content.to_string(),
            overlap: 0,
        }];
    }

    // Byte offset of every char position, plus the end of the string.
    let mut offsets: Vec<usize> = content.char_indices().map(|(b, _)| b).collect();
    offsets.push(content.len());

    let cores = pack_cores(&chars, chunk_size, overlap);

    cores
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            let prefix = if i == 0 { 0 } else { overlap.min(start) };
            TextChunk {
                text: content[offsets[start - prefix]..offsets[end]].to_string(),
                overlap: prefix,
            }
        })
        .collect()
}

/// Rebuild the original content from its chunks.
pub fn reconstruct(chunks: &[TextChunk]) -> String {
    chunks.iter().map(TextChunk::body).collect()
}

/// Partition `[0, chars.len())` into non-overlapping core spans.
fn pack_cores(chars: &[char], chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let is_blank = |s: usize, e: usize| chars[s..e].iter().all(|c| c.is_whitespace());

    let mut cores = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (start, end) in paragraph_segments(chars) {
        if end - start > chunk_size {
            let mut pos = start;
            if let Some((cs, ce)) = current.take() {
                if is_blank(cs, ce) {
                    pos = cs;
                } else {
                    cores.push((cs, ce));
                }
            }
            while pos < end {
                let prefix = overlap.min(pos);
                let stop = (pos + chunk_size - prefix).min(end);
                cores.push((pos, stop));
                pos = stop;
            }
            continue;
        }

        current = match current {
            Some((cs, _)) if end - cs <= chunk_size => Some((cs, end)),
            Some(span) => {
                cores.push(span);
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }

    if let Some((cs, ce)) = current {
        match cores.last_mut() {
            Some(last) if is_blank(cs, ce) => last.1 = ce,
            _ => cores.push((cs, ce)),
        }
    }

    cores
}

/// Paragraph spans; each span carries its trailing blank-line separator.
fn paragraph_segments(chars: &[char]) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\n' {
            i += 1;
            continue;
        }

        let mut j = i;
        let mut newlines = 0;
        while j < chars.len() && matches!(chars[j], '\n' | '\r' | ' ' | '\t') {
            if chars[j] == '\n' {
                newlines += 1;
            }
            j += 1;
        }

        if newlines >= 2 {
            segments.push((start, j));
            start = j;
        }
        i = j;
    }

    if start < chars.len() {
        segments.push((start, chars.len()));
    }
    segments
}
