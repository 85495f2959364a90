use lazy_static::lazy_static;
use regex::Regex;

use pkm_core::tokens::count_tokens;
use pkm_core::{hash::chunk_hash, Chunk, DocId};

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").unwrap();
    static ref PARAGRAPH_SPLIT: Regex = Regex::new(r"\n\n+").unwrap();
}

const DEFAULT_MAX_TOKENS: usize = 500;
const DEFAULT_OVERLAP_TOKENS: usize = 50;
const DEFAULT_MIN_CHUNK_TOKENS: usize = 20;

#[derive(Debug, Clone)]
struct SectionText {
    text: String,
    section: Option<String>,
    subsection: Option<String>,
}

#[derive(Debug, Clone)]
struct ChunkDraft {
    text: String,
    section: Option<String>,
    subsection: Option<String>,
}

/// Splits markdown text by headings. Every section carries the nearest
/// preceding level-1 heading as `section` and the nearest preceding level-2
/// as `subsection`; a new level-1 heading clears `subsection`.
fn split_by_headings(text: &str) -> Vec<SectionText> {
    let headings: Vec<(usize, usize, &str)> = HEADING
        .captures_iter(text)
        .map(|caps| {
            let level = caps.get(1).unwrap().as_str().len();
            let start = caps.get(0).unwrap().start();
            let title = caps.get(2).unwrap().as_str().trim();
            (level, start, title)
        })
        .collect();

    if headings.is_empty() {
        return vec![SectionText {
            text: text.trim().to_string(),
            section: None,
            subsection: None,
        }];
    }

    let mut sections = Vec::with_capacity(headings.len());
    let mut current_h1: Option<String> = None;
    let mut current_h2: Option<String> = None;

    for (i, (level, start, title)) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|h| h.1).unwrap_or(text.len());
        let section_text = text[*start..end].trim().to_string();

        match level {
            1 => {
                current_h1 = Some(title.to_string());
                current_h2 = None;
            }
            2 => current_h2 = Some(title.to_string()),
            _ => {}
        }

        sections.push(SectionText {
            text: section_text,
            section: current_h1.clone(),
            subsection: current_h2.clone(),
        });
    }

    sections
}

/// Splits on `.`/`!`/`?` followed by whitespace, consuming the whitespace run
/// as the boundary (the terminator stays attached to the preceding sentence).
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (byte_idx, c) = chars[i];
        if matches!(c, '.' | '!' | '?') && chars.get(i + 1).is_some_and(|(_, n)| n.is_whitespace()) {
            let end_byte = byte_idx + c.len_utf8();
            sentences.push(text[start..end_byte].to_string());
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            start = chars.get(j).map(|(b, _)| *b).unwrap_or(text.len());
            i = j;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    sentences
}

/// Greedily packs `current` (paragraphs or, recursively, sentences) against
/// `max_tokens`, flushing into `chunks` and retaining the last packed
/// element as ~10-20% overlap whenever the flushed buffer held >= 2 elements.
fn split_large_section(section: &SectionText, max_tokens: usize) -> Vec<ChunkDraft> {
    let section_tokens = count_tokens(&section.text);
    if section_tokens <= max_tokens {
        return vec![ChunkDraft {
            text: section.text.clone(),
            section: section.section.clone(),
            subsection: section.subsection.clone(),
        }];
    }

    let paragraphs: Vec<&str> = PARAGRAPH_SPLIT.split(&section.text).collect();
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    let mut flush = |current: &mut Vec<String>, current_tokens: &mut usize, join_with: &str, chunks: &mut Vec<ChunkDraft>| {
        if current.is_empty() {
            return;
        }
        let text = current.join(join_with);
        chunks.push(ChunkDraft {
            text,
            section: section.section.clone(),
            subsection: section.subsection.clone(),
        });
        if current.len() > 1 {
            let overlap = current.last().unwrap().clone();
            *current_tokens = count_tokens(&overlap);
            *current = vec![overlap];
        } else {
            current.clear();
            *current_tokens = 0;
        }
    };

    for para in paragraphs {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let para_tokens = count_tokens(para);

        if para_tokens > max_tokens {
            for sentence in split_sentences(para) {
                let sentence_tokens = count_tokens(&sentence);
                if current_tokens + sentence_tokens > max_tokens && !current.is_empty() {
                    flush(&mut current, &mut current_tokens, " ", &mut chunks);
                }
                current.push(sentence);
                current_tokens += sentence_tokens;
            }
        } else {
            if current_tokens + para_tokens > max_tokens && !current.is_empty() {
                flush(&mut current, &mut current_tokens, "\n\n", &mut chunks);
            }
            current.push(para.to_string());
            current_tokens += para_tokens;
        }
    }

    flush(&mut current, &mut current_tokens, "\n\n", &mut chunks);
    chunks
}

pub struct HierarchicalChunker {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub min_chunk_tokens: usize,
}

impl Default for HierarchicalChunker {
    fn default() -> Self {
        HierarchicalChunker {
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            min_chunk_tokens: DEFAULT_MIN_CHUNK_TOKENS,
        }
    }
}

impl HierarchicalChunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize, min_chunk_tokens: usize) -> Self {
        HierarchicalChunker {
            max_tokens,
            overlap_tokens,
            min_chunk_tokens,
        }
    }

    /// Chunks `text` into an ordered, content-addressed sequence. Equal
    /// `(text, max_tokens)` always yields byte-equal chunk text and hashes.
    pub fn chunk(&self, doc_id: &DocId, text: &str, language: &str) -> pkm_error::Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sections = split_by_headings(text);
        let mut drafts = Vec::new();
        for section in &sections {
            drafts.extend(split_large_section(section, self.max_tokens));
        }

        let mut filtered: Vec<ChunkDraft> = drafts
            .iter()
            .cloned()
            .filter(|d| count_tokens(&d.text) >= self.min_chunk_tokens)
            .collect();

        if filtered.is_empty() {
            // The document as a whole falls below the floor: produce one
            // chunk spanning the whole document rather than emptying it.
            filtered = vec![ChunkDraft {
                text: text.trim().to_string(),
                section: None,
                subsection: None,
            }];
        }

        let chunks = filtered
            .into_iter()
            .enumerate()
            .map(|(idx, draft)| {
                let trimmed = draft.text.trim().to_string();
                let hash = chunk_hash(&trimmed);
                let tokens = count_tokens(&trimmed);
                Chunk {
                    doc_id: *doc_id,
                    chunk_hash: hash,
                    chunk_index: idx as u32,
                    text: trimmed,
                    tokens,
                    section: draft.section,
                    subsection: draft.subsection,
                    modality: "text".to_string(),
                    language: language.to_string(),
                    page: None,
                }
            })
            .collect();

        Ok(chunks)
    }
}

/// Free-function form of the contract: `chunk(doc_id, text, language, max_tokens)`.
pub fn chunk_document(
    doc_id: &DocId,
    text: &str,
    language: &str,
    max_tokens: usize,
) -> pkm_error::Result<Vec<Chunk>> {
    HierarchicalChunker::new(max_tokens, DEFAULT_OVERLAP_TOKENS, DEFAULT_MIN_CHUNK_TOKENS)
        .chunk(doc_id, text, language)
}
