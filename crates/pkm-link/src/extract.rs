use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WIKILINK: Regex = Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap();
}

const CONTEXT_WINDOW: usize = 50;
const CONTEXT_MAX_LEN: usize = 200;

/// One `[[...]]` occurrence found in a document's body, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub raw: String,
    pub target: String,
    pub display: String,
    pub context: String,
}

/// Scans `text` for `[[target]]` / `[[target|display]]` occurrences, each
/// carrying a ±50-char window of surrounding text (newlines collapsed to
/// spaces, truncated to 200 chars) for later display.
pub fn extract_wikilinks(text: &str) -> Vec<RawLink> {
    let chars: Vec<char> = text.chars().collect();
    let char_to_byte: Vec<usize> = {
        let mut offsets = Vec::with_capacity(chars.len() + 1);
        let mut byte_idx = 0;
        for c in &chars {
            offsets.push(byte_idx);
            byte_idx += c.len_utf8();
        }
        offsets.push(byte_idx);
        offsets
    };

    let mut out = Vec::new();
    for caps in WIKILINK.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let target = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        let display = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| target.clone());

        let start_byte = whole.start();
        let end_byte = whole.end();
        let start_char = char_to_byte.partition_point(|&b| b <= start_byte).saturating_sub(1);
        let end_char = char_to_byte.partition_point(|&b| b <= end_byte).saturating_sub(1);

        let ctx_start_char = start_char.saturating_sub(CONTEXT_WINDOW);
        let ctx_end_char = (end_char + CONTEXT_WINDOW).min(chars.len());
        let mut context: String = chars[ctx_start_char..ctx_end_char].iter().collect();
        context = context.replace('\n', " ");
        context.truncate(CONTEXT_MAX_LEN);

        out.push(RawLink {
            raw: whole.as_str().to_string(),
            target,
            display,
            context,
        });
    }
    out
}
