/// Pinned token-count approximation: `ceil(0.75 * words + 0.25 * punctuation_tokens)`.
///
/// Chunk identity is a function of text, and chunking decisions are a function
/// of token counts, so this must never change behavior across releases once
/// chunks have been written to disk — there is deliberately no BPE dependency
/// here, just one stable arithmetic rule.
pub fn count_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let punctuation = text.chars().filter(|c| is_punctuation_token(*c)).count();
    let estimate = 0.75 * words as f64 + 0.25 * punctuation as f64;
    estimate.ceil() as usize
}

fn is_punctuation_token(c: char) -> bool {
    !c.is_whitespace() && !c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn plain_words_count_at_three_quarters() {
        // 4 words, no punctuation: ceil(0.75 * 4) = 3
        assert_eq!(count_tokens("one two three four"), 3);
    }

    #[test]
    fn punctuation_adds_a_quarter_token_each() {
        // "hi, there!" -> 2 words, 2 punctuation chars: ceil(0.75*2 + 0.25*2) = ceil(2.0) = 2
        assert_eq!(count_tokens("hi, there!"), 2);
    }

    #[test]
    fn count_is_stable_across_repeated_calls() {
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(count_tokens(text), count_tokens(text));
    }
}
