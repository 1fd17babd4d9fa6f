//! Word counting and word-budget truncation.

/// Returns the number of whitespace-delimited words in `text`.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncates `text` to at most `budget` words.
///
/// Text within budget is returned unchanged. Otherwise the text is cut right
/// after word `budget`, keeping its original whitespace and line structure,
/// and when the last sentence end in that cut sits in its final 20%, the
/// text ends on that sentence instead.
///
/// # Examples
///
/// ```
/// use modelchain::postprocess::trim_to_word_budget;
///
/// assert_eq!(trim_to_word_budget("one two three", 5), "one two three");
/// assert_eq!(trim_to_word_budget("one two\nthree four", 3), "one two\nthree");
/// ```
#[must_use]
pub fn trim_to_word_budget(text: &str, budget: usize) -> String {
    let Some(end) = word_end(text, budget) else {
        return text.to_string();
    };

    let truncated = text[..end].trim_start();
    if truncated.ends_with(&['.', '!', '?'][..]) {
        return truncated.to_string();
    }

    match last_sentence_end(truncated) {
        Some(idx) if idx * 5 >= truncated.len() * 4 => truncated[..=idx].to_string(),
        _ => truncated.to_string(),
    }
}

/// Byte offset just past word `n`, or `None` if the text has no more than
/// `n` words.
fn word_end(text: &str, n: usize) -> Option<usize> {
    let mut seen = 0;
    let mut word_start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if word_start.take().is_some() {
                seen += 1;
                if seen == n {
                    return text[i..].split_whitespace().next().map(|_| i);
                }
            }
        } else if word_start.is_none() {
            if seen == n {
                return Some(0);
            }
            word_start = Some(i);
        }
    }
    None
}

/// Byte offset of the last `.`, `!` or `?` followed by whitespace.
fn last_sentence_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    let mut last = None;
    while let Some((i, c)) = chars.next() {
        let ends_sentence = matches!(c, '.' | '!' | '?');
        if ends_sentence && chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            last = Some(i);
        }
    }
    last
}
