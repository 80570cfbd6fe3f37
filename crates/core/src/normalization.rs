use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Normalizes extracted page text: NBSP to space, collapsed inline whitespace,
/// at most one blank line between paragraphs.
pub fn clean_text(raw: &str) -> String {
    let replaced = raw.replace('\u{a0}', " ");
    let collapsed = INLINE_SPACE.replace_all(&replaced, " ");
    let paragraphs = BLANK_RUN.replace_all(&collapsed, "\n\n");
    paragraphs.trim().to_string()
}

/// Lowercased alphanumeric terms. Ingestion and querying must agree on this.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        let raw = "  Bid\u{a0}security \t is\n\n\n\nrequired  ";
        assert_eq!(clean_text(raw), "Bid security is\n\nrequired");
    }

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("What is the Bid-Security amount?"),
            vec!["what", "is", "the", "bid", "security", "amount"]
        );
        assert!(tokenize(" ?! ").is_empty());
    }
}
