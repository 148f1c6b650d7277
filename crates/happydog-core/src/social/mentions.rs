// `@nickname` extraction for comment mention fan-out (spec.md §4.6.4).
// Unicode word characters are permitted in the nickname token.

use regex::Regex;
use std::sync::OnceLock;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@(\w+)").expect("mention regex is a fixed literal"))
}

/// Extract the distinct `@nickname` tokens referenced in `text`, preserving
/// first-occurrence order. Does not resolve them to users or exclude the
/// author — callers do both afterward.
pub fn extract_mentioned_nicknames(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for cap in mention_pattern().captures_iter(text) {
        let nickname = cap[1].to_string();
        if seen.insert(nickname.clone()) {
            out.push(nickname);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multiple_distinct_mentions_in_order() {
        let got = extract_mentioned_nicknames("hey @alice and @bob, @alice again!");
        assert_eq!(got, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn no_mentions_returns_empty() {
        assert!(extract_mentioned_nicknames("just a nice comment").is_empty());
    }

    #[test]
    fn unicode_nicknames_are_matched() {
        let got = extract_mentioned_nicknames("@jos\u{e9}_mu\u{f1}oz thanks!");
        assert_eq!(got, vec!["jos\u{e9}_mu\u{f1}oz".to_string()]);
    }
}
