/// The text after the last space of the trimmed input, or `""` when the
/// input is a single word.
pub fn last_word(s: &str) -> &str {
    let trimmed = s.trim();
    match trimmed.rfind(' ') {
        Some(pos) => &trimmed[pos + 1..],
        None => "",
    }
}

/// `"dEC"` → `"Dec"`.
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_word_after_last_space() {
        assert_eq!(last_word("TAPAS 26               SI NG 20DEC"), "20DEC");
        assert_eq!(last_word("  FOO BAR  "), "BAR");
    }

    #[test]
    fn last_word_of_single_word_is_empty() {
        assert_eq!(last_word("20DEC"), "");
        assert_eq!(last_word(""), "");
    }

    #[test]
    fn title_case_month() {
        assert_eq!(title_case("DEC"), "Dec");
        assert_eq!(title_case("dEc"), "Dec");
        assert_eq!(title_case(""), "");
    }
}
