//! `file_name` derivation: lowercase, non-alphanumerics collapse to a
//! single `-`, capped at 50 characters.

pub fn slugify(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut last_was_dash = false;

    for ch in display_name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }

    let trimmed = out.trim_matches('-');
    let capped: String = trimmed.chars().take(50).collect();
    capped.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_and_spaces() {
        assert_eq!(slugify("Chapter 1: Intro to Biology!!"), "chapter-1-intro-to-biology");
    }

    #[test]
    fn caps_at_fifty_characters() {
        let long_name = "A".repeat(80);
        assert_eq!(slugify(&long_name).chars().count(), 50);
    }

    #[test]
    fn trims_leading_and_trailing_dashes() {
        assert_eq!(slugify("  --Weird Name--  "), "weird-name");
    }
}
