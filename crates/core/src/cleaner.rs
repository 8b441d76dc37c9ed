use crate::error::Result;
use regex::{Captures, Regex};

/// Scrubs OCR noise out of extracted document text before chunking.
///
/// The transformations run in a fixed order; later rules see the output of
/// earlier ones, so e.g. a table-of-contents page number may already have
/// been blanked by the standalone-number rule by the time the dot-leader
/// rule runs.
pub struct TextCleaner {
    form_feed: Regex,
    page_footer: Regex,
    standalone_number: Regex,
    artifact_run: Regex,
    toc_leader: Regex,
    newline_run: Regex,
    space_run: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            form_feed: Regex::new(r"\f")?,
            page_footer: Regex::new(r"(?i)Page\s*\d+(\s*of\s*\d+)?")?,
            standalone_number: Regex::new(r"\b\d{1,3}\b")?,
            artifact_run: Regex::new(r"[\|\*_]{2,}")?,
            toc_leader: Regex::new(r"\.{5,}\s*\d+")?,
            newline_run: Regex::new(r"\n{2,}")?,
            space_run: Regex::new(r"[ \t]+")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let text = self.form_feed.replace_all(text, "");
        let text = self.page_footer.replace_all(&text, "");

        // Standalone numbers of one to three digits are matched, but only
        // matches up to two digits long are blanked; three-digit matches are
        // put back unchanged.
        let text = self
            .standalone_number
            .replace_all(&text, |captures: &Captures<'_>| {
                let digits = &captures[0];
                if digits.len() <= 2 {
                    String::new()
                } else {
                    digits.to_string()
                }
            });

        let text = self.artifact_run.replace_all(&text, "");

        let text = text
            .split('\n')
            .filter(|line| !is_short_caps_line(line))
            .collect::<Vec<_>>()
            .join("\n");

        let text = self.toc_leader.replace_all(&text, "");
        let text = self.newline_run.replace_all(&text, "\n\n");
        let text = self.space_run.replace_all(&text, " ");

        text.trim().to_string()
    }
}

/// Header/footer heuristic: every cased character uppercase, at least one
/// cased character, and no more than five words.
fn is_short_caps_line(line: &str) -> bool {
    let trimmed = line.trim();
    let mut has_cased = false;

    for character in trimmed.chars() {
        if character.is_alphabetic() {
            has_cased = true;
            if !character.is_uppercase() {
                return false;
            }
        }
    }

    has_cased && trimmed.split_whitespace().count() <= 5
}

#[cfg(test)]
mod tests {
    use super::TextCleaner;

    fn cleaner() -> TextCleaner {
        TextCleaner::new().expect("cleaner patterns should compile")
    }

    #[test]
    fn page_footer_and_caps_header_are_removed() {
        let input = "Page 2 of 10\n\nHELLO WORLD\n\nReal paragraph text here.";
        assert_eq!(cleaner().clean(input), "Real paragraph text here.");
    }

    #[test]
    fn short_standalone_numbers_are_blanked_but_three_digit_ones_survive() {
        // Pins the observed behavior: the pattern matches one to three digit
        // groups, yet only those of length <= 2 are removed.
        assert_eq!(cleaner().clean("1 22 333 4444"), "333 4444");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let input = "INTRO\n\n\n\nThe   quick\tbrown fox.\n\nContents ......... 123\n\nDone 7 now.";
        let once = cleaner().clean(input);
        let twice = cleaner().clean(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn toc_dot_leaders_with_three_digit_pages_are_removed() {
        assert_eq!(cleaner().clean("Contents ......... 123"), "Contents");
    }

    #[test]
    fn toc_dot_leaders_survive_when_the_page_number_was_blanked_first() {
        // The two-digit page number is gone before the dot-leader rule runs,
        // so the rule no longer matches and the dots stay behind.
        assert_eq!(cleaner().clean("Contents ......... 42"), "Contents .........");
    }

    #[test]
    fn caps_lines_longer_than_five_words_are_kept() {
        let input = "THIS HEADER HAS SIX WHOLE WORDS\nbody text";
        assert_eq!(
            cleaner().clean(input),
            "THIS HEADER HAS SIX WHOLE WORDS\nbody text"
        );
    }

    #[test]
    fn mixed_case_short_lines_are_kept() {
        assert_eq!(cleaner().clean("Hello World"), "Hello World");
    }

    #[test]
    fn form_feeds_and_artifact_runs_are_stripped() {
        let input = "alpha\u{000C}beta ___ gamma ||||";
        assert_eq!(cleaner().clean(input), "alphabeta gamma");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(cleaner().clean(""), "");
        assert_eq!(cleaner().clean("  \n\t "), "");
    }
}
