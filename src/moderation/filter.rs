use regex::{Regex, RegexBuilder};

/// Result of running the filter over one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    pub is_valid: bool,
    pub violations: Vec<String>,
    pub filtered_content: String,
}

const DEFAULT_BANNED_WORDS: &[&str] = &[
    "spam", "scam", "fraud", "phishing", "hack", "theft", "murder", "death",
];

const DEFAULT_MIN_LENGTH: usize = 1;
const DEFAULT_MAX_LENGTH: usize = 2000;

/// Pure content classifier for the chat send path.
///
/// `check` is deterministic and side-effect free. Checks run in a fixed
/// order: length bounds, banned words (redacted in place), pattern
/// detections (flagged, not redacted), spam heuristic.
pub struct ContentFilter {
    banned: Vec<(String, Regex)>,
    url: Regex,
    mention: Regex,
    hashtag: Regex,
    card_number: Regex,
    phone_number: Regex,
    min_length: usize,
    max_length: usize,
}

impl ContentFilter {
    pub fn new() -> Self {
        Self::with_banned_words(DEFAULT_BANNED_WORDS.iter().map(|w| w.to_string()))
    }

    pub fn with_banned_words(words: impl IntoIterator<Item = String>) -> Self {
        let banned = words
            .into_iter()
            .filter_map(|word| {
                RegexBuilder::new(&regex::escape(&word))
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (word, re))
            })
            .collect();

        // The pattern set cannot fail to compile; expressed as a build-time
        // invariant rather than a runtime branch.
        Self {
            banned,
            url: Regex::new(r"https?://\S+").unwrap(),
            mention: Regex::new(r"@\w+").unwrap(),
            hashtag: Regex::new(r"#\w+").unwrap(),
            card_number: Regex::new(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b").unwrap(),
            phone_number: Regex::new(r"\b\d{3}[\s-]?\d{3}[\s-]?\d{4}\b").unwrap(),
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn check(&self, content: &str) -> FilterVerdict {
        let mut violations = Vec::new();
        let mut filtered_content = content.to_string();

        let char_count = content.chars().count();
        if char_count < self.min_length {
            violations.push("message is too short".to_string());
        }
        if char_count > self.max_length {
            violations.push("message is too long".to_string());
            filtered_content = content.chars().take(self.max_length).collect();
        }

        for (word, re) in &self.banned {
            if re.is_match(content) {
                violations.push(format!("banned word: {}", word));
                filtered_content = re
                    .replace_all(&filtered_content, "*".repeat(word.chars().count()).as_str())
                    .into_owned();
            }
        }

        for (re, violation) in [
            (&self.url, "links detected"),
            (&self.mention, "mentions detected"),
            (&self.hashtag, "hashtags detected"),
            (&self.card_number, "card numbers detected"),
            (&self.phone_number, "phone numbers detected"),
        ] {
            if re.is_match(content) {
                violations.push(violation.to_string());
            }
        }

        if Self::is_spam(content) {
            violations.push("possible spam".to_string());
        }

        FilterVerdict {
            is_valid: violations.is_empty(),
            violations,
            filtered_content,
        }
    }

    fn is_spam(content: &str) -> bool {
        // Low character diversity reads as keyboard mashing or repetition
        let total = content.chars().count();
        let unique = content
            .chars()
            .collect::<std::collections::HashSet<_>>()
            .len();
        if (unique as f64) < (total as f64) * 0.3 {
            return true;
        }

        // One token dominating a longer message
        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.len() > 5 {
            let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
            for &token in &tokens {
                let count = counts.entry(token).or_insert(0);
                *count += 1;
                if (*count as f64) > (tokens.len() as f64) * 0.5 {
                    return true;
                }
            }
        }

        false
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new()
    }
}
