use regex::Regex;
use std::sync::OnceLock;

static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();

// Host label allows the odd characters (@ : %) that survive in real-world
// pasted links; the final label is capped at 63 characters per DNS limits.
fn link_pattern() -> &'static Regex {
    LINK_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,63}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*",
        )
        .expect("link pattern is valid")
    })
}

/// Scans free text for HTTP/HTTPS links, responsible for turning a pasted
/// message into the ordered list of preview candidates.
#[derive(Clone)]
pub struct LinkExtractor;

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns every non-overlapping URL match in order of appearance,
    /// matched case-insensitively but reported verbatim. Text with no
    /// well-formed URL (including empty text) yields an empty vector; this
    /// never fails.
    pub fn extract(&self, text: &str) -> Vec<String> {
        link_pattern()
            .find_iter(text)
            .map(|m| m.as_str().to_owned())
            .collect()
    }
}
