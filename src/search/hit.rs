use std::hash::{Hash, Hasher};

/// A deduplicated, normalized reference to one search result
///
/// Two hits are the same hit when their `dedupe_key`s are equal, whatever the
/// other fields say.
#[derive(Debug, Clone)]
pub struct Hit {
    pub dedupe_key: String,
    pub repo: String,
    pub path: String,
    pub content_url: String,
}

impl Hit {
    /// Creates a hit, deriving its dedup key from the content URL
    pub fn new(
        repo: impl Into<String>,
        path: impl Into<String>,
        content_url: impl Into<String>,
    ) -> Self {
        let content_url = content_url.into();
        Self {
            dedupe_key: dedupe_key(&content_url).to_string(),
            repo: repo.into(),
            path: path.into(),
            content_url,
        }
    }
}

impl PartialEq for Hit {
    fn eq(&self, other: &Self) -> bool {
        self.dedupe_key == other.dedupe_key
    }
}

impl Eq for Hit {}

impl Hash for Hit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dedupe_key.hash(state);
    }
}

/// Returns the URL with any fragment (`#...`) removed
///
/// # Examples
///
/// ```
/// use codetrawl::search::dedupe_key;
///
/// assert_eq!(dedupe_key("https://example.com/a.rs#L10"), "https://example.com/a.rs");
/// assert_eq!(dedupe_key("https://example.com/a.rs"), "https://example.com/a.rs");
/// ```
pub fn dedupe_key(url: &str) -> &str {
    match url.split_once('#') {
        Some((before, _)) => before,
        None => url,
    }
}
