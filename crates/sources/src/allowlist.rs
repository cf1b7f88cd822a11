use {
    serde::{Deserialize, Serialize},
    url::Url,
};

/// A set of root domains whose pages may be cited.
///
/// A URL is allowed when its host equals a root or is a subdomain of it
/// (`www.who.int` and `apps.who.int` match `who.int`; `evilwho.int` and
/// `who.int.example.com` do not). Comparison is structural on the parsed
/// host, case-insensitive, and ignores a trailing root dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlist {
    roots: Vec<String>,
}

impl Allowlist {
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for root in roots {
            let root = normalize_host(root.as_ref());
            if !root.is_empty() && !normalized.contains(&root) {
                normalized.push(root);
            }
        }
        Self { roots: normalized }
    }

    #[must_use]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `url` parses as an http(s) URL whose host is allow-listed.
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        host_of(url).is_some_and(|host| self.allows_host(&host))
    }

    /// Whether an already-extracted host is allow-listed.
    #[must_use]
    pub fn allows_host(&self, host: &str) -> bool {
        let host = normalize_host(host);
        if host.is_empty() {
            return false;
        }
        self.roots.iter().any(|root| {
            host == *root
                || host
                    .strip_suffix(root.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
        })
    }
}

/// Check a URL against a list of root domains.
pub fn is_allowed(url: &str, roots: &[String]) -> bool {
    Allowlist::new(roots).allows(url)
}

/// Lowercased host of an http(s) URL, or `None` when the URL is malformed,
/// uses another scheme, or has no host.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = normalize_host(parsed.host_str()?);
    (!host.is_empty()).then_some(host)
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn roots() -> Vec<String> {
        ["who.int", "cdc.gov", "ncbi.nlm.nih.gov", "nih.gov"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[rstest]
    #[case("https://www.who.int/news", true)]
    #[case("https://who.int", true)]
    #[case("http://apps.WHO.int/iris", true)]
    #[case("https://www.who.int./x", true)]
    #[case("https://pubmed.ncbi.nlm.nih.gov/123", true)]
    #[case("https://www.cdc.gov:443/flu", true)]
    #[case("https://evilwho.int/", false)]
    #[case("https://who.int.example.com/", false)]
    #[case("https://example.com/?ref=who.int", false)]
    #[case("https://example.com/who.int", false)]
    #[case("ftp://who.int/file", false)]
    #[case("not a url", false)]
    #[case("https://", false)]
    #[case("", false)]
    fn structural_host_matching(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_allowed(url, &roots()), expected, "{url}");
    }

    #[test]
    fn empty_allowlist_allows_nothing() {
        assert!(!is_allowed("https://who.int", &[]));
        assert!(Allowlist::default().is_empty());
    }

    #[test]
    fn roots_are_normalized_and_deduplicated() {
        let list = Allowlist::new(["WHO.int.", "who.int", "  cdc.gov "]);
        assert_eq!(list.roots(), ["who.int", "cdc.gov"]);
        assert!(list.allows("https://www.cdc.gov/"));
    }

    #[test]
    fn bare_dot_prefix_is_not_a_subdomain() {
        let list = Allowlist::new(["who.int"]);
        assert!(!list.allows_host(".who.int"));
        assert!(list.allows_host("a.who.int"));
    }
}
