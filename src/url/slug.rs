use url::Url;

/// Derives the slug of a post URL: its final non-empty path segment
///
/// Query strings and fragments are ignored and a trailing slash is tolerated,
/// so `https://x.substack.com/p/hello/?utm=1` and `https://x.substack.com/p/hello`
/// share the slug `hello`. Strings that do not parse as URLs fall back to the
/// text after the last `/`.
///
/// # Examples
///
/// ```
/// use press_harvest::url::slug_from_url;
///
/// assert_eq!(slug_from_url("https://example.substack.com/p/first-post"), "first-post");
/// assert_eq!(slug_from_url("https://example.substack.com/p/first-post/"), "first-post");
/// ```
pub fn slug_from_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string(),
        Err(_) => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Returns true if the URL path contains any of the exclusion keywords
pub fn is_excluded(url: &str, keywords: &[String]) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|keyword| path.contains(keyword.as_str()))
}

/// Drops every URL whose path contains an exclusion keyword, preserving order
pub fn filter_excluded(urls: Vec<String>, keywords: &[String]) -> Vec<String> {
    urls.into_iter()
        .filter(|url| !is_excluded(url, keywords))
        .collect()
}
