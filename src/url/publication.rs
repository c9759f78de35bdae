use crate::{UrlError, UrlResult};
use url::Url;

/// Subdomains that front a custom-domain publication without naming it
const GENERIC_SUBDOMAINS: &[&str] = &["blog", "newsletter", "mail", "read"];

/// Derives a stable, filesystem-friendly name for a publication from its root URL
///
/// The name keys the per-publication output directories, the state file and the
/// aggregated results file.
///
/// # Naming Rules
///
/// 1. Lowercase the host and drop a `www.` prefix (ports are ignored)
/// 2. `<name>.substack.com` becomes `name`
/// 3. `blog|newsletter|mail|read.<name>.<tld>` becomes `name`
/// 4. Any other three-label host `<sub>.<name>.<tld>` becomes `sub-name`
/// 5. A two-label host `<name>.<tld>` becomes `name`
/// 6. Anything else falls back to the first label
///
/// # Examples
///
/// ```
/// use press_harvest::url::publication_name;
///
/// assert_eq!(publication_name("https://www.example.substack.com").unwrap(), "example");
/// assert_eq!(publication_name("https://research.quant.com").unwrap(), "research-quant");
/// ```
pub fn publication_name(root: &str) -> UrlResult<String> {
    let url = Url::parse(root).map_err(|e| UrlError::Parse(format!("{}: {}", root, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| UrlError::MissingHost(root.to_string()))?
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let parts: Vec<&str> = host.split('.').collect();
    let name = match parts.as_slice() {
        [.., second_last, "com"] if *second_last == "substack" => {
            if parts.len() > 2 {
                parts[0]
            } else {
                "substack"
            }
        }
        [sub, name, _tld] if GENERIC_SUBDOMAINS.contains(sub) => *name,
        [sub, name, _tld] => return Ok(format!("{}-{}", sub, name)),
        [name, _tld] => *name,
        [first, ..] => *first,
        [] => "unknown",
    };

    Ok(name.to_string())
}

/// Returns the publication root without a trailing slash, for building endpoint URLs
pub fn publication_root(root: &str) -> &str {
    root.trim_end_matches('/')
}
