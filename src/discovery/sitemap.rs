//! Parse a publication's sitemap.xml into post URLs.

use super::{DiscoveryError, DiscoveryResult};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Collects every `<loc>` value of a sitemap, in document order
///
/// Both `urlset` and sitemap-index documents are accepted; index entries are
/// returned as-is since publications serve a single flat sitemap.
pub fn parse_sitemap(xml: &str) -> DiscoveryResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut urls = Vec::new();
    let mut in_loc = false;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "urlset" | "sitemapindex" => saw_root = true,
                    "loc" => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|err| DiscoveryError::Xml(err.to_string()))?;
                let loc = text.trim();
                if !loc.is_empty() {
                    urls.push(loc.to_string());
                }
            }
            Ok(Event::CData(e)) if in_loc => {
                let text = String::from_utf8_lossy(&e);
                let loc = text.trim();
                if !loc.is_empty() {
                    urls.push(loc.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DiscoveryError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DiscoveryError::Xml(
            "document is not a sitemap (no urlset or sitemapindex root)".to_string(),
        ));
    }

    Ok(urls)
}
