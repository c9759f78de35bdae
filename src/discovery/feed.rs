//! Parse a publication's RSS feed into post URLs.

use super::{DiscoveryError, DiscoveryResult};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Collects the `<link>` of each `<item>`, keeping at most `limit` entries
///
/// Feeds list the most recent posts first, so the cap keeps the newest ones.
/// Channel-level `<link>` elements outside any item are ignored.
pub fn parse_feed(xml: &str, limit: usize) -> DiscoveryResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut urls = Vec::new();
    let mut in_item = false;
    let mut in_link = false;
    let mut saw_channel = false;

    loop {
        if urls.len() >= limit {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"rss" | b"channel" | b"feed" => saw_channel = true,
                b"item" => in_item = true,
                b"link" if in_item => in_link = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" => in_item = false,
                b"link" => in_link = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_link => {
                let text = e
                    .unescape()
                    .map_err(|err| DiscoveryError::Xml(err.to_string()))?;
                let link = text.trim();
                if !link.is_empty() {
                    urls.push(link.to_string());
                }
            }
            Ok(Event::CData(e)) if in_link => {
                let text = String::from_utf8_lossy(&e);
                let link = text.trim();
                if !link.is_empty() {
                    urls.push(link.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DiscoveryError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_channel {
        return Err(DiscoveryError::Xml(
            "document is not a feed (no rss or channel element)".to_string(),
        ));
    }

    Ok(urls)
}
