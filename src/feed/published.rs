use quick_xml::events::Event;
use quick_xml::Reader;

const ENTRY_TAGS: [&[u8]; 2] = [b"item", b"entry"];

// RSS `pubDate`, Atom `published`, and Atom 0.3 / dcterms `issued`.
const DATE_TAGS: [&[u8]; 3] = [b"pubDate", b"published", b"issued"];

/// Publication text of every entry exactly as the feed wrote it, in document
/// order. Entries without one get `None`.
pub fn raw_published(bytes: &[u8]) -> Vec<Option<String>> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        json_published(bytes)
    } else {
        xml_published(bytes)
    }
}

fn xml_published(bytes: &[u8]) -> Vec<Option<String>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut dates: Vec<Option<String>> = Vec::new();
    let mut in_entry = false;
    let mut capture: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if !in_entry && is_one_of(name.as_ref(), &ENTRY_TAGS) {
                    in_entry = true;
                    dates.push(None);
                } else if in_entry
                    && is_one_of(name.as_ref(), &DATE_TAGS)
                    && matches!(dates.last(), Some(None))
                {
                    capture = Some(String::new());
                }
            }
            Ok(Event::Empty(e)) => {
                if !in_entry && is_one_of(e.local_name().as_ref(), &ENTRY_TAGS) {
                    dates.push(None);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(text) = capture.as_mut() {
                    text.push_str(t.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(text) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if capture.is_some() && is_one_of(name.as_ref(), &DATE_TAGS) {
                    let text = capture.take().unwrap_or_default();
                    let text = text.trim();
                    if !text.is_empty() {
                        if let Some(slot) = dates.last_mut() {
                            *slot = Some(text.to_string());
                        }
                    }
                } else if in_entry && is_one_of(name.as_ref(), &ENTRY_TAGS) {
                    in_entry = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Could not scan feed for publication dates: {}", e);
                return Vec::new();
            }
            _ => {}
        }
        buf.clear();
    }

    dates
}

fn is_one_of(name: &[u8], tags: &[&[u8]]) -> bool {
    tags.iter().any(|tag| *tag == name)
}

fn json_published(bytes: &[u8]) -> Vec<Option<String>> {
    let Ok(document) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return Vec::new();
    };

    document
        .get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("date_published")
                        .and_then(|d| d.as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_dates_are_kept_verbatim() {
        let xml = r#"<rss version="2.0"><channel><title>t</title>
            <item><title>a</title><pubDate>Tuesday, October 19th 2004</pubDate></item>
            <item><title>b</title></item>
            <item><title>c</title><pubDate><![CDATA[ Tue, 19 Oct 2004 15:09:11 GMT ]]></pubDate></item>
        </channel></rss>"#;

        assert_eq!(
            raw_published(xml.as_bytes()),
            vec![
                Some("Tuesday, October 19th 2004".to_string()),
                None,
                Some("Tue, 19 Oct 2004 15:09:11 GMT".to_string()),
            ]
        );
    }

    #[test]
    fn atom_published_wins_over_updated() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>t</title>
            <entry><id>1</id><updated>2004-01-01T00:00:00Z</updated><published>2003-12-13T18:30:02Z</published></entry>
            <entry><id>2</id><updated>2004-01-01T00:00:00Z</updated></entry>
        </feed>"#;

        assert_eq!(
            raw_published(xml.as_bytes()),
            vec![Some("2003-12-13T18:30:02Z".to_string()), None]
        );
    }

    #[test]
    fn json_feed_dates_are_read() {
        let json = r#"{"version":"https://jsonfeed.org/version/1.1","items":[
            {"id":"1","date_published":"2024-05-01T10:00:00-04:00"},{"id":"2"}]}"#;

        assert_eq!(
            raw_published(json.as_bytes()),
            vec![Some("2024-05-01T10:00:00-04:00".to_string()), None]
        );
    }
}
