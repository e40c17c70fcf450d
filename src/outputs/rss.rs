//! RSS 2.0 serialization of feed entries.
//!
//! # Output Structure
//!
//! ```text
//! <rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
//!   <channel>
//!     <title/> <link/> <description/> <lastBuildDate/>
//!     <item>
//!       <title/> <link/> <description/> <guid isPermaLink="false"/>
//!       <content:encoded/>
//!     </item>
//!   </channel>
//! </rss>
//! ```
//!
//! The whole document is rendered in memory and written in one go, so a
//! failed run never leaves a half-written feed behind.

use crate::models::FeedEntry;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Cursor;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

/// Channel-level metadata.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub last_build: DateTime<Utc>,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_item(writer: &mut XmlWriter, entry: &FeedEntry) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    text_element(writer, "title", &entry.title)?;
    text_element(writer, "link", &entry.link)?;
    text_element(writer, "description", &entry.description)?;

    let guid = BytesStart::new("guid").with_attributes([("isPermaLink", "false")]);
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&entry.id)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    writer.write_event(Event::Start(BytesStart::new("content:encoded")))?;
    writer.write_event(Event::CData(BytesCData::new(entry.content.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new("content:encoded")))?;

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

/// Render a complete RSS document.
pub fn render(channel: &Channel, entries: &[FeedEntry]) -> Result<String, Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let rss = BytesStart::new("rss")
        .with_attributes([("version", "2.0"), ("xmlns:content", CONTENT_NS)]);
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &channel.title)?;
    text_element(&mut writer, "link", &channel.link)?;
    text_element(&mut writer, "description", &channel.description)?;
    text_element(&mut writer, "lastBuildDate", &channel.last_build.to_rfc2822())?;

    for entry in entries {
        write_item(&mut writer, entry)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Render and write the feed to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), entries = entries.len()))]
pub async fn write_feed(
    path: impl AsRef<Path>,
    channel: &Channel,
    entries: &[FeedEntry],
) -> Result<(), Box<dyn Error>> {
    let xml = render(channel, entries)?;
    fs::write(path.as_ref(), xml).await?;
    info!("Wrote RSS feed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel() -> Channel {
        Channel {
            title: "Event Feed".to_string(),
            link: "https://locator.wizards.com/store/14936".to_string(),
            description: "Feed of events".to_string(),
            last_build: Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
        }
    }

    fn entry(id: &str) -> FeedEntry {
        FeedEntry {
            title: "Friday Night Magic".to_string(),
            link: "https://locator.wizards.com/store/14936".to_string(),
            description: "<p><h2>Friday Night Magic</h2></p>".to_string(),
            content: r#"{"Event Cost":"$5"}"#.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn test_render_channel_and_items() {
        let xml = render(&channel(), &[entry("one"), entry("two")]).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains(r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">"#));
        assert!(xml.contains("<title>Event Feed</title>"));
        assert!(xml.contains("<lastBuildDate>Sun, 15 Jun 2025 12:00:00 +0000</lastBuildDate>"));
        assert_eq!(xml.matches("<item>").count(), 2);
        assert!(xml.contains(r#"<guid isPermaLink="false">one</guid>"#));
        assert!(xml.contains(r#"<content:encoded><![CDATA[{"Event Cost":"$5"}]]></content:encoded>"#));
    }

    #[test]
    fn test_description_html_is_escaped_text() {
        let xml = render(&channel(), &[entry("one")]).unwrap();
        assert!(xml.contains("<description>&lt;p&gt;&lt;h2&gt;Friday Night Magic"));
    }

    #[test]
    fn test_empty_feed_is_valid_channel() {
        let xml = render(&channel(), &[]).unwrap();
        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
    }

    #[tokio::test]
    async fn test_write_feed_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.rss");

        write_feed(&path, &channel(), &[entry("one")]).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#"<guid isPermaLink="false">one</guid>"#));
    }
}
