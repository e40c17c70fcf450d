//! Feed assembly: one [`FeedEntry`] per surviving [`EventRecord`].

use crate::models::{EventRecord, FeedEntry};
use quick_xml::escape::escape;

/// Map a record to its feed entry. Pure, no I/O.
///
/// The description is a heading, a date/time line, then a bulleted list of
/// the remaining fields in [`Field`](crate::models::Field) order. The content
/// is a JSON object of every field.
pub fn assemble(record: &EventRecord) -> FeedEntry {
    let details: String = record
        .fields
        .iter()
        .filter(|(field, _)| !field.is_headline())
        .map(|(field, value)| {
            format!(
                "<li><strong>{}</strong>: {}</li>",
                field.label(),
                escape(value.as_str())
            )
        })
        .collect();

    let description = format!(
        "<p></p><p><h2>{}</h2></p><p><strong>Date and Time:</strong> {}</p><p><ul>{}</ul></p>",
        escape(record.name.as_str()),
        escape(record.when_label().as_str()),
        details
    );

    let content = serde_json::to_string(&record.fields).unwrap_or_default();

    FeedEntry {
        title: record.name.clone(),
        link: record.source_url.clone(),
        description,
        content,
        id: record.id.clone(),
    }
}

/// Assemble every record, keeping their order.
pub fn assemble_all(records: &[EventRecord]) -> Vec<FeedEntry> {
    records.iter().map(assemble).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, RawEventFields};
    use chrono::NaiveDate;

    fn sample() -> EventRecord {
        let mut fields = RawEventFields::new();
        fields.insert(Field::StoreName, "Dragon's Lair & Games".to_string());
        fields.insert(Field::EventName, "Friday Night Magic".to_string());
        fields.insert(Field::DayOfWeek, "Friday".to_string());
        fields.insert(Field::Month, "June".to_string());
        fields.insert(Field::Day, "13".to_string());
        fields.insert(Field::EventCost, "$5".to_string());
        fields.insert(Field::EventTime, "7:00 PM".to_string());

        EventRecord {
            id: "f00d".to_string(),
            name: "Friday Night Magic".to_string(),
            when: NaiveDate::from_ymd_opt(2025, 6, 13)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            cost: "$5".to_string(),
            store: Some("Dragon's Lair & Games".to_string()),
            source_url: "https://locator.wizards.com/store/14936".to_string(),
            fields,
        }
    }

    #[test]
    fn test_entry_carries_record_identity() {
        let entry = assemble(&sample());
        assert_eq!(entry.title, "Friday Night Magic");
        assert_eq!(entry.link, "https://locator.wizards.com/store/14936");
        assert_eq!(entry.id, "f00d");
    }

    #[test]
    fn test_description_layout() {
        let entry = assemble(&sample());
        assert_eq!(
            entry.description,
            "<p></p>\
             <p><h2>Friday Night Magic</h2></p>\
             <p><strong>Date and Time:</strong> Friday, June 13, 02:00 PM</p>\
             <p><ul>\
             <li><strong>Store Name</strong>: Dragon&apos;s Lair &amp; Games</li>\
             <li><strong>Event Cost</strong>: $5</li>\
             </ul></p>"
        );
    }

    #[test]
    fn test_description_escapes_markup_in_name() {
        let mut record = sample();
        record.name = "<script>alert(1)</script>".to_string();
        let entry = assemble(&record);
        assert!(entry.description.contains("&lt;script&gt;"));
        assert!(!entry.description.contains("<script>"));
    }

    #[test]
    fn test_content_dumps_all_fields_in_order() {
        let entry = assemble(&sample());
        let value: serde_json::Value = serde_json::from_str(&entry.content).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 7);
        assert_eq!(object["Event Cost"], "$5");
        assert!(entry.content.starts_with(r#"{"Store Name":"#));
    }

    #[test]
    fn test_assemble_all_keeps_order() {
        let mut second = sample();
        second.id = "beef".to_string();
        let entries = assemble_all(&[sample(), second]);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["f00d", "beef"]);
    }
}
