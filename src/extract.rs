//! Field extraction: pure functions from a [`SourceRecord`] to index fields.

use crate::document::{IndexDocument, SearchableProperty, clamp_date};
use crate::error::Result;
use crate::record::{Association, Participant, PreviewCardKind, SourceRecord};

/// Associations the extractor reads. Stores should eager-load exactly these.
pub const REQUIRED_ASSOCIATIONS: &[Association] = &[
    Association::MediaAttachments,
    Association::LocalMentioned,
    Association::LocalFavourited,
    Association::LocalReblogged,
    Association::LocalBookmarked,
    Association::Tags,
    Association::PreviewCard,
    Association::PollLocalVoters,
];

/// The `text` field: the record's precomputed searchable text.
pub fn text(record: &dyn SourceRecord) -> String {
    record.searchable_text().to_string()
}

/// The `tags` field: display names of the associated tags.
pub fn tags(record: &dyn SourceRecord) -> Result<Vec<String>> {
    Ok(record
        .tags()?
        .iter()
        .map(|tag| tag.display_name.clone())
        .collect())
}

/// The `searchable_by` field: accounts allowed to find the record in search.
///
/// The author when local, then local accounts that were mentioned (non
/// silently), favourited, reblogged, bookmarked, or voted in the poll.
/// Duplicates are removed keeping the first occurrence.
pub fn searchable_by(record: &dyn SourceRecord) -> Result<Vec<i64>> {
    let mut ids = Vec::new();

    if record.is_local() {
        ids.push(record.account_id());
    }

    ids.extend(
        record
            .mentions()?
            .iter()
            .filter(|m| !m.silent && m.account.local)
            .map(|m| m.account.account_id),
    );
    ids.extend(local_ids(record.favourited_by()?));
    ids.extend(local_ids(record.reblogged_by()?));
    ids.extend(local_ids(record.bookmarked_by()?));
    if let Some(poll) = record.poll()? {
        ids.extend(local_ids(&poll.voters));
    }

    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(*id));
    Ok(ids)
}

fn local_ids(participants: &[Participant]) -> impl Iterator<Item = i64> + '_ {
    participants
        .iter()
        .filter(|p| p.local)
        .map(|p| p.account_id)
}

/// The `properties` field.
pub fn properties(record: &dyn SourceRecord) -> Result<Vec<SearchableProperty>> {
    let media = record.media_attachments()?;
    let card = record.preview_card()?;
    let mut properties = Vec::new();

    if media.iter().any(|m| m.is_image()) {
        properties.push(SearchableProperty::Image);
    }
    if media.iter().any(|m| m.is_video()) {
        properties.push(SearchableProperty::Video);
    }
    if media.iter().any(|m| m.is_audio()) {
        properties.push(SearchableProperty::Audio);
    }
    if !media.is_empty() {
        properties.push(SearchableProperty::Media);
    }
    if record.poll()?.is_some() {
        properties.push(SearchableProperty::Poll);
    }
    if card.is_some() {
        properties.push(SearchableProperty::Link);
    }
    if card.is_some_and(|c| c.kind == PreviewCardKind::Video) {
        properties.push(SearchableProperty::Embed);
    }
    if record.sensitive() {
        properties.push(SearchableProperty::Sensitive);
    }
    if record.is_reply() {
        properties.push(SearchableProperty::Reply);
    }

    Ok(properties)
}

/// The `language` field; blank codes are treated as unset.
pub fn language(record: &dyn SourceRecord) -> Option<String> {
    record
        .language()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Build the full document.
pub fn extract(record: &dyn SourceRecord) -> Result<IndexDocument> {
    let searchable_by = searchable_by(record)?;
    extract_with_viewers(record, searchable_by)
}

/// Build the document reusing an already computed `searchable_by`.
pub(crate) fn extract_with_viewers(
    record: &dyn SourceRecord,
    searchable_by: Vec<i64>,
) -> Result<IndexDocument> {
    Ok(IndexDocument {
        id: record.id(),
        account_id: record.account_id(),
        text: text(record),
        tags: tags(record)?,
        searchable_by,
        language: language(record),
        properties: properties(record)?,
        created_at: clamp_date(record.created_at()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        MediaAttachment, MediaKind, Mention, Poll, PreviewCard, Status,
    };
    use chrono::{TimeZone, Utc};

    fn status() -> Status {
        Status::new(10, 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_searchable_by_union_is_local_and_unique() {
        let record = status()
            .with_mentions(vec![
                Mention::new(Participant::local(2)),
                Mention::silent(Participant::local(3)),
                Mention::new(Participant::remote(4)),
            ])
            .with_favourites(vec![Participant::local(5), Participant::local(2)])
            .with_reblogs(vec![Participant::remote(6)])
            .with_bookmarks(vec![Participant::local(7)])
            .with_poll(Poll {
                options: vec!["a".into(), "b".into()],
                voters: vec![Participant::local(8), Participant::local(1)],
            });

        assert_eq!(searchable_by(&record).unwrap(), vec![1, 2, 5, 7, 8]);
    }

    #[test]
    fn test_remote_author_is_not_a_viewer() {
        let record = status().remote();
        assert!(searchable_by(&record).unwrap().is_empty());
    }

    #[test]
    fn test_properties() {
        let record = status()
            .with_media(vec![
                MediaAttachment::new(MediaKind::Gifv),
                MediaAttachment::new(MediaKind::Audio),
            ])
            .with_preview_card(PreviewCard {
                kind: PreviewCardKind::Video,
                url: "https://example.com/v".into(),
            })
            .mark_sensitive()
            .reply_to(3);

        assert_eq!(
            properties(&record).unwrap(),
            vec![
                SearchableProperty::Image,
                SearchableProperty::Audio,
                SearchableProperty::Media,
                SearchableProperty::Link,
                SearchableProperty::Embed,
                SearchableProperty::Sensitive,
                SearchableProperty::Reply,
            ]
        );
    }

    #[test]
    fn test_plain_status_has_no_properties() {
        assert!(properties(&status()).unwrap().is_empty());
    }

    #[test]
    fn test_extract() {
        let record = status()
            .with_text("猫が好きです")
            .with_language(" ja ")
            .with_tags(["ChewySearch2024", "猫"]);
        let doc = extract(&record).unwrap();
        assert_eq!(doc.id, 10);
        assert_eq!(doc.account_id, 1);
        assert_eq!(doc.text, "猫が好きです");
        assert_eq!(doc.tags, vec!["ChewySearch2024", "猫"]);
        assert_eq!(doc.searchable_by, vec![1]);
        assert_eq!(doc.language.as_deref(), Some("ja"));
    }

    #[test]
    fn test_extract_clamps_created_at() {
        let mut record = status();
        record.created_at = Utc.with_ymd_and_hms(-20, 1, 1, 0, 0, 0).unwrap();
        let doc = extract(&record).unwrap();
        assert_eq!(doc.created_at, crate::document::min_indexable_date());
    }

    #[test]
    fn test_missing_association_fails() {
        let record = status().with_only(&[Association::Tags]);
        assert!(extract(&record).is_err());
    }

    #[test]
    fn test_extraction_is_pure() {
        let record = status().with_tags(["a"]).with_favourites(vec![Participant::local(9)]);
        assert_eq!(extract(&record).unwrap(), extract(&record).unwrap());
    }
}
