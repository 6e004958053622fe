//! Source records read from the primary store.
//!
//! [`SourceRecord`] is the typed view the indexing pipeline has of a status,
//! independent of the store technology. [`Status`] is the in-crate concrete
//! record used by [`MemoryStore`](crate::store::MemoryStore) and tests.
//!
//! Association accessors return [`Result`] so that a record whose
//! association was not eager-loaded fails extraction instead of silently
//! producing an empty field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

/// Eagerly loadable associations of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    MediaAttachments,
    LocalMentioned,
    LocalFavourited,
    LocalReblogged,
    LocalBookmarked,
    Tags,
    PreviewCard,
    PollLocalVoters,
}

impl Association {
    pub fn as_str(&self) -> &'static str {
        match self {
            Association::MediaAttachments => "media_attachments",
            Association::LocalMentioned => "local_mentioned",
            Association::LocalFavourited => "local_favourited",
            Association::LocalReblogged => "local_reblogged",
            Association::LocalBookmarked => "local_bookmarked",
            Association::Tags => "tags",
            Association::PreviewCard => "preview_card",
            Association::PollLocalVoters => "poll_local_voters",
        }
    }
}

/// An account taking part in a status (mentioned, favouriting, voting...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub account_id: i64,
    /// Whether the account lives on this server.
    pub local: bool,
}

impl Participant {
    pub fn local(account_id: i64) -> Self {
        Participant {
            account_id,
            local: true,
        }
    }

    pub fn remote(account_id: i64) -> Self {
        Participant {
            account_id,
            local: false,
        }
    }
}

/// A mention of an account in a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub account: Participant,
    /// Silent mentions do not notify and do not grant search access.
    #[serde(default)]
    pub silent: bool,
}

impl Mention {
    pub fn new(account: Participant) -> Self {
        Mention {
            account,
            silent: false,
        }
    }

    pub fn silent(account: Participant) -> Self {
        Mention {
            account,
            silent: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Gifv,
    Video,
    Audio,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    /// Alt text.
    #[serde(default)]
    pub description: Option<String>,
}

impl MediaAttachment {
    pub fn new(kind: MediaKind) -> Self {
        MediaAttachment {
            kind,
            description: None,
        }
    }

    /// Images and animated GIFs both count as images.
    pub fn is_image(&self) -> bool {
        matches!(self.kind, MediaKind::Image | MediaKind::Gifv)
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewCardKind {
    Link,
    Photo,
    Video,
    Rich,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewCard {
    pub kind: PreviewCardKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Display name, as typed by its first user (`ChewySearch`).
    pub display_name: String,
}

impl Tag {
    pub fn new(display_name: impl Into<String>) -> Self {
        Tag {
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Poll {
    pub options: Vec<String>,
    pub voters: Vec<Participant>,
}

/// Typed read-only view of a status record.
pub trait SourceRecord: Send + Sync {
    fn id(&self) -> i64;

    /// Author account id.
    fn account_id(&self) -> i64;

    /// Whether the author is a local account.
    fn is_local(&self) -> bool;

    /// False once the record is soft-deleted.
    fn is_kept(&self) -> bool;

    /// The reshared record, if this record is a reshare.
    fn reblog_of_id(&self) -> Option<i64>;

    fn is_reblog(&self) -> bool {
        self.reblog_of_id().is_some()
    }

    fn in_reply_to_id(&self) -> Option<i64>;

    fn is_reply(&self) -> bool {
        self.in_reply_to_id().is_some()
    }

    /// Precomputed searchable text (body plus whatever the provider merges in).
    fn searchable_text(&self) -> &str;

    fn language(&self) -> Option<&str>;

    fn created_at(&self) -> DateTime<Utc>;

    fn sensitive(&self) -> bool;

    fn tags(&self) -> Result<&[Tag]>;

    fn mentions(&self) -> Result<&[Mention]>;

    fn favourited_by(&self) -> Result<&[Participant]>;

    fn reblogged_by(&self) -> Result<&[Participant]>;

    fn bookmarked_by(&self) -> Result<&[Participant]>;

    fn poll(&self) -> Result<Option<&Poll>>;

    fn media_attachments(&self) -> Result<&[MediaAttachment]>;

    fn preview_card(&self) -> Result<Option<&PreviewCard>>;
}

/// An association slot that may not have been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Loaded<T> {
    Loaded(T),
    NotLoaded,
}

impl<T> Loaded<T> {
    fn get(&self, id: i64, association: Association) -> Result<&T> {
        match self {
            Loaded::Loaded(value) => Ok(value),
            Loaded::NotLoaded => Err(IndexerError::extraction(
                id,
                format!("association `{}` not loaded", association.as_str()),
            )),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Loaded::Loaded(_))
    }
}

impl<T: Default> Default for Loaded<T> {
    fn default() -> Self {
        Loaded::Loaded(T::default())
    }
}

/// Concrete status record with all associations held in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub account_id: i64,
    pub local: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub reblog_of_id: Option<i64>,
    pub in_reply_to_id: Option<i64>,
    pub searchable_text: String,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sensitive: bool,
    pub tags: Loaded<Vec<Tag>>,
    pub mentions: Loaded<Vec<Mention>>,
    pub favourites: Loaded<Vec<Participant>>,
    pub reblogs: Loaded<Vec<Participant>>,
    pub bookmarks: Loaded<Vec<Participant>>,
    pub poll: Loaded<Option<Poll>>,
    pub media_attachments: Loaded<Vec<MediaAttachment>>,
    pub preview_card: Loaded<Option<PreviewCard>>,
}

impl Status {
    /// A kept, local, original status with no associations.
    pub fn new(id: i64, account_id: i64, created_at: DateTime<Utc>) -> Self {
        Status {
            id,
            account_id,
            local: true,
            deleted_at: None,
            reblog_of_id: None,
            in_reply_to_id: None,
            searchable_text: String::new(),
            language: None,
            created_at,
            sensitive: false,
            tags: Loaded::default(),
            mentions: Loaded::default(),
            favourites: Loaded::default(),
            reblogs: Loaded::default(),
            bookmarks: Loaded::default(),
            poll: Loaded::default(),
            media_attachments: Loaded::default(),
            preview_card: Loaded::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.searchable_text = text.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn remote(mut self) -> Self {
        self.local = false;
        self
    }

    pub fn reblog_of(mut self, id: i64) -> Self {
        self.reblog_of_id = Some(id);
        self
    }

    pub fn reply_to(mut self, id: i64) -> Self {
        self.in_reply_to_id = Some(id);
        self
    }

    pub fn mark_sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Loaded::Loaded(names.into_iter().map(Tag::new).collect());
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = Loaded::Loaded(mentions);
        self
    }

    pub fn with_favourites(mut self, accounts: Vec<Participant>) -> Self {
        self.favourites = Loaded::Loaded(accounts);
        self
    }

    pub fn with_reblogs(mut self, accounts: Vec<Participant>) -> Self {
        self.reblogs = Loaded::Loaded(accounts);
        self
    }

    pub fn with_bookmarks(mut self, accounts: Vec<Participant>) -> Self {
        self.bookmarks = Loaded::Loaded(accounts);
        self
    }

    pub fn with_poll(mut self, poll: Poll) -> Self {
        self.poll = Loaded::Loaded(Some(poll));
        self
    }

    pub fn with_media(mut self, media: Vec<MediaAttachment>) -> Self {
        self.media_attachments = Loaded::Loaded(media);
        self
    }

    pub fn with_preview_card(mut self, card: PreviewCard) -> Self {
        self.preview_card = Loaded::Loaded(Some(card));
        self
    }

    /// Mark the record as soft-deleted.
    pub fn discard(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }

    /// Copy of the record keeping only the requested associations loaded.
    pub fn with_only(&self, associations: &[Association]) -> Status {
        let mut status = self.clone();
        let keep = |a: Association| associations.contains(&a);
        if !keep(Association::Tags) {
            status.tags = Loaded::NotLoaded;
        }
        if !keep(Association::LocalMentioned) {
            status.mentions = Loaded::NotLoaded;
        }
        if !keep(Association::LocalFavourited) {
            status.favourites = Loaded::NotLoaded;
        }
        if !keep(Association::LocalReblogged) {
            status.reblogs = Loaded::NotLoaded;
        }
        if !keep(Association::LocalBookmarked) {
            status.bookmarks = Loaded::NotLoaded;
        }
        if !keep(Association::PollLocalVoters) {
            status.poll = Loaded::NotLoaded;
        }
        if !keep(Association::MediaAttachments) {
            status.media_attachments = Loaded::NotLoaded;
        }
        if !keep(Association::PreviewCard) {
            status.preview_card = Loaded::NotLoaded;
        }
        status
    }
}

impl SourceRecord for Status {
    fn id(&self) -> i64 {
        self.id
    }

    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn is_kept(&self) -> bool {
        self.deleted_at.is_none()
    }

    fn reblog_of_id(&self) -> Option<i64> {
        self.reblog_of_id
    }

    fn in_reply_to_id(&self) -> Option<i64> {
        self.in_reply_to_id
    }

    fn searchable_text(&self) -> &str {
        &self.searchable_text
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sensitive(&self) -> bool {
        self.sensitive
    }

    fn tags(&self) -> Result<&[Tag]> {
        self.tags.get(self.id, Association::Tags).map(|v| v.as_slice())
    }

    fn mentions(&self) -> Result<&[Mention]> {
        self.mentions.get(self.id, Association::LocalMentioned).map(|v| v.as_slice())
    }

    fn favourited_by(&self) -> Result<&[Participant]> {
        self.favourites.get(self.id, Association::LocalFavourited).map(|v| v.as_slice())
    }

    fn reblogged_by(&self) -> Result<&[Participant]> {
        self.reblogs.get(self.id, Association::LocalReblogged).map(|v| v.as_slice())
    }

    fn bookmarked_by(&self) -> Result<&[Participant]> {
        self.bookmarks.get(self.id, Association::LocalBookmarked).map(|v| v.as_slice())
    }

    fn poll(&self) -> Result<Option<&Poll>> {
        Ok(self
            .poll
            .get(self.id, Association::PollLocalVoters)?
            .as_ref())
    }

    fn media_attachments(&self) -> Result<&[MediaAttachment]> {
        self.media_attachments.get(self.id, Association::MediaAttachments).map(|v| v.as_slice())
    }

    fn preview_card(&self) -> Result<Option<&PreviewCard>> {
        Ok(self
            .preview_card
            .get(self.id, Association::PreviewCard)?
            .as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_association_is_an_extraction_error() {
        let status = Status::new(7, 1, Utc::now()).with_only(&[Association::Tags]);
        assert!(status.tags().is_ok());
        let err = status.favourited_by().unwrap_err();
        match err {
            IndexerError::Extraction { id, reason } => {
                assert_eq!(id, 7);
                assert!(reason.contains("local_favourited"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discard_and_reblog_flags() {
        let mut status = Status::new(1, 1, Utc::now()).reblog_of(99);
        assert!(status.is_reblog());
        assert!(status.is_kept());
        status.discard(Utc::now());
        assert!(!status.is_kept());
    }

    #[test]
    fn test_gifv_counts_as_image() {
        assert!(MediaAttachment::new(MediaKind::Gifv).is_image());
        assert!(!MediaAttachment::new(MediaKind::Audio).is_image());
    }
}
