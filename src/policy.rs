//! Eligibility policy: whether a record belongs in the index.
//!
//! The scope filter ("which records are indexed") and the deletion
//! predicate ("when is a document removed") are both answered by
//! [`EligibilityPolicy::decide`], so they cannot diverge.

use serde::{Deserialize, Serialize};

use crate::document::IndexDocument;
use crate::error::Result;
use crate::extract;
use crate::record::SourceRecord;

/// Why a record is absent from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The record no longer exists in the store.
    Missing,
    /// The record is soft-deleted.
    NotKept,
    /// The record is a reshare of another record.
    Reshare,
    /// Nobody is allowed to find the record.
    NoViewers,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Missing => "missing",
            RemovalReason::NotKept => "not_kept",
            RemovalReason::Reshare => "reshare",
            RemovalReason::NoViewers => "no_viewers",
        }
    }
}

/// Outcome of evaluating a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The record is eligible; this is its document.
    Index(IndexDocument),
    /// The record must not be in the index.
    Remove { id: i64, reason: RemovalReason },
}

impl Decision {
    pub fn id(&self) -> i64 {
        match self {
            Decision::Index(doc) => doc.id,
            Decision::Remove { id, .. } => *id,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Decision::Index(_))
    }
}

/// The eligibility policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityPolicy;

impl EligibilityPolicy {
    pub fn new() -> Self {
        EligibilityPolicy
    }

    /// Evaluate a record.
    ///
    /// Cheap checks run first, and `searchable_by` is computed before the
    /// rest of the document so that records without viewers are never
    /// fully extracted.
    pub fn decide(&self, record: &dyn SourceRecord) -> Result<Decision> {
        let id = record.id();

        if !record.is_kept() {
            return Ok(Decision::Remove {
                id,
                reason: RemovalReason::NotKept,
            });
        }
        if record.is_reblog() {
            return Ok(Decision::Remove {
                id,
                reason: RemovalReason::Reshare,
            });
        }

        let viewers = extract::searchable_by(record)?;
        if viewers.is_empty() {
            return Ok(Decision::Remove {
                id,
                reason: RemovalReason::NoViewers,
            });
        }

        Ok(Decision::Index(extract::extract_with_viewers(record, viewers)?))
    }

    /// Evaluate a record that may have disappeared from the store.
    pub fn decide_optional(&self, id: i64, record: Option<&dyn SourceRecord>) -> Result<Decision> {
        match record {
            Some(record) => self.decide(record),
            None => Ok(Decision::Remove {
                id,
                reason: RemovalReason::Missing,
            }),
        }
    }

    /// Scope filter view: kept, not a reshare.
    pub fn in_scope(&self, record: &dyn SourceRecord) -> bool {
        record.is_kept() && !record.is_reblog()
    }

    /// Deletion predicate view: true when an in-scope record must still be removed.
    pub fn should_delete(&self, record: &dyn SourceRecord) -> Result<bool> {
        Ok(!self.decide(record)?.is_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Participant, Status};
    use chrono::Utc;

    #[test]
    fn test_eligible_record_is_indexed() {
        let policy = EligibilityPolicy::new();
        let decision = policy.decide(&Status::new(1, 5, Utc::now())).unwrap();
        match decision {
            Decision::Index(doc) => assert_eq!(doc.searchable_by, vec![5]),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn test_reasons() {
        let policy = EligibilityPolicy::new();

        let mut deleted = Status::new(1, 5, Utc::now());
        deleted.discard(Utc::now());
        assert_eq!(
            policy.decide(&deleted).unwrap(),
            Decision::Remove {
                id: 1,
                reason: RemovalReason::NotKept
            }
        );

        let reshare = Status::new(2, 5, Utc::now()).reblog_of(1);
        assert_eq!(
            policy.decide(&reshare).unwrap(),
            Decision::Remove {
                id: 2,
                reason: RemovalReason::Reshare
            }
        );

        let unseen = Status::new(3, 5, Utc::now()).remote();
        assert_eq!(
            policy.decide(&unseen).unwrap(),
            Decision::Remove {
                id: 3,
                reason: RemovalReason::NoViewers
            }
        );

        assert_eq!(
            policy.decide_optional(4, None).unwrap(),
            Decision::Remove {
                id: 4,
                reason: RemovalReason::Missing
            }
        );
    }

    #[test]
    fn test_views_agree() {
        let policy = EligibilityPolicy::new();
        let remote_with_fav = Status::new(1, 5, Utc::now())
            .remote()
            .with_favourites(vec![Participant::local(9)]);
        assert!(policy.in_scope(&remote_with_fav));
        assert!(!policy.should_delete(&remote_with_fav).unwrap());

        let remote_alone = Status::new(2, 5, Utc::now()).remote();
        assert!(policy.in_scope(&remote_alone));
        assert!(policy.should_delete(&remote_alone).unwrap());
    }
}
