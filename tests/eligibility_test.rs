use chrono::{TimeZone, Utc};

use status_index::record::{Mention, Participant, Poll};
use status_index::{Decision, EligibilityPolicy, RemovalReason, Status, extract};

fn status(id: i64) -> Status {
    Status::new(id, 100, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

#[test]
fn test_reshare_is_absent_even_with_viewers() -> status_index::Result<()> {
    let reshare = status(2)
        .reblog_of(1)
        .with_favourites(vec![Participant::local(7)]);
    let decision = EligibilityPolicy::new().decide(&reshare)?;
    assert_eq!(
        decision,
        Decision::Remove {
            id: 2,
            reason: RemovalReason::Reshare
        }
    );
    Ok(())
}

#[test]
fn test_empty_searchable_by_is_absent() -> status_index::Result<()> {
    let remote = status(3)
        .remote()
        .with_mentions(vec![
            Mention::new(Participant::remote(4)),
            Mention::silent(Participant::local(5)),
        ])
        .with_text("nobody here can see this");
    let decision = EligibilityPolicy::new().decide(&remote)?;
    assert_eq!(
        decision,
        Decision::Remove {
            id: 3,
            reason: RemovalReason::NoViewers
        }
    );
    Ok(())
}

#[test]
fn test_remote_status_becomes_eligible_through_interaction() -> status_index::Result<()> {
    let policy = EligibilityPolicy::new();
    let base = status(4).remote();
    assert!(!policy.decide(&base)?.is_index());

    let voted = base.clone().with_poll(Poll {
        options: vec!["yes".into(), "no".into()],
        voters: vec![Participant::local(11)],
    });
    match policy.decide(&voted)? {
        Decision::Index(doc) => assert_eq!(doc.searchable_by, vec![11]),
        other => panic!("unexpected decision: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_decision_document_matches_extractor() -> status_index::Result<()> {
    let record = status(5)
        .with_text("猫が好きです")
        .with_tags(["Cats"])
        .with_bookmarks(vec![Participant::local(8)]);
    match EligibilityPolicy::new().decide(&record)? {
        Decision::Index(doc) => assert_eq!(doc, extract::extract(&record)?),
        other => panic!("unexpected decision: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_deleted_record_is_absent() -> status_index::Result<()> {
    let policy = EligibilityPolicy::new();
    let decision = policy.decide_optional(6, None)?;
    assert_eq!(decision.id(), 6);
    assert!(!decision.is_index());

    let mut discarded = status(6);
    discarded.discard(Utc::now());
    assert!(!policy.in_scope(&discarded));
    assert!(policy.should_delete(&discarded)?);
    Ok(())
}
