use std::sync::Arc;

use chrono::{TimeZone, Utc};

use status_index::record::Participant;
use status_index::schema::{FieldMapping, FieldType, IndexSchema, Mapping};
use status_index::{
    ClusterPreset, Decision, IndexManager, IndexerConfig, IndexerError, MemoryEngine,
    MemoryStore, RemovalReason, SchemaOutcome, SearchEngine, Status, WriteOutcome, extract,
};

fn setup(config: &IndexerConfig) -> status_index::Result<(Arc<MemoryEngine>, IndexManager)> {
    let engine = Arc::new(MemoryEngine::standard()?);
    let manager = IndexManager::new(engine.clone(), config);
    Ok((engine, manager))
}

fn status(id: i64) -> Status {
    Status::new(id, 1, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_schema_creates_then_updates() -> status_index::Result<()> {
    let config = IndexerConfig::builder().prefix("test").build()?;
    let (engine, manager) = setup(&config)?;
    assert_eq!(manager.index_name(), "test_statuses");

    assert_eq!(manager.ensure_schema().await?, SchemaOutcome::Created);
    assert_eq!(manager.ensure_schema().await?, SchemaOutcome::Updated);
    assert_eq!(
        engine.get_mapping("test_statuses").await?,
        Mapping::statuses()
    );
    let settings = engine.settings("test_statuses").unwrap();
    assert_eq!(settings.refresh_interval_secs, 30);
    assert_eq!(settings.number_of_replicas, 0);
    assert_eq!(engine.number_of_shards("test_statuses"), Some(5));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cluster_preset_applies() -> status_index::Result<()> {
    let config = IndexerConfig::builder()
        .preset(ClusterPreset::LargeCluster)
        .build()?;
    let (engine, manager) = setup(&config)?;
    manager.ensure_schema().await?;
    assert_eq!(engine.number_of_shards("statuses"), Some(10));
    assert_eq!(engine.settings("statuses").unwrap().number_of_replicas, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_type_change_is_a_schema_conflict() -> status_index::Result<()> {
    let config = IndexerConfig::default();
    let (engine, manager) = setup(&config)?;

    let mut legacy = IndexSchema::statuses(&config);
    legacy
        .mapping
        .properties
        .insert("created_at".into(), FieldMapping::new(FieldType::Keyword));
    legacy.mapping.properties.remove("language");
    engine.create_index("statuses", &legacy).await?;

    match manager.ensure_schema().await {
        Err(IndexerError::SchemaConflict {
            field,
            existing,
            requested,
        }) => {
            assert_eq!(field, "created_at");
            assert_eq!(existing, "keyword");
            assert_eq!(requested, "date");
        }
        other => panic!("expected a schema conflict, got {other:?}"),
    }
    // Nothing was written: the missing field was not added either.
    assert_eq!(engine.get_mapping("statuses").await?, legacy.mapping);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_compatible_mapping_gains_missing_fields() -> status_index::Result<()> {
    let config = IndexerConfig::default();
    let (engine, manager) = setup(&config)?;

    let mut older = IndexSchema::statuses(&config);
    older.mapping.properties.remove("properties");
    older.mapping.properties.insert(
        "text".into(),
        FieldMapping::text("ja_default_analyzer"),
    );
    engine.create_index("statuses", &older).await?;

    assert_eq!(manager.ensure_schema().await?, SchemaOutcome::Updated);
    let live = engine.get_mapping("statuses").await?;
    assert!(live.contains_all(&Mapping::statuses()));
    assert_eq!(live.field("text.stemmed").unwrap().describe(), "text(content)");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upsert_is_idempotent() -> status_index::Result<()> {
    let (engine, manager) = setup(&IndexerConfig::default())?;
    manager.ensure_schema().await?;

    let doc = extract::extract(&status(1).with_text("猫が好きです"))?;
    let v1 = manager.next_version();
    assert_eq!(manager.upsert(&doc, v1).await?, WriteOutcome::Created);
    let once = engine.get_document("statuses", 1);

    assert_eq!(manager.upsert(&doc, v1).await?, WriteOutcome::Stale);
    assert_eq!(engine.get_document("statuses", 1), once);

    let v2 = manager.next_version();
    assert_eq!(manager.upsert(&doc, v2).await?, WriteOutcome::Updated);
    assert_eq!(engine.get_document("statuses", 1), once);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_order_write_is_discarded() -> status_index::Result<()> {
    let (engine, manager) = setup(&IndexerConfig::default())?;
    manager.ensure_schema().await?;

    let older = extract::extract(&status(1).with_text("first draft"))?;
    let newer = extract::extract(&status(1).with_text("final text"))?;
    let v_old = manager.next_version();
    let v_new = manager.next_version();

    manager.upsert(&newer, v_new).await?;
    assert_eq!(manager.upsert(&older, v_old).await?, WriteOutcome::Stale);
    assert_eq!(engine.get_document("statuses", 1).unwrap().text, "final text");

    // A late delete is stale too.
    assert_eq!(manager.delete(1, v_old).await?, WriteOutcome::Stale);
    assert!(engine.get_document("statuses", 1).is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_double_delete_does_not_error() -> status_index::Result<()> {
    let (engine, manager) = setup(&IndexerConfig::default())?;
    manager.ensure_schema().await?;

    let doc = extract::extract(&status(1))?;
    manager.upsert(&doc, manager.next_version()).await?;
    assert_eq!(manager.delete(1, manager.next_version()).await?, WriteOutcome::Deleted);
    assert_eq!(manager.delete(1, manager.next_version()).await?, WriteOutcome::NotFound);
    assert!(engine.get_document("statuses", 1).is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_analyzers_run_at_index_time() -> status_index::Result<()> {
    let (engine, manager) = setup(&IndexerConfig::default())?;
    manager.ensure_schema().await?;

    let record = status(1)
        .with_text("猫が好きです")
        .with_tags(["ChewySearch2024"]);
    manager
        .upsert(&extract::extract(&record)?, manager.next_version())
        .await?;

    let stemmed = engine.indexed_terms("statuses", 1, "text.stemmed").unwrap();
    assert!(stemmed.contains(&"猫".to_string()));
    assert!(stemmed.contains(&"好き".to_string()));
    assert_eq!(
        engine.indexed_terms("statuses", 1, "tags").unwrap(),
        vec!["chewy", "search", "2024"]
    );

    // Not searchable until refreshed.
    assert!(engine.search("statuses", "text.stemmed", "猫")?.is_empty());
    engine.refresh("statuses").await?;
    assert_eq!(engine.search("statuses", "text.stemmed", "猫")?, vec![1]);
    assert_eq!(engine.search("statuses", "tags", "search")?, vec![1]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reconcile_follows_policy() -> status_index::Result<()> {
    let (engine, manager) = setup(&IndexerConfig::default())?;
    manager.ensure_schema().await?;
    let store = MemoryStore::new();
    store.insert(
        status(1)
            .remote()
            .with_favourites(vec![Participant::local(9)]),
    );

    let outcome = manager.reconcile(&store, 1, manager.next_version()).await?;
    assert_eq!(outcome, WriteOutcome::Created);
    assert_eq!(engine.get_document("statuses", 1).unwrap().searchable_by, vec![9]);

    store.remove(1);
    let outcome = manager.reconcile(&store, 1, manager.next_version()).await?;
    assert_eq!(outcome, WriteOutcome::Deleted);

    let decision = manager.policy().decide_optional(1, None)?;
    assert_eq!(
        decision,
        Decision::Remove {
            id: 1,
            reason: RemovalReason::Missing
        }
    );
    Ok(())
}
