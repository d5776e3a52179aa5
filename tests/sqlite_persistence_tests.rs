use std::sync::Arc;

use tempfile::TempDir;

use tutor_state::persistence::{PersistencePort, SqlitePersistence};
use tutor_state::types::{InteractionEntry, LearnerRecord, TopicScore};
use tutor_state::{TutorConfig, TutorEngine};

fn sample_record() -> LearnerRecord {
    let mut record = LearnerRecord::new("s1");
    record.topics.insert(
        "ec2".to_string(),
        TopicScore {
            value: 0.42,
            last_updated: 1_700_000_000_000,
            visits: 3,
        },
    );
    record.labs_completed.insert("lab-ec2-01".to_string());
    record.push_interaction(
        InteractionEntry {
            timestamp: 1_700_000_000_000,
            topic_id: "ec2".to_string(),
            question_text: "how do security groups work?".to_string(),
        },
        10,
    );
    record.time_spent_secs = 300;
    record.last_active = 1_700_000_000_000;
    record
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePersistence::connect(&dir.path().join("learners.db"))
        .await
        .unwrap();

    let record = sample_record();
    store.save("s1", &record).await.unwrap();

    let loaded = store.load("s1").await.unwrap().unwrap();
    assert_eq!(loaded.learner_id, "s1");
    assert_eq!(loaded.questions_asked, record.questions_asked);
    assert_eq!(loaded.labs_completed, record.labs_completed);
    assert_eq!(loaded.interaction_log, record.interaction_log);
    assert_eq!(loaded.time_spent_secs, 300);
    let score = loaded.topics.get("ec2").unwrap();
    assert!((score.value - 0.42).abs() < 1e-12);
    assert_eq!(score.visits, 3);
}

#[tokio::test]
async fn missing_learner_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePersistence::connect(&dir.path().join("learners.db"))
        .await
        .unwrap();
    assert!(store.load("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn save_upserts_latest_record() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePersistence::connect(&dir.path().join("learners.db"))
        .await
        .unwrap();

    let mut record = sample_record();
    store.save("s1", &record).await.unwrap();
    record.questions_asked = 9;
    store.save("s1", &record).await.unwrap();

    let loaded = store.load("s1").await.unwrap().unwrap();
    assert_eq!(loaded.questions_asked, 9);
}

#[tokio::test]
async fn corrupt_row_loads_as_absent() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePersistence::connect(&dir.path().join("learners.db"))
        .await
        .unwrap();

    sqlx::query("INSERT INTO learner_records (learner_id, record, updated_at) VALUES (?, ?, ?)")
        .bind("s1")
        .bind("{ definitely not a record")
        .bind("2026-01-01T00:00:00Z")
        .execute(store.pool())
        .await
        .unwrap();

    assert!(store.load("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn engine_state_survives_restart_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("learners.db");

    {
        let persistence = Arc::new(SqlitePersistence::connect(&db_path).await.unwrap());
        let engine = TutorEngine::new(TutorConfig::default(), persistence);
        engine
            .progress()
            .record_interaction("s1", "ec2", "what is an AMI?")
            .await
            .unwrap();
        engine
            .progress()
            .mark_lab_complete("s1", "lab-ec2-01")
            .await
            .unwrap();
    }

    let persistence = Arc::new(SqlitePersistence::connect(&db_path).await.unwrap());
    let engine = TutorEngine::new(TutorConfig::default(), persistence);
    let report = engine.query().progress_report("s1").await;
    assert_eq!(report.questions_asked, 1);
    assert!(report.labs_completed.contains("lab-ec2-01"));
    assert_eq!(report.interaction_log.len(), 1);
}
