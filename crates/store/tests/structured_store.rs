use gaitstore_config::ConfigBuilder;
use gaitstore_store::{
    AnalysisFilter, AnalysisStatus, NewTrainingSample, StructuredStore,
};
use serde_json::{json, Map};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_list_completed_returns_only_completed_newest_first() {
    let store = StructuredStore::open_in_memory().unwrap();
    let mut ids = Vec::new();
    for i in 0..5 {
        let record = store
            .create_analysis(&format!("videos/walk_{i}.mp4"), Map::new())
            .unwrap();
        ids.push(record.id);
    }
    for id in &ids[..3] {
        store
            .update_analysis_status(id, AnalysisStatus::Completed, None)
            .unwrap();
    }

    let completed = store
        .list_analyses(&AnalysisFilter::with_status(AnalysisStatus::Completed))
        .unwrap();
    assert_eq!(completed.len(), 3);
    assert!(completed
        .iter()
        .all(|r| r.status == AnalysisStatus::Completed));
    let listed: Vec<_> = completed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(listed, [&ids[2], &ids[1], &ids[0]].map(String::as_str));

    assert_eq!(
        store.count_analyses(Some(AnalysisStatus::Completed)).unwrap(),
        3
    );
    assert_eq!(store.count_analyses(Some(AnalysisStatus::Pending)).unwrap(), 2);
    assert_eq!(store.count_analyses(None).unwrap(), 5);
}

#[test]
fn test_list_respects_limit_and_offset() {
    let store = StructuredStore::open_in_memory().unwrap();
    for i in 0..5 {
        store
            .create_analysis(&format!("v{i}.mp4"), Map::new())
            .unwrap();
    }

    let page = store
        .list_analyses(&AnalysisFilter::default().limit(2).offset(2))
        .unwrap();
    let paths: Vec<_> = page.iter().map(|r| r.video_path.as_str()).collect();
    assert_eq!(paths, ["v2.mp4", "v1.mp4"]);
}

#[test]
fn test_samples_by_condition_match_label() {
    let store = StructuredStore::open_in_memory().unwrap();
    let dataset = store
        .create_training_dataset("gavd", Some("public gait videos"), Map::new())
        .unwrap();

    let samples = vec![
        NewTrainingSample::new(vec![1.0, 0.5], "normal"),
        NewTrainingSample::new(vec![0.2, 0.9], "parkinsonian"),
        NewTrainingSample::new(vec![0.3, 0.8], "parkinsonian"),
    ];
    store.add_training_samples(&dataset.id, &samples).unwrap();

    let parkinsonian = store
        .get_training_samples_by_condition("parkinsonian")
        .unwrap();
    assert_eq!(parkinsonian.len(), 2);
    assert!(parkinsonian.iter().all(|s| s.label == "parkinsonian"));
    assert_eq!(parkinsonian[0].features, vec![0.2, 0.9]);

    assert_eq!(store.get_training_samples(&dataset.id).unwrap().len(), 3);
    assert!(store
        .get_training_samples_by_condition("ataxic")
        .unwrap()
        .is_empty());

    let loaded = store.get_training_dataset(&dataset.id).unwrap().unwrap();
    assert_eq!(loaded.description.as_deref(), Some("public gait videos"));
}

#[test]
fn test_saving_same_sequence_twice_keeps_one_row() {
    let store = StructuredStore::open_in_memory().unwrap();
    let first = store
        .save_pose_result("gavd", "seq_1", &json!({"cadence": 100.0}), "hash-1")
        .unwrap();
    let second = store
        .save_pose_result("gavd", "seq_1", &json!({"cadence": 104.5}), "hash-2")
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.version, 2);

    let rows = store
        .list_pose_results(&gaitstore_store::PoseResultFilter::for_dataset("gavd"))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].analysis, json!({"cadence": 104.5}));
    assert_eq!(rows[0].content_hash, "hash-2");
}

#[test]
fn test_data_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let config = ConfigBuilder::new().data_dir(temp.path()).build().unwrap();

    let id = {
        let store = StructuredStore::from_config(&config).unwrap();
        store.create_analysis("walk.mp4", Map::new()).unwrap().id
    };

    let store = StructuredStore::from_config(&config).unwrap();
    assert!(store.get_analysis(&id).unwrap().is_some());
    assert_eq!(store.path(), Some(config.database_path().as_path()));
}

#[test]
fn test_concurrent_upserts_leave_single_row() {
    let store = Arc::new(StructuredStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .save_pose_result("gavd", "seq_1", &json!({"writer": i}), "h")
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let row = store.get_pose_result("gavd", "seq_1").unwrap().unwrap();
    assert_eq!(row.version, 8);
    assert_eq!(store.statistics().unwrap().pose_results, 1);
}
