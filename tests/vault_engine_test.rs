//! Integration tests for the sanitize and reconstruct paths

mod common;

use common::{memory_engine, note_ids, FailingWriteStore, NeedleAnalyzer};
use fake::faker::name::en::Name;
use fake::Fake;
use phivault::config::DetectorConfig;
use phivault::domain::{PhiVaultError, ResourceId, StoreError};
use phivault::vault::token::find_tokens;
use phivault::vault::{
    Detector, KnownIdentifiers, PhiFieldSpec, PhiVaultEngine, UnresolvedTokenPolicy, VaultToken,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_basic_note_scenario() {
    let (engine, store) = memory_engine(NeedleAnalyzer::new().with("John Doe", "PERSON", 0.85));
    let (rt, rid, dep) = note_ids("note-1");

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Patient John Doe arrived for checkup."}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap();

    let note = sanitized["note"].as_str().unwrap();
    assert!(note.contains("phi:vault:PERSON:"));
    assert!(!note.contains("John Doe"));
    assert!(note.starts_with("Patient "));
    assert!(note.ends_with(" arrived for checkup."));

    let entries = engine
        .get_unstructured_phi_vault_entries(&[rid.clone()])
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, "John Doe");
    assert_eq!(entries[0].phi_type.as_str(), "PERSON");
    assert_eq!(entries[0].field_path, "note");
    assert_eq!(store.entry_count().await, 1);

    let token = find_tokens(note).next().unwrap().token;
    assert_eq!(token.entry_id, entries[0].id);
}

#[tokio::test]
async fn test_round_trip_with_generated_names() {
    for i in 0..10 {
        let name: String = Name().fake();
        let (engine, _) = memory_engine(NeedleAnalyzer::new().with(&name, "PERSON", 0.9));
        let (rt, rid, dep) = note_ids(&format!("note-{i}"));
        let original = json!({
            "meta": {"author": "clinic", "version": 3},
            "notes": [
                {"text": format!("{name} reported mild pain.")},
                {"text": format!("Follow-up call with {name} scheduled; {name} agreed.")},
            ],
            "flags": [true, null, 1.5],
        });

        let sanitized = engine
            .vault_and_sanitize_fields(
                &rt,
                &rid,
                &dep,
                &original,
                &[PhiFieldSpec::new("notes.text")],
                None,
            )
            .await
            .unwrap();

        let rendered = sanitized.to_string();
        assert!(!rendered.contains(&name), "{name} leaked into {rendered}");
        assert_eq!(sanitized["meta"], original["meta"]);
        assert_eq!(sanitized["flags"], original["flags"]);

        let restored = engine
            .resolve_records(vec![sanitized], &[rid])
            .await
            .unwrap();
        assert_eq!(restored.records[0], original);
    }
}

#[tokio::test]
async fn test_repeated_value_shares_one_entry() {
    let (engine, store) = memory_engine(NeedleAnalyzer::new().with("John Doe", "PERSON", 0.85));
    let (rt, rid, dep) = note_ids("note-1");

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "John Doe called. John Doe left a message."}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap();

    let tokens: Vec<VaultToken> = find_tokens(sanitized["note"].as_str().unwrap())
        .map(|t| t.token)
        .collect();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0], tokens[1]);
    assert_eq!(store.entry_count().await, 1);
}

#[tokio::test]
async fn test_known_identifiers_gate() {
    let (engine, store) = memory_engine(
        NeedleAnalyzer::new()
            .with("Tylenol", "PERSON", 0.6)
            .with("John Doe", "PERSON", 0.85),
    );
    let (rt, rid, dep) = note_ids("note-1");
    let known = KnownIdentifiers::from_json(&json!(["John Doe"])).unwrap();

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Prescribed Tylenol to John Doe."}),
            &[PhiFieldSpec::new("note")],
            Some(&known),
        )
        .await
        .unwrap();

    let note = sanitized["note"].as_str().unwrap();
    assert!(note.contains("Tylenol"));
    assert!(!note.contains("John Doe"));
    assert_eq!(find_tokens(note).count(), 1);
    assert_eq!(store.entry_count().await, 1);
}

#[tokio::test]
async fn test_empty_known_identifiers_do_not_gate() {
    let (engine, _) = memory_engine(NeedleAnalyzer::new().with("Tylenol", "PERSON", 0.6));
    let (rt, rid, dep) = note_ids("note-1");
    let known = KnownIdentifiers::from_json(&json!([])).unwrap();

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Prescribed Tylenol."}),
            &[PhiFieldSpec::new("note")],
            Some(&known),
        )
        .await
        .unwrap();
    assert!(!sanitized["note"].as_str().unwrap().contains("Tylenol"));
}

#[test]
fn test_malformed_known_identifiers_rejected() {
    for bad in [json!("John Doe"), json!(["John Doe", 7]), json!(["  "])] {
        let err = KnownIdentifiers::from_json(&bad).unwrap_err();
        assert!(matches!(err, PhiVaultError::Validation(_)), "{bad}");
    }
}

#[tokio::test]
async fn test_multi_entity_note() {
    let (engine, store) = memory_engine(
        NeedleAnalyzer::new()
            .with("555-123-4567", "PHONE_NUMBER", 0.75)
            .with("123 Main St.", "ADDRESS", 0.7)
            .with("INS-98765", "ID", 0.65),
    );
    let (rt, rid, dep) = note_ids("note-1");
    let original = "Contact: 555-123-4567 at 123 Main St. Insurance: INS-98765.";

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": original}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap();

    let note = sanitized["note"].as_str().unwrap();
    for raw in ["555-123-4567", "123 Main St.", "INS-98765"] {
        assert!(!note.contains(raw));
    }
    let mut types: Vec<String> = find_tokens(note)
        .filter_map(|t| t.token.entity_type.map(|e| e.as_str().to_string()))
        .collect();
    types.sort();
    assert_eq!(types, vec!["ADDRESS", "ID", "PHONE_NUMBER"]);
    assert_eq!(store.entry_count().await, 3);

    let restored = engine.resolve_text(note, &[rid]).await.unwrap();
    assert_eq!(restored.text, original);
    assert_eq!(restored.unresolved, 0);
}

#[tokio::test]
async fn test_legacy_tokens_resolve() {
    let (engine, _) = memory_engine(NeedleAnalyzer::new().with("Jane Roe", "PERSON", 0.9));
    let (rt, rid, dep) = note_ids("note-1");

    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Jane Roe"}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap();
    let token = VaultToken::parse(sanitized["note"].as_str().unwrap()).unwrap();

    let legacy = format!("Seen by phi:vault:{} today", token.entry_id);
    let restored = engine.resolve_text(&legacy, &[rid]).await.unwrap();
    assert_eq!(restored.text, "Seen by Jane Roe today");
}

#[tokio::test]
async fn test_unresolved_tokens_pass_through_or_mask() {
    let dangling = "Seen by phi:vault:PERSON:0123456789abcdef01234567";
    let rid = ResourceId::new("note-9").unwrap();

    let (engine, _) = memory_engine(NeedleAnalyzer::new());
    let passed = engine.resolve_text(dangling, &[rid.clone()]).await.unwrap();
    assert_eq!(passed.text, dangling);
    assert_eq!(passed.unresolved, 1);

    let (engine, _) = memory_engine(NeedleAnalyzer::new());
    let engine = engine.with_unresolved_policy(UnresolvedTokenPolicy::Mask);
    let masked = engine
        .resolve_records(vec![json!({"note": dangling, "n": 1})], &[rid])
        .await
        .unwrap();
    assert_eq!(masked.records[0], json!({"note": "Seen by [REDACTED]", "n": 1}));
    assert_eq!(masked.unresolved, 1);
}

#[tokio::test]
async fn test_tokens_of_other_resources_stay_unresolved() {
    let (engine, _) = memory_engine(NeedleAnalyzer::new().with("Jane Roe", "PERSON", 0.9));
    let (rt, rid, dep) = note_ids("note-1");
    let sanitized = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Jane Roe"}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap();

    let other = ResourceId::new("note-2").unwrap();
    let restored = engine
        .resolve_records(vec![sanitized.clone()], &[other])
        .await
        .unwrap();
    assert_eq!(restored.records[0], sanitized);
    assert_eq!(restored.unresolved, 1);
}

#[tokio::test]
async fn test_store_failure_aborts_sanitization() {
    let store = Arc::new(FailingWriteStore::default());
    let detector = Detector::new(
        Arc::new(NeedleAnalyzer::new().with("John Doe", "PERSON", 0.85)),
        &DetectorConfig::default(),
    );
    let engine = PhiVaultEngine::new(detector, store.clone());
    let (rt, rid, dep) = note_ids("note-1");

    let err = engine
        .vault_and_sanitize_fields(
            &rt,
            &rid,
            &dep,
            &json!({"note": "Patient John Doe arrived."}),
            &[PhiFieldSpec::new("note")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PhiVaultError::Store(StoreError::WriteFailed(_))
    ));
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_detections_skip_store() {
    let store = Arc::new(FailingWriteStore::default());
    let detector = Detector::new(Arc::new(NeedleAnalyzer::new()), &DetectorConfig::default());
    let engine = PhiVaultEngine::new(detector, store.clone());
    let (rt, rid, dep) = note_ids("note-1");
    let payload = json!({"note": "Routine visit, nothing to report."});

    let sanitized = engine
        .vault_and_sanitize_fields(&rt, &rid, &dep, &payload, &[PhiFieldSpec::new("note")], None)
        .await
        .unwrap();
    assert_eq!(sanitized, payload);
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sanitize_shares_one_entry() {
    let (engine, store) = memory_engine(NeedleAnalyzer::new().with("John Doe", "PERSON", 0.85));
    let engine = Arc::new(engine);
    let payload = json!({"note": "Patient John Doe arrived for checkup."});

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let payload = payload.clone();
            tokio::spawn(async move {
                let (rt, rid, dep) = note_ids("note-race");
                engine
                    .vault_and_sanitize_fields(
                        &rt,
                        &rid,
                        &dep,
                        &payload,
                        &[PhiFieldSpec::new("note")],
                        None,
                    )
                    .await
            })
        })
        .collect();

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap());
    }
    outputs.dedup();
    assert_eq!(outputs.len(), 1);
    assert_eq!(store.entry_count().await, 1);

    let note = outputs[0]["note"].as_str().unwrap();
    assert_eq!(find_tokens(note).count(), 1);
}
