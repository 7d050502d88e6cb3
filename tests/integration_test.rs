//! End-to-end pipeline scenarios against in-memory services

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::harness;
use common::harness_with_embedder;
use common::record;
use common::FixedEmbedder;
use common::ScriptedGenerator;
use common::ScriptedStore;
use tokio_util::sync::CancellationToken;
use vedarag::config::AppConfig;
use vedarag::errors::CandidateFailureReason;
use vedarag::models::AnswerMode;
use vedarag::models::AnswerRequest;
use vedarag::models::ComplexityClass;
use vedarag::models::HardwareProfile;
use vedarag::rag::ComplexityScorer;
use vedarag::rag::PipelineStage;
use vedarag::taxonomy::Category;
use vedarag::vector_store::CandidateRecord;
use vedarag::Result;
use vedarag::VedaRagError;

const COMPARE_QUESTION: &str = "Compare dharma across Puranas and the Bhagavad Gita";

/// Scores equal store relevance, so the floor applies to it directly
fn vector_only_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.retrieval.keyword_weight = 0.0;
    config
}

/// 20 records over four categories, 14 of them above the 0.3 floor
fn dharma_corpus() -> Vec<CandidateRecord> {
    let categories = ["Purana", "Gita", "Mahabharata", "Sastra"];
    let mut records = Vec::new();
    for i in 0..14 {
        let category = categories[i % categories.len()];
        records.push(record(
            &format!("{}_text.pdf", category.to_lowercase()),
            i as i64 + 1,
            category,
            0.9 - i as f32 * 0.02,
            &format!("Passage {i} on dharma in the {category} tradition."),
        ));
    }
    for i in 0..6 {
        records.push(record(
            "unrelated.pdf",
            100 + i,
            "Spiritual",
            0.1,
            "An index page with no bearing on the question.",
        ));
    }
    records
}

#[tokio::test]
async fn test_empty_store_answers_from_general_knowledge() -> Result<()> {
    let h = harness(
        &AppConfig::default(),
        ScriptedStore::default(),
        ScriptedGenerator::default(),
    );

    let answer = h
        .service
        .answer("What is moksha?", HardwareProfile::Cpu, None)
        .await?;

    assert_eq!(answer.mode, AnswerMode::GeneralKnowledge);
    assert!(answer.sources.is_empty());
    assert!(!answer.text.is_empty());
    assert_eq!(answer.complexity_class, ComplexityClass::Simple);
    assert_eq!(answer.model, "gemma3:12b");
    assert!(h.generator.last_prompt().unwrap().contains("general knowledge"));
    Ok(())
}

#[tokio::test]
async fn test_comparative_question_uses_many_sources() -> Result<()> {
    let h = harness(
        &vector_only_config(),
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    let answer = h
        .service
        .answer(COMPARE_QUESTION, HardwareProfile::Gpu, None)
        .await?;

    let expected = ComplexityScorer::new().score(COMPARE_QUESTION).target_k;
    assert_eq!(answer.complexity_class, ComplexityClass::Complex);
    assert_eq!(answer.target_k, expected);
    assert_eq!(answer.sources.len(), expected.min(14));
    assert_eq!(answer.mode, AnswerMode::Grounded);
    assert_eq!(answer.model, "gemma3:27b");

    // below-floor records never reach the answer
    assert!(answer.sources.iter().all(|s| s.source != "unrelated.pdf"));

    let categories: Vec<Category> = answer.sources.iter().map(|s| s.category).collect();
    assert!(categories.contains(&Category::Purana));
    assert!(categories.contains(&Category::Gita));

    let prompt = h.generator.last_prompt().unwrap();
    assert!(prompt.contains("=== PURANA SOURCES ==="));
    assert!(prompt.contains("=== GITA SOURCES ==="));
    assert!(prompt.contains(COMPARE_QUESTION));

    // candidate pool is a multiple of the target
    assert_eq!(*h.store.requested.lock().unwrap(), vec![expected * 3]);
    Ok(())
}

#[tokio::test]
async fn test_override_sets_source_count() -> Result<()> {
    let h = harness(
        &vector_only_config(),
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    let answer = h
        .service
        .answer(COMPARE_QUESTION, HardwareProfile::Cpu, Some(2))
        .await?;

    assert_eq!(answer.target_k, 2);
    assert_eq!(answer.sources.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_same_question_same_sources() -> Result<()> {
    let h = harness(
        &vector_only_config(),
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    let first = h
        .service
        .answer(COMPARE_QUESTION, HardwareProfile::Cpu, None)
        .await?;
    let second = h
        .service
        .answer(COMPARE_QUESTION, HardwareProfile::Cpu, None)
        .await?;

    assert_eq!(first.sources, second.sources);
    assert_ne!(first.query_id, second.query_id);
    Ok(())
}

#[tokio::test]
async fn test_cpu_chain_falls_back_to_tertiary() -> Result<()> {
    let generator = ScriptedGenerator::default()
        .failing(
            "gemma3:12b",
            CandidateFailureReason::Unavailable("model 'gemma3:12b' not found".to_string()),
        )
        .failing(
            "gemma3:4b",
            CandidateFailureReason::Service("500 Internal Server Error".to_string()),
        );
    let h = harness(
        &vector_only_config(),
        ScriptedStore::with_records(dharma_corpus()),
        generator,
    );

    let answer = h
        .service
        .answer("What is dharma?", HardwareProfile::Cpu, None)
        .await?;

    assert_eq!(answer.model, "gemma2:2b");
    assert_eq!(answer.text, "answer from gemma2:2b");
    assert_eq!(h.generator.calls(), vec!["gemma3:12b", "gemma3:4b", "gemma2:2b"]);
    assert_eq!(
        h.service.unavailable_candidates(),
        vec!["gemma3:12b".to_string(), "gemma3:4b".to_string()]
    );

    // failed candidates are skipped for the rest of the session
    let answer = h
        .service
        .answer("What is karma?", HardwareProfile::Cpu, None)
        .await?;
    assert_eq!(answer.model, "gemma2:2b");
    assert_eq!(h.generator.calls().len(), 4);

    // reset gives them another chance
    h.service.reset_unavailable();
    assert!(h.service.unavailable_candidates().is_empty());
    h.service
        .answer("What is karma?", HardwareProfile::Cpu, None)
        .await?;
    assert_eq!(h.generator.calls()[4], "gemma3:12b");
    Ok(())
}

#[tokio::test]
async fn test_all_candidates_failing_is_exhaustion() {
    let generator = ScriptedGenerator::default()
        .failing("gemma3:27b", CandidateFailureReason::Timeout)
        .failing(
            "gemma3:12b",
            CandidateFailureReason::Service("503 Service Unavailable".to_string()),
        )
        .failing(
            "gemma2:2b",
            CandidateFailureReason::MalformedResponse("empty response".to_string()),
        );
    let h = harness(&vector_only_config(), ScriptedStore::default(), generator);

    let err = h
        .service
        .answer("What is moksha?", HardwareProfile::Gpu, None)
        .await
        .unwrap_err();

    match err {
        VedaRagError::GenerationExhausted { attempts } => {
            let models: Vec<&str> = attempts.iter().map(|a| a.model.as_str()).collect();
            assert_eq!(models, vec!["gemma3:27b", "gemma3:12b", "gemma2:2b"]);
            assert_eq!(attempts[0].reason, CandidateFailureReason::Timeout);
            assert!(matches!(
                attempts[2].reason,
                CandidateFailureReason::MalformedResponse(_)
            ));
        }
        other => panic!("expected GenerationExhausted, got {other:?}"),
    }

    // nothing left to try: no further generation calls
    let err = h
        .service
        .answer("What is moksha?", HardwareProfile::Gpu, None)
        .await
        .unwrap_err();
    assert_eq!(h.generator.calls().len(), 3);
    match err {
        VedaRagError::GenerationExhausted { attempts } => assert!(attempts
            .iter()
            .all(|a| a.reason == CandidateFailureReason::PreviouslyUnavailable)),
        other => panic!("expected GenerationExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_candidate_times_out_and_falls_back() -> Result<()> {
    let mut config = vector_only_config();
    config.llm.timeout_secs = 1;
    let generator = ScriptedGenerator::default().delayed("gemma3:12b", Duration::from_secs(5));
    let h = harness(&config, ScriptedStore::default(), generator);

    let answer = h
        .service
        .answer("What is moksha?", HardwareProfile::Cpu, None)
        .await?;

    assert_eq!(answer.model, "gemma3:4b");
    assert_eq!(h.service.unavailable_candidates(), vec!["gemma3:12b".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_is_retrieval_unavailable() {
    let h = harness(
        &AppConfig::default(),
        ScriptedStore::failing(),
        ScriptedGenerator::default(),
    );

    let err = h
        .service
        .answer("What is moksha?", HardwareProfile::Cpu, None)
        .await
        .unwrap_err();

    assert!(matches!(err, VedaRagError::RetrievalUnavailable(_)));
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn test_embedder_failure_is_retrieval_unavailable() {
    let h = harness_with_embedder(
        &AppConfig::default(),
        FixedEmbedder::failing(),
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    let err = h
        .service
        .answer("What is moksha?", HardwareProfile::Cpu, None)
        .await
        .unwrap_err();

    assert!(matches!(err, VedaRagError::RetrievalUnavailable(_)), "{err:?}");
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
    // the store is never queried without an embedding
    assert!(h.store.requested.lock().unwrap().is_empty());
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn test_passages_over_budget_fall_back_to_general_knowledge() -> Result<()> {
    let mut config = vector_only_config();
    config.context.max_chars = 20;
    let h = harness(
        &config,
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    let answer = h
        .service
        .answer("What is dharma?", HardwareProfile::Cpu, None)
        .await?;

    assert_eq!(answer.mode, AnswerMode::GeneralKnowledge);
    assert!(answer.sources.is_empty());
    assert_eq!(h.store.requested.lock().unwrap().len(), 1);
    assert!(h.generator.last_prompt().unwrap().contains("general knowledge"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_make_no_external_calls() {
    let h = harness(
        &AppConfig::default(),
        ScriptedStore::with_records(dharma_corpus()),
        ScriptedGenerator::default(),
    );

    for (question, override_k) in [("What is moksha?", Some(0)), ("What is moksha?", Some(16)), ("  ", None)] {
        let err = h
            .service
            .answer(question, HardwareProfile::Cpu, override_k)
            .await
            .unwrap_err();
        assert!(matches!(err, VedaRagError::InvalidRequest(_)), "{question:?} {override_k:?}");
    }

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.requested.lock().unwrap().is_empty());
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_during_generation() {
    let generator = ScriptedGenerator::default().delayed("gemma3:12b", Duration::from_secs(30));
    let h = harness(&AppConfig::default(), ScriptedStore::default(), generator);
    let cancel = CancellationToken::new();
    let request = AnswerRequest::new("What is moksha?", HardwareProfile::Cpu);

    let (result, ()) = tokio::join!(h.service.answer_with_cancel(&request, &cancel), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    assert!(matches!(
        result,
        Err(VedaRagError::Cancelled {
            stage: PipelineStage::Generating
        })
    ));
    // cancellation is not a candidate failure
    assert!(h.service.unavailable_candidates().is_empty());
}

#[tokio::test]
async fn test_cancel_during_retrieval() {
    let h = harness(
        &AppConfig::default(),
        ScriptedStore::slow(Duration::from_secs(30)),
        ScriptedGenerator::default(),
    );
    let cancel = CancellationToken::new();
    let request = AnswerRequest::new("What is moksha?", HardwareProfile::Cpu);

    let (result, ()) = tokio::join!(h.service.answer_with_cancel(&request, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    assert!(matches!(
        result,
        Err(VedaRagError::Cancelled {
            stage: PipelineStage::Retrieving
        })
    ));
    assert_eq!(h.store.requested.lock().unwrap().len(), 1);
    assert!(h.generator.calls().is_empty());
}

#[tokio::test]
async fn test_category_counts_merge_and_sort() -> Result<()> {
    let store = ScriptedStore {
        counts: vec![
            ("Gita".to_string(), 40),
            ("Purana".to_string(), 25),
            ("shiva_purana".to_string(), 20),
            ("sastra".to_string(), 40),
        ],
        ..ScriptedStore::default()
    };
    let h = harness(&AppConfig::default(), store, ScriptedGenerator::default());

    let report = h.service.category_counts().await?;

    let rows: Vec<(Category, u64)> = report.counts.iter().map(|c| (c.category, c.count)).collect();
    assert_eq!(
        rows,
        vec![
            (Category::Purana, 45),
            (Category::Gita, 40),
            (Category::Sastra, 40)
        ]
    );
    assert_eq!(report.total, 125);
    Ok(())
}

#[tokio::test]
async fn test_health_reports_each_service() {
    let generator = ScriptedGenerator {
        installed: vec!["gemma3:12b".to_string(), "gemma2:2b".to_string()],
        ..ScriptedGenerator::default()
    };
    let h = harness(&AppConfig::default(), ScriptedStore::failing(), generator);

    let health = h.service.health(HardwareProfile::Cpu).await;

    assert!(health.vector_store.is_err());
    assert!(health.generation.is_ok());
    assert!(!health.is_healthy());
    assert_eq!(health.missing_candidates(), vec!["gemma3:4b"]);
}
