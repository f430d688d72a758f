//! End-to-end pipeline tests over the in-memory index service.

mod common;

use std::sync::Arc;

use docqa::{
    Chunker, Document, DocqaError, FixedWindowChunker, InMemoryIndexService, JsonFileRegistry,
    PipelineConfig, QaPipeline, RecordEmbedder, SkipReason, content_id,
};

use common::{StubChat, StubEmbedder, text_of_len};

const DIM: usize = 8;

struct Harness {
    pipeline: QaPipeline,
    embedder: Arc<StubEmbedder>,
    chat: Arc<StubChat>,
    index_service: Arc<InMemoryIndexService>,
    _dir: tempfile::TempDir,
}

fn harness(embedder: StubEmbedder) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(JsonFileRegistry::open(dir.path().join("storage.json")).unwrap());
    let index_service = Arc::new(InMemoryIndexService::new());
    let embedder = Arc::new(embedder);
    let chat = Arc::new(StubChat::new("The deployment runs on Fridays."));

    let config = PipelineConfig::builder().dimension(DIM).embed_concurrency(4).build().unwrap();
    let pipeline = QaPipeline::builder()
        .config(config)
        .registry(registry)
        .index_provider(Arc::clone(&index_service) as Arc<dyn docqa::IndexProvider>)
        .embedding_provider(Arc::clone(&embedder) as Arc<dyn docqa::EmbeddingProvider>)
        .chat_model(Arc::clone(&chat) as Arc<dyn docqa::ChatModel>)
        .build()
        .unwrap();

    Harness { pipeline, embedder, chat, index_service, _dir: dir }
}

fn expected_chunk_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> =
        FixedWindowChunker::new(2000).chunk(text).iter().map(|c| content_id(c)).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn plain_text_document_yields_three_content_addressed_records() {
    let h = harness(StubEmbedder::new(DIM));
    let text = text_of_len(4500);

    let report = h
        .pipeline
        .create_collection(
            "ada",
            "specs",
            "specs-idx",
            vec![Document::new("notes.txt", "text/plain", text.as_bytes())],
        )
        .await
        .unwrap();

    assert_eq!(report.upserted, 3);
    assert!(report.is_clean());

    let mut stored = h.index_service.record_ids("specs-idx").await.unwrap();
    stored.sort();
    assert_eq!(stored, expected_chunk_ids(&text));
}

#[tokio::test]
async fn reingesting_the_same_content_is_idempotent() {
    use docqa::{IndexProvider, Metric, RegionSpec};

    let embedder = Arc::new(StubEmbedder::new(DIM));
    let index_service = InMemoryIndexService::new();
    index_service.create_index("idx", DIM, Metric::Cosine, &RegionSpec::default()).await.unwrap();
    let handle = index_service.index("idx").await.unwrap();

    let ingestor = docqa::Ingestor::new(
        Arc::new(FixedWindowChunker::new(2000)),
        RecordEmbedder::new(Arc::clone(&embedder) as Arc<dyn docqa::EmbeddingProvider>, DIM),
        4,
    );

    let text = text_of_len(4500);
    for name in ["first-upload.txt", "second-upload.txt"] {
        let report = ingestor
            .ingest_documents(&handle, vec![Document::new(name, "text/plain", text.as_bytes())])
            .await
            .unwrap();
        assert_eq!(report.upserted, 3);
    }

    // Same content under a different filename: the index has not grown.
    assert_eq!(index_service.record_count("idx").await, Some(3));
}

#[tokio::test]
async fn unsupported_document_warns_and_batch_continues() {
    let h = harness(StubEmbedder::new(DIM));

    let documents = vec![
        Document::new("notes.txt", "text/plain", "release checklist for the gateway".as_bytes()),
        Document::new("logo.png", "image/png", vec![0u8; 16]),
        Document::new("owners.csv", "text/csv", "name,team\nada,core\n".as_bytes()),
    ];

    let report = h.pipeline.create_collection("ada", "mixed", "mixed-idx", documents).await.unwrap();

    assert_eq!(report.upserted, 2);
    assert_eq!(report.skips.len(), 1);
    assert_eq!(report.skips[0].document, "logo.png");
    assert_eq!(
        report.skips[0].reason,
        SkipReason::UnsupportedFormat { mime_type: "image/png".to_string() }
    );
    assert_eq!(h.index_service.record_count("mixed-idx").await, Some(2));
}

#[tokio::test]
async fn malformed_embedding_skips_only_that_chunk() {
    let h = harness(StubEmbedder::new(DIM).wrong_length_on("ZZZ"));

    // Marker lands in the second fixed window.
    let text = format!("{}ZZZ{}", text_of_len(2000), text_of_len(400));
    let chunks = FixedWindowChunker::new(2000).chunk(&text);
    assert_eq!(chunks.len(), 2);

    let report = h
        .pipeline
        .create_collection(
            "ada",
            "partial",
            "partial-idx",
            vec![Document::new("notes.txt", "text/plain", text.as_bytes())],
        )
        .await
        .unwrap();

    assert_eq!(report.upserted, 1);
    assert_eq!(report.skips.len(), 1);
    assert!(matches!(report.skips[0].reason, SkipReason::InvalidEmbedding { .. }));

    let stored = h.index_service.record_ids("partial-idx").await.unwrap();
    assert_eq!(stored, vec![content_id(&chunks[0])]);
}

#[tokio::test]
async fn embedding_service_fault_skips_chunk_and_commits_the_rest() {
    let h = harness(StubEmbedder::new(DIM).fail_on("@@@"));

    let documents = vec![
        Document::new("good.txt", "text/plain", "the healthy document".as_bytes()),
        Document::new("bad.txt", "text/plain", "@@@ the unlucky document".as_bytes()),
    ];

    let report = h.pipeline.create_collection("ada", "flaky", "flaky-idx", documents).await.unwrap();

    assert_eq!(report.upserted, 1);
    assert_eq!(report.skips.len(), 1);
    assert_eq!(report.skips[0].document, "bad.txt");
    assert!(matches!(report.skips[0].reason, SkipReason::EmbeddingService { .. }));

    // The collection is still committed: every document was attempted.
    assert_eq!(
        h.pipeline
            .answer("ada", "flaky", "what is healthy?")
            .await
            .unwrap()
            .map(|a| a.text),
        Some("The deployment runs on Fridays.".to_string())
    );
}

#[tokio::test]
async fn duplicate_names_are_rejected_before_any_network_call() {
    let h = harness(StubEmbedder::new(DIM));
    h.pipeline.create_collection("ada", "specs", "specs-idx", Vec::new()).await.unwrap();
    let calls_after_setup = h.embedder.calls();

    let err = h
        .pipeline
        .create_collection(
            "ada",
            "specs",
            "other-idx",
            vec![Document::new("a.txt", "text/plain", "text".as_bytes())],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocqaError::DuplicateName { kind: "collection", .. }));

    let err = h
        .pipeline
        .create_collection(
            "ada",
            "other",
            "specs-idx",
            vec![Document::new("a.txt", "text/plain", "text".as_bytes())],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocqaError::DuplicateName { kind: "index", .. }));

    // Rejection happened before the embedder or the index service was touched.
    assert_eq!(h.embedder.calls(), calls_after_setup);
    assert_eq!(h.index_service.record_ids("other-idx").await, None);

    // A different user may reuse the names.
    h.pipeline.create_collection("grace", "specs", "grace-idx", Vec::new()).await.unwrap();
}

#[tokio::test]
async fn querying_an_empty_collection_returns_none() {
    let h = harness(StubEmbedder::new(DIM));
    h.pipeline.create_collection("ada", "empty", "empty-idx", Vec::new()).await.unwrap();

    let answer = h.pipeline.answer("ada", "empty", "anything in here?").await.unwrap();
    assert!(answer.is_none());
    // No context, no model call.
    assert_eq!(h.chat.calls(), 0);
}

#[tokio::test]
async fn answering_an_unknown_collection_is_collection_not_found() {
    let h = harness(StubEmbedder::new(DIM));
    let err = h.pipeline.answer("ada", "nonexistent", "hello?").await.unwrap_err();
    assert!(matches!(err, DocqaError::CollectionNotFound { .. }));
}

#[tokio::test]
async fn answer_returns_model_text_and_retrieved_sources() {
    let h = harness(StubEmbedder::new(DIM));
    h.pipeline
        .create_collection(
            "ada",
            "ops",
            "ops-idx",
            vec![Document::new(
                "runbook.txt",
                "text/plain",
                "The deployment pipeline runs every Friday evening.".as_bytes(),
            )],
        )
        .await
        .unwrap();

    let answer = h.pipeline.answer("ada", "ops", "when do we deploy?").await.unwrap().unwrap();
    assert_eq!(answer.text, "The deployment runs on Fridays.");
    assert_eq!(h.chat.calls(), 1);
    assert!(!answer.sources.is_empty());
    assert!(answer.sources[0].text.contains("Friday evening"));
}

#[tokio::test]
async fn feedback_is_upserted_through_the_ingestion_path() {
    let h = harness(StubEmbedder::new(DIM));
    h.pipeline.create_collection("ada", "ops", "ops-idx", Vec::new()).await.unwrap();

    let report = h
        .pipeline
        .record_feedback("ada", "ops", "when do we deploy?", "Friday evening")
        .await
        .unwrap();

    assert_eq!(report.upserted, 1);
    assert!(report.is_clean());

    let blended = "The user asked: 'when do we deploy?' and the answer provided was: \
                   'Friday evening'.";
    let stored = h.index_service.record_ids("ops-idx").await.unwrap();
    assert_eq!(stored, vec![content_id(blended)]);
}
