//! End-to-end pipeline tests against in-memory collaborators.

mod common;

use common::{harness, small_chunk_config, INVOICE_TEXT};
use docqa::config::Config;
use docqa_core::models::{DocumentId, RagConfig};
use docqa_core::retrieve::NO_RELEVANT_INFO_ANSWER;
use docqa_core::Error;

async fn uploaded_and_extracted(h: &common::Harness) -> DocumentId {
    let upload = h
        .service
        .upload(Some("invoice.pdf".to_string()), b"%PDF-1.4 fake")
        .await
        .unwrap();
    h.service.extract(&upload.document_id, 30).await.unwrap();
    upload.document_id
}

#[tokio::test]
async fn full_pipeline_answers_from_grounded_context() {
    let h = harness(&small_chunk_config(), INVOICE_TEXT);

    let upload = h
        .service
        .upload(Some("invoice.pdf".to_string()), b"%PDF-1.4 fake")
        .await
        .unwrap();
    assert_eq!(upload.size_bytes, 13);
    assert_eq!(upload.filename.as_deref(), Some("invoice.pdf"));
    let id = upload.document_id;

    let extracted = h.service.extract(&id, 30).await.unwrap();
    assert_eq!(extracted.pages_processed, 3);
    assert_eq!(extracted.text_length, INVOICE_TEXT.chars().count());
    assert!(extracted.message.is_none());
    assert!(extracted.preview.starts_with("The invoice total"));

    let indexed = h.service.build_index(&id, None).await.unwrap();
    assert_eq!(indexed.chunks_indexed, 2);
    assert!(!indexed.truncated);
    assert_eq!(indexed.config.chunk_size, 40);
    assert_eq!(indexed.embedding_model, "keyword-test");

    let answer = h
        .service
        .ask(&id, "What is the invoice total?", 4)
        .await
        .unwrap();
    assert_eq!(answer.answer, "reply 1");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].chunk_id, 0);
    assert_eq!(answer.sources[0].distance_score, 0.0);

    let prompts = h.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[Chunk 0 | distance 0.0000]"));
    assert!(prompts[0].contains("420 dollars"));
    assert!(!prompts[0].contains("soup"));

    let status = h.service.status(&id).await.unwrap();
    assert!(status.has_raw && status.has_text && status.has_index);
    assert!(!status.has_summary);
}

#[tokio::test]
async fn unrelated_question_returns_sentinel_without_llm_call() {
    let h = harness(&small_chunk_config(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;
    h.service.build_index(&id, None).await.unwrap();

    let answer = h.service.ask(&id, "How is the weather?", 10).await.unwrap();
    assert_eq!(answer.answer, NO_RELEVANT_INFO_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn ask_validates_top_k_bounds() {
    let h = harness(&small_chunk_config(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;
    h.service.build_index(&id, None).await.unwrap();

    for bad in [0, 11] {
        let err = h.service.ask(&id, "invoice?", bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "top_k={bad}");
    }
    for good in [1, 10] {
        assert!(h.service.ask(&id, "invoice?", good).await.is_ok(), "top_k={good}");
    }

    let err = h.service.ask(&id, "   ", 4).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn ask_without_index_is_not_found() {
    let h = harness(&Config::default(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;

    let err = h.service.ask(&id, "invoice?", 4).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("Build the index first"));
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn rebuilding_the_index_replaces_it() {
    let h = harness(&small_chunk_config(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;

    let first = h.service.build_index(&id, None).await.unwrap();
    let artifacts = h.store.len();
    let second = h.service.build_index(&id, None).await.unwrap();
    assert_eq!(first.chunks_indexed, second.chunks_indexed);
    assert_eq!(h.store.len(), artifacts);

    let answer = h.service.ask(&id, "invoice total", 10).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn index_honors_request_config_and_cap() {
    let h = harness(&Config::default(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;

    let cfg = RagConfig {
        chunk_size: 40,
        chunk_overlap: 10,
        max_chunks: 1,
    };
    let out = h.service.build_index(&id, Some(cfg)).await.unwrap();
    assert_eq!(out.chunks_indexed, 1);
    assert!(out.truncated);
    assert_eq!(out.config, cfg);

    let bad = RagConfig {
        chunk_size: 100,
        chunk_overlap: 100,
        max_chunks: 10,
    };
    let err = h.service.build_index(&id, Some(bad)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn summarize_runs_map_and_reduce_and_persists() {
    let h = harness(&Config::default(), INVOICE_TEXT);
    let id = uploaded_and_extracted(&h).await;

    let err = h.service.summary(&id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let out = h.service.summarize(&id).await.unwrap();
    assert_eq!(out.chunks_used, 1);
    assert_eq!(out.chunk_size, 6000);
    assert!(!out.truncated);
    // One map call plus the reduce call.
    assert_eq!(h.llm.calls(), 2);
    assert_eq!(out.summary, "reply 2");

    let record = h.service.summary(&id).await.unwrap();
    assert_eq!(record.summary, "reply 2");
    assert_eq!(record.document_id, id);
    assert!(h.service.status(&id).await.unwrap().has_summary);
}

#[tokio::test]
async fn long_document_summary_issues_six_map_calls() {
    let text: String = (0..300).map(|_| format!("{}. ", "a".repeat(98))).collect();
    assert_eq!(text.len(), 30_000);
    let h = harness(&Config::default(), &text);
    let id = uploaded_and_extracted(&h).await;

    let out = h.service.summarize(&id).await.unwrap();
    assert_eq!(out.chunks_used, 6);
    assert!(!out.truncated);
    assert_eq!(h.llm.calls(), 7);
}

#[tokio::test]
async fn empty_text_is_reported_not_processed() {
    let h = harness(&Config::default(), "");
    let upload = h.service.upload(None, b"%PDF scanned").await.unwrap();
    let id = upload.document_id;

    let extracted = h.service.extract(&id, 30).await.unwrap();
    assert_eq!(extracted.text_length, 0);
    assert!(extracted.message.is_some());

    let err = h.service.summarize(&id).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("Extracted text is empty"));

    let err = h.service.build_index(&id, None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn missing_prerequisites_are_not_found() {
    let h = harness(&Config::default(), INVOICE_TEXT);
    let id = DocumentId::generate();

    assert!(matches!(
        h.service.extract(&id, 30).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        h.service.summarize(&id).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        h.service.build_index(&id, None).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn upload_and_extract_validate_input() {
    let mut config = Config::default();
    config.server.max_upload_mb = 1;
    let h = harness(&config, INVOICE_TEXT);

    let err = h.service.upload(None, b"").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let too_big = vec![0u8; 1024 * 1024 + 1];
    let err = h.service.upload(None, &too_big).await.unwrap_err();
    assert!(err.to_string().contains("File too large"));
    assert!(h.store.is_empty());

    let id = uploaded_and_extracted(&h).await;
    for bad in [0, 201] {
        let err = h.service.extract(&id, bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "max_pages={bad}");
    }
    assert_eq!(h.service.extract(&id, 2).await.unwrap().pages_processed, 2);
}
