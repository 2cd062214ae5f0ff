use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embedbatch_core::{
    ChunkSettings, CoreError, DefaultTextExtractor, EmbeddingGenerator, EmbeddingPipeline,
    ErrorCode, JobId, JobStatus, MockEmbeddingGenerator,
};
use embedbatch_jobs::{
    AcquireError, AcquiredFile, CallbackDispatcher, DefaultFileAcquirer, FileAcquirer,
    JobProcessor, JobRegistry,
};
use embedbatch_store::{MemoryResultStore, MockResultStore, ResultStore, StoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIMENSION: usize = 8;

fn pipeline() -> EmbeddingPipeline {
    EmbeddingPipeline::new(
        Arc::new(MockEmbeddingGenerator::new(DIMENSION).unwrap()),
        ChunkSettings::default(),
    )
}

fn processor_with(
    registry: &JobRegistry,
    acquirer: Arc<dyn FileAcquirer>,
    pipeline: EmbeddingPipeline,
    store: Arc<dyn ResultStore>,
) -> JobProcessor {
    JobProcessor::new(
        registry.clone(),
        pipeline,
        acquirer,
        Arc::new(DefaultTextExtractor::new()),
        store,
        CallbackDispatcher::new(5).unwrap(),
    )
}

fn local_acquirer() -> Arc<dyn FileAcquirer> {
    Arc::new(DefaultFileAcquirer::new(5).unwrap())
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

/// Records the job's progress every time a file is acquired.
struct ProgressProbe {
    registry: JobRegistry,
    inner: DefaultFileAcquirer,
    seen: Mutex<Vec<u8>>,
}

#[async_trait]
impl FileAcquirer for ProgressProbe {
    async fn acquire(&self, reference: &str) -> Result<AcquiredFile, AcquireError> {
        if let Some(job) = self.registry.list().await.into_iter().next() {
            self.seen.lock().unwrap().push(job.progress);
        }
        self.inner.acquire(reference).await
    }
}

/// Bumps the job's progress behind the processor's back on the first fetch.
struct InterferingAcquirer {
    registry: JobRegistry,
    inner: DefaultFileAcquirer,
}

#[async_trait]
impl FileAcquirer for InterferingAcquirer {
    async fn acquire(&self, reference: &str) -> Result<AcquiredFile, AcquireError> {
        if let Some(mut job) = self.registry.list().await.into_iter().next() {
            if job.progress == 0 {
                job.advance_progress(99, 100).unwrap();
                self.registry.update(job).await.unwrap();
            }
        }
        self.inner.acquire(reference).await
    }
}

struct FailingGenerator;

#[async_trait]
impl EmbeddingGenerator for FailingGenerator {
    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>, CoreError> {
        Err(CoreError::EmbeddingError("backend exploded".to_string()))
    }
}

async fn wait_for_requests(server: &MockServer, count: usize) {
    for _ in 0..100 {
        if server.received_requests().await.map(|r| r.len()).unwrap_or(0) >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_two_local_files_complete_with_one_result() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "a.txt", "first document");
    let second = write_file(&dir, "b.txt", &"second document ".repeat(100));

    let registry = JobRegistry::new();
    let probe = Arc::new(ProgressProbe {
        registry: registry.clone(),
        inner: DefaultFileAcquirer::new(5).unwrap(),
        seen: Mutex::new(Vec::new()),
    });
    let store = Arc::new(MemoryResultStore::new("/v1/results"));
    let processor = processor_with(&registry, probe.clone(), pipeline(), store.clone());

    let job = registry.create(vec![first, second], "embed-large-512", None).await;
    processor.process(0, job.job_id).await;

    let done = registry.get(&job.job_id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert!(done.error.is_none());
    assert_eq!(
        done.result_urls,
        Some(vec![format!("/v1/results/{}_results.json", job.job_id)])
    );
    assert_eq!(*probe.seen.lock().unwrap(), vec![0, 50]);

    let saved = store.results_for(&job.job_id).await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].results[0].id, "a.txt");
    assert!(saved[0].results[0].embedding().is_some());

    // 1600 chars with the default chunk size of 1000 is split in two
    let chunks = saved[1].results[0].chunks().unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_id, "b.txt_0");
    let norm: f32 = chunks[0].embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn test_unreachable_url_fails_with_single_callback() {
    let callback_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&callback_server)
        .await;

    let registry = JobRegistry::new();
    let store = Arc::new(MemoryResultStore::new("/v1/results"));
    let processor = processor_with(&registry, local_acquirer(), pipeline(), store.clone());

    let job = registry
        .create(
            vec!["http://127.0.0.1:1/missing.pdf".to_string()],
            "embed-large-512",
            Some(format!("{}/hook", callback_server.uri())),
        )
        .await;
    processor.process(0, job.job_id).await;

    let failed = registry.get(&job.job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_ref().map(|e| e.code), Some(ErrorCode::DownloadFailed));
    assert!(failed.result_urls.is_none());
    assert!(store.is_empty().await);

    wait_for_requests(&callback_server, 1).await;
    let requests = callback_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"]["code"], "download_failed");
    assert_eq!(body["job_id"], job.job_id.to_string());
}

#[tokio::test]
async fn test_completed_job_fires_single_callback() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", "callback me");

    let callback_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/done"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&callback_server)
        .await;

    let registry = JobRegistry::new();
    let store = Arc::new(MemoryResultStore::new("/v1/results"));
    let processor = processor_with(&registry, local_acquirer(), pipeline(), store);

    let job = registry
        .create(vec![file], "m", Some(format!("{}/done", callback_server.uri())))
        .await;
    processor.process(0, job.job_id).await;
    processor.callbacks().drain().await;

    let requests = callback_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["job_id"], job.job_id.to_string());
    assert_eq!(body["status"], "completed");
    assert_eq!(
        body["result_urls"],
        serde_json::json!([format!("/v1/results/{}_results.json", job.job_id)])
    );
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_rejected_progress_write_fails_job() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "a.txt", "one");
    let second = write_file(&dir, "b.txt", "two");

    let callback_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&callback_server)
        .await;

    let registry = JobRegistry::new();
    let acquirer = Arc::new(InterferingAcquirer {
        registry: registry.clone(),
        inner: DefaultFileAcquirer::new(5).unwrap(),
    });
    let store = Arc::new(MemoryResultStore::new("/v1/results"));
    let processor = processor_with(&registry, acquirer, pipeline(), store.clone());

    let job = registry
        .create(vec![first, second], "m", Some(callback_server.uri()))
        .await;
    processor.process(0, job.job_id).await;
    processor.callbacks().drain().await;

    let failed = registry.get(&job.job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let error = failed.error.unwrap();
    assert_eq!(error.code, ErrorCode::EmbeddingFailed);
    assert!(error.message.contains("rejected"));
    assert!(store.is_empty().await);

    let requests = callback_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_failure_discards_partial_results() {
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "good.txt", "fine");
    let bad = write_file(&dir, "image.png", "not text");

    let registry = JobRegistry::new();
    let store = Arc::new(MemoryResultStore::new("/v1/results"));
    let processor = processor_with(&registry, local_acquirer(), pipeline(), store.clone());

    let job = registry.create(vec![good, bad], "m", None).await;
    processor.process(3, job.job_id).await;

    let failed = registry.get(&job.job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_ref().map(|e| e.code), Some(ErrorCode::ExtractionFailed));
    assert_eq!(failed.progress, 50);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_generator_failure_is_embedding_failed() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", "text");

    let registry = JobRegistry::new();
    let failing = EmbeddingPipeline::new(Arc::new(FailingGenerator), ChunkSettings::default());
    let processor = processor_with(
        &registry,
        local_acquirer(),
        failing,
        Arc::new(MemoryResultStore::new("/v1/results")),
    );

    let job = registry.create(vec![file], "m", None).await;
    processor.process(0, job.job_id).await;

    let failed = registry.get(&job.job_id).await.unwrap();
    assert_eq!(failed.error.map(|e| e.code), Some(ErrorCode::EmbeddingFailed));
}

#[tokio::test]
async fn test_storage_error_is_storage_failed() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", "text");

    let mut store = MockResultStore::new();
    store.expect_save().times(1).returning(|_, _| {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    });

    let registry = JobRegistry::new();
    let processor = processor_with(&registry, local_acquirer(), pipeline(), Arc::new(store));

    let job = registry.create(vec![file], "m", None).await;
    processor.process(0, job.job_id).await;

    let failed = registry.get(&job.job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let error = failed.error.unwrap();
    assert_eq!(error.code, ErrorCode::StorageFailed);
    assert!(error.message.contains("disk full"));
    assert!(failed.result_urls.is_none());
}

#[tokio::test]
async fn test_missing_job_is_ignored() {
    let registry = JobRegistry::new();
    let processor = processor_with(
        &registry,
        local_acquirer(),
        pipeline(),
        Arc::new(MemoryResultStore::new("/v1/results")),
    );

    processor.process(0, JobId::new_v4()).await;
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_finished_job_is_not_processed_twice() {
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", "text");

    let mut store = MockResultStore::new();
    store
        .expect_save()
        .times(1)
        .returning(|job_id, _| Ok(format!("/v1/results/{}_results.json", job_id)));

    let registry = JobRegistry::new();
    let processor = processor_with(&registry, local_acquirer(), pipeline(), Arc::new(store));

    let job = registry.create(vec![file], "m", None).await;
    processor.process(0, job.job_id).await;
    let first = registry.get(&job.job_id).await.unwrap();

    processor.process(1, job.job_id).await;
    let second = registry.get(&job.job_id).await.unwrap();

    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(first, second);
}
