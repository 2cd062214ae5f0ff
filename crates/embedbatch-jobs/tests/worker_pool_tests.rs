use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embedbatch_core::{
    ChunkSettings, CoreError, DefaultTextExtractor, EmbeddingGenerator, EmbeddingPipeline, JobId,
    JobStatus, MockEmbeddingGenerator,
};
use embedbatch_jobs::{
    AcquireError, AcquiredFile, CallbackDispatcher, FileAcquirer, JobProcessor, JobRegistry,
    JobsError, WorkerPool, WorkerPoolConfig,
};
use embedbatch_store::MemoryResultStore;
use tokio::sync::Semaphore;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves in-memory text and records every fetch in order.
#[derive(Default)]
struct CountingAcquirer {
    fetched: Mutex<HashMap<String, usize>>,
    order: Mutex<Vec<String>>,
}

#[async_trait]
impl FileAcquirer for CountingAcquirer {
    async fn acquire(&self, reference: &str) -> Result<AcquiredFile, AcquireError> {
        *self.fetched.lock().unwrap().entry(reference.to_string()).or_default() += 1;
        self.order.lock().unwrap().push(reference.to_string());
        Ok(AcquiredFile {
            file_name: format!("{}.txt", reference),
            bytes: format!("contents of {}", reference).into_bytes(),
        })
    }
}

/// Blocks every embedding call until the test releases permits.
struct GatedGenerator {
    gate: Semaphore,
    inner: MockEmbeddingGenerator,
}

#[async_trait]
impl EmbeddingGenerator for GatedGenerator {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        permit.forget();
        Ok(self.inner.embed(text))
    }
}

struct Harness {
    registry: JobRegistry,
    acquirer: Arc<CountingAcquirer>,
    generator: Arc<GatedGenerator>,
    pool: Arc<WorkerPool>,
}

fn harness(worker_count: usize, queue_capacity: usize, open_gate: bool) -> Harness {
    let registry = JobRegistry::new();
    let acquirer = Arc::new(CountingAcquirer::default());
    let generator = Arc::new(GatedGenerator {
        gate: Semaphore::new(if open_gate { Semaphore::MAX_PERMITS } else { 0 }),
        inner: MockEmbeddingGenerator::new(4).unwrap(),
    });
    let processor = JobProcessor::new(
        registry.clone(),
        EmbeddingPipeline::new(generator.clone(), ChunkSettings::default()),
        acquirer.clone(),
        Arc::new(DefaultTextExtractor::new()),
        Arc::new(MemoryResultStore::new("/v1/results")),
        CallbackDispatcher::new(5).unwrap(),
    );
    let pool = WorkerPool::start(
        WorkerPoolConfig {
            worker_count,
            queue_capacity,
        },
        Arc::new(processor),
    );
    Harness {
        registry,
        acquirer,
        generator,
        pool: Arc::new(pool),
    }
}

async fn wait_until<F>(registry: &JobRegistry, job_id: &JobId, predicate: F) -> bool
where
    F: Fn(JobStatus) -> bool,
{
    for _ in 0..250 {
        if let Some(job) = registry.get(job_id).await {
            if predicate(job.status) {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_every_job_processed_exactly_once() {
    let h = harness(4, 8, true);

    let mut ids = Vec::new();
    for i in 0..20 {
        let job = h.registry.create(vec![format!("file-{}", i)], "m", None).await;
        h.pool.enqueue(job.job_id).await.unwrap();
        ids.push(job.job_id);
    }

    for id in &ids {
        assert!(wait_until(&h.registry, id, |s| s.is_terminal()).await);
        assert_eq!(h.registry.get(id).await.unwrap().status, JobStatus::Completed);
    }

    let fetched = h.acquirer.fetched.lock().unwrap().clone();
    assert_eq!(fetched.len(), 20);
    assert!(fetched.values().all(|count| *count == 1));
    assert_eq!(h.registry.queue_depth().await, 0);

    h.pool.shutdown().await;
}

#[tokio::test]
async fn test_full_queue_blocks_submitter_without_dropping() {
    let h = harness(1, 1, false);

    let first = h.registry.create(vec!["one".to_string()], "m", None).await;
    let second = h.registry.create(vec!["two".to_string()], "m", None).await;
    let third = h.registry.create(vec!["three".to_string()], "m", None).await;

    // The only worker picks up the first job and blocks inside the generator
    h.pool.enqueue(first.job_id).await.unwrap();
    assert!(wait_until(&h.registry, &first.job_id, |s| s == JobStatus::Running).await);

    // Fills the single queue slot
    h.pool.enqueue(second.job_id).await.unwrap();

    let pool = Arc::clone(&h.pool);
    let blocked = tokio::spawn(async move { pool.enqueue(third.job_id).await });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!blocked.is_finished(), "enqueue should wait for capacity");

    h.generator.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    blocked.await.unwrap().unwrap();

    for id in [first.job_id, second.job_id, third.job_id] {
        assert!(wait_until(&h.registry, &id, |s| s == JobStatus::Completed).await);
    }
    let fetched = h.acquirer.fetched.lock().unwrap().clone();
    assert_eq!(fetched.values().sum::<usize>(), 3);

    h.pool.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_finishes_running_job_and_leaves_queue() {
    let h = harness(1, 4, false);

    let running = h.registry.create(vec!["busy".to_string()], "m", None).await;
    let waiting = h.registry.create(vec!["idle".to_string()], "m", None).await;

    h.pool.enqueue(running.job_id).await.unwrap();
    assert!(wait_until(&h.registry, &running.job_id, |s| s == JobStatus::Running).await);
    h.pool.enqueue(waiting.job_id).await.unwrap();

    let pool = Arc::clone(&h.pool);
    let shutdown = tokio::spawn(async move { pool.shutdown().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!shutdown.is_finished(), "shutdown waits for the running job");

    h.generator.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    shutdown.await.unwrap();

    assert_eq!(h.registry.get(&running.job_id).await.unwrap().status, JobStatus::Completed);
    assert_eq!(h.registry.get(&waiting.job_id).await.unwrap().status, JobStatus::Queued);
}

#[tokio::test]
async fn test_enqueue_after_shutdown_is_rejected() {
    let h = harness(2, 4, true);
    h.pool.shutdown().await;

    assert!(h.pool.is_closed());
    let job = h.registry.create(vec!["late".to_string()], "m", None).await;
    assert!(matches!(h.pool.enqueue(job.job_id).await, Err(JobsError::PoolClosed)));
}

#[tokio::test]
async fn test_single_worker_takes_jobs_in_enqueue_order() {
    let h = harness(1, 16, true);

    let references: Vec<String> = (0..10).map(|i| format!("ordered-{}", i)).collect();
    let mut ids = Vec::new();
    for reference in &references {
        let job = h.registry.create(vec![reference.clone()], "m", None).await;
        h.pool.enqueue(job.job_id).await.unwrap();
        ids.push(job.job_id);
    }

    for id in &ids {
        assert!(wait_until(&h.registry, id, |s| s == JobStatus::Completed).await);
    }
    assert_eq!(*h.acquirer.order.lock().unwrap(), references);

    h.pool.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_callback_of_running_job() {
    let callback_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&callback_server)
        .await;

    let h = harness(1, 4, false);
    let job = h
        .registry
        .create(vec!["late-callback".to_string()], "m", Some(callback_server.uri()))
        .await;
    h.pool.enqueue(job.job_id).await.unwrap();
    assert!(wait_until(&h.registry, &job.job_id, |s| s == JobStatus::Running).await);

    let pool = Arc::clone(&h.pool);
    let shutdown = tokio::spawn(async move { pool.shutdown().await });
    h.generator.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    shutdown.await.unwrap();

    assert_eq!(h.registry.get(&job.job_id).await.unwrap().status, JobStatus::Completed);
    // Delivered before shutdown returned, not left to a detached task
    assert_eq!(callback_server.received_requests().await.unwrap().len(), 1);
}
