// THEORY:
// The parallel pipeline is the streaming face of the engine. A camera delivers
// frames faster than a full-frame scan can always finish, and the code handling a
// frame needs an answer immediately. The two are decoupled:
//
// - `submit_frame` hands a frame to a single background worker and returns at once.
// - `read_latest` copies whatever result the worker published last, possibly from a
//   few frames ago, or the empty result if nothing has finished yet.
//
// Key architectural principles:
// 1.  **Serial worker**: exactly one worker analyzes frames, strictly in submission
//     order, one at a time. The CPU-bound scan runs on tokio's blocking pool so the
//     async runtime is never stalled.
// 2.  **Bounded queue**: the queue between producer and worker has a fixed capacity.
//     On overload the configured `OverloadPolicy` either evicts the oldest waiting
//     frame (latest wins) or refuses the new one. Memory and latency stay bounded.
// 3.  **Short critical sections**: the result cache is a mutex held only long
//     enough to clone or replace one result. The reader never waits for analysis.
// 4.  **Independent motion lock**: motion state lives inside the shared
//     `PixelAnalyzer` behind its own lock, so one-shot calls made through this
//     pipeline share the motion history without touching the cache lock.

use crate::adapter::{NativeFrame, frame_to_buffer};
use crate::error::{AnalysisError, Result};
use crate::pipeline::{
    AnalysisOptions, OverloadPolicy, PipelineConfig, PixelAnalyzer, PixelBuffer, PixelColorsResult,
};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// What happened to a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The frame is waiting for the worker.
    Queued { frame_id: u64 },
    /// The frame is waiting; an older waiting frame was evicted to make room.
    QueuedDroppingOldest { frame_id: u64, dropped_frame_id: u64 },
    /// The queue was full and the policy refuses new frames.
    Rejected,
    /// The pipeline is shutting down.
    Closed,
}

impl SubmitOutcome {
    /// The id assigned to the frame, if it was accepted.
    pub fn frame_id(&self) -> Option<u64> {
        match self {
            SubmitOutcome::Queued { frame_id } | SubmitOutcome::QueuedDroppingOldest { frame_id, .. } => {
                Some(*frame_id)
            }
            SubmitOutcome::Rejected | SubmitOutcome::Closed => None,
        }
    }
}

/// The cached result plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    /// Frame that produced `result`; 0 for the initial empty result.
    pub frame_id: u64,
    /// When the worker published `result`; `None` for the initial empty result.
    pub completed_at: Option<Instant>,
    pub result: PixelColorsResult,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            frame_id: 0,
            completed_at: None,
            result: PixelColorsResult::empty(),
        }
    }
}

struct FrameTask {
    frame_id: u64,
    buffer: PixelBuffer,
    options: AnalysisOptions,
}

struct FrameQueue {
    tasks: VecDeque<FrameTask>,
    next_frame_id: u64,
    closed: bool,
}

struct Shared {
    analyzer: PixelAnalyzer,
    queue: Mutex<FrameQueue>,
    task_ready: Notify,
    cache: Mutex<AnalysisSnapshot>,
    /// Highest frame id the worker has finished with.
    settled: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    async fn next_task(&self) -> Option<FrameTask> {
        loop {
            {
                let mut queue = lock(&self.queue);
                if let Some(task) = queue.tasks.pop_front() {
                    return Some(task);
                }
                if queue.closed {
                    return None;
                }
            }
            self.task_ready.notified().await;
        }
    }

    fn publish(&self, frame_id: u64, result: PixelColorsResult) {
        *lock(&self.cache) = AnalysisSnapshot {
            frame_id,
            completed_at: Some(Instant::now()),
            result,
        };
        self.settled.send_replace(frame_id);
    }
}

async fn run_worker(shared: Arc<Shared>) {
    info!("streaming worker started");
    while let Some(task) = shared.next_task().await {
        let frame_id = task.frame_id;
        let worker_shared = Arc::clone(&shared);
        let analysis = tokio::task::spawn_blocking(move || {
            worker_shared.analyzer.analyze(&task.buffer, &task.options)
        })
        .await;

        match analysis {
            Ok(result) => shared.publish(frame_id, result),
            Err(err) => {
                // Keep the previous result cached but release anyone waiting on this frame.
                error!("analysis of frame {frame_id} did not complete: {err}");
                shared.settled.send_replace(frame_id);
            }
        }
    }
    debug!("streaming worker stopped");
}

/// Asynchronous producer / synchronous consumer front end of the engine.
pub struct StreamingPipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl StreamingPipeline {
    /// Starts the background worker.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn new(config: PipelineConfig) -> Self {
        let (settled, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            analyzer: PixelAnalyzer::new(),
            queue: Mutex::new(FrameQueue {
                tasks: VecDeque::with_capacity(config.queue_capacity.max(1)),
                next_frame_id: 1,
                closed: false,
            }),
            task_ready: Notify::new(),
            cache: Mutex::new(AnalysisSnapshot::default()),
            settled,
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared)));

        Self {
            config,
            shared,
            worker: Some(worker),
        }
    }

    /// The engine shared by the worker and by `analyze`.
    pub fn analyzer(&self) -> &PixelAnalyzer {
        &self.shared.analyzer
    }

    /// Enqueues a frame for background analysis. Never waits on the worker.
    pub fn submit_frame(&self, buffer: PixelBuffer, options: AnalysisOptions) -> SubmitOutcome {
        let capacity = self.config.queue_capacity.max(1);
        let outcome = {
            let mut queue = lock(&self.shared.queue);
            if queue.closed {
                return SubmitOutcome::Closed;
            }

            let mut dropped = None;
            if queue.tasks.len() >= capacity {
                match self.config.overload_policy {
                    OverloadPolicy::RejectNewest => {
                        warn!("streaming queue full ({capacity}), frame rejected");
                        return SubmitOutcome::Rejected;
                    }
                    OverloadPolicy::DropOldest => {
                        dropped = queue.tasks.pop_front().map(|task| task.frame_id);
                    }
                }
            }

            let frame_id = queue.next_frame_id;
            queue.next_frame_id += 1;
            queue.tasks.push_back(FrameTask {
                frame_id,
                buffer,
                options,
            });

            match dropped {
                Some(dropped_frame_id) => {
                    warn!("streaming queue full ({capacity}), frame {dropped_frame_id} dropped");
                    SubmitOutcome::QueuedDroppingOldest {
                        frame_id,
                        dropped_frame_id,
                    }
                }
                None => SubmitOutcome::Queued { frame_id },
            }
        };
        self.shared.task_ready.notify_one();
        outcome
    }

    /// Converts a camera frame, downscaled to the configured working dimension, and
    /// enqueues it. Conversion runs on the caller's thread; a frame the adapter
    /// cannot convert is returned as an error and never reaches the queue.
    pub fn submit_native(&self, frame: &NativeFrame<'_>, options: AnalysisOptions) -> Result<SubmitOutcome> {
        let buffer = frame_to_buffer(frame, self.config.max_working_dimension)?;
        Ok(self.submit_frame(buffer, options))
    }

    /// The most recently published result. Never waits on the worker.
    pub fn read_latest(&self) -> PixelColorsResult {
        lock(&self.shared.cache).result.clone()
    }

    /// The most recently published result with its frame id and completion time.
    pub fn latest_snapshot(&self) -> AnalysisSnapshot {
        lock(&self.shared.cache).clone()
    }

    /// Frames currently waiting for the worker.
    pub fn queued_frames(&self) -> usize {
        lock(&self.shared.queue).tasks.len()
    }

    /// Resolves once the worker is done with `frame_id` or any later frame, which
    /// also covers frames that were evicted from the queue. Returns the snapshot
    /// cached at that point.
    pub async fn wait_for_frame(&self, frame_id: u64) -> Result<AnalysisSnapshot> {
        let mut settled = self.shared.settled.subscribe();
        settled
            .wait_for(|&latest| latest >= frame_id)
            .await
            .map_err(|_| AnalysisError::WorkerClosed)?;
        Ok(self.latest_snapshot())
    }

    /// One-shot analysis on the caller's thread. Bypasses the cache but shares the
    /// motion history with the streaming worker.
    pub fn analyze(&self, buffer: &PixelBuffer, options: &AnalysisOptions) -> PixelColorsResult {
        self.shared.analyzer.analyze(buffer, options)
    }

    fn close(&self) {
        lock(&self.shared.queue).closed = true;
        self.shared.task_ready.notify_one();
    }

    /// Stops accepting frames, lets the worker finish what is queued, and joins it.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!("streaming worker ended abnormally: {err}");
            }
        }
    }
}

impl Drop for StreamingPipeline {
    fn drop(&mut self) {
        // Best effort: the worker drains what is queued and exits on its own.
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FramePlane, NativeFormat};
    use crate::core_modules::pixel::Pixel;

    fn solid(level: u8) -> PixelBuffer {
        PixelBuffer::filled(2, 2, Pixel::opaque(level, level, level))
    }

    #[tokio::test]
    async fn shutdown_drains_queued_frames() {
        let pipeline = StreamingPipeline::new(PipelineConfig::default());
        let shared = Arc::clone(&pipeline.shared);
        for level in [10, 20, 30] {
            pipeline.submit_frame(solid(level), AnalysisOptions::default());
        }

        pipeline.shutdown().await;

        let snapshot = lock(&shared.cache).clone();
        assert_eq!(snapshot.frame_id, 3);
        assert_eq!(snapshot.result.top_colors[0].r, 24);
        assert!(lock(&shared.queue).tasks.is_empty());
    }

    #[tokio::test]
    async fn closed_pipeline_refuses_frames() {
        let pipeline = StreamingPipeline::new(PipelineConfig::default());
        pipeline.close();
        assert_eq!(
            pipeline.submit_frame(solid(0), AnalysisOptions::default()),
            SubmitOutcome::Closed
        );
        assert_eq!(pipeline.queued_frames(), 0);
    }

    #[tokio::test]
    async fn native_frames_are_shrunk_to_the_working_dimension() {
        let pipeline = StreamingPipeline::new(PipelineConfig {
            max_working_dimension: 4,
            ..PipelineConfig::default()
        });
        let shared = Arc::clone(&pipeline.shared);
        let data = vec![120u8; 16 * 8 * 4];
        let frame = NativeFrame {
            width: 16,
            height: 8,
            format: NativeFormat::Rgba8888,
            planes: vec![FramePlane::packed(&data, 16, 4)],
        };

        let outcome = pipeline
            .submit_native(&frame, AnalysisOptions::default().with_hsv())
            .expect("convertible");
        assert_eq!(outcome, SubmitOutcome::Queued { frame_id: 1 });
        {
            let queue = lock(&shared.queue);
            let queued = &queue.tasks[0].buffer;
            assert_eq!((queued.width(), queued.height()), (4, 2));
        }

        let snapshot = pipeline.wait_for_frame(1).await.expect("worker alive");
        assert_eq!(snapshot.result.total_pixels_analyzed, Some(8));

        let unknown = NativeFrame {
            format: NativeFormat::Other(7),
            ..frame
        };
        assert!(matches!(
            pipeline.submit_native(&unknown, AnalysisOptions::default()),
            Err(AnalysisError::UnsupportedFormat(_))
        ));
        assert_eq!(pipeline.queued_frames(), 0);
    }

    #[test]
    fn outcomes_expose_accepted_ids() {
        assert_eq!(SubmitOutcome::Queued { frame_id: 4 }.frame_id(), Some(4));
        assert_eq!(
            SubmitOutcome::QueuedDroppingOldest {
                frame_id: 5,
                dropped_frame_id: 4
            }
            .frame_id(),
            Some(5)
        );
        assert_eq!(SubmitOutcome::Closed.frame_id(), None);
    }
}
