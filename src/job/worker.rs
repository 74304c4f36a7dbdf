use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Context as _;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::job::intake::RenderJob;
use crate::job::pipeline::{EncoderFactory, FfmpegEncoders, JobOutput, run_job_with};

/// Messages from a running job: any number of `Progress`, then exactly one `Done` or `Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobEvent {
    /// `current` is the 1-based slide being rendered.
    Progress { current: usize, total: usize },
    Done {
        buffer: Vec<u8>,
        extension: &'static str,
    },
    Error { message: String },
}

/// A job running on its own thread.
///
/// Dropping the handle (or just its receiver) cancels the job at the next progress report.
#[derive(Debug)]
pub struct JobHandle {
    events: Receiver<JobEvent>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Next event, blocking; `None` once the worker is gone.
    pub fn recv(&self) -> Option<JobEvent> {
        self.events.recv().ok()
    }

    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Stop listening and wait for the worker to notice and exit.
    pub fn cancel(self) {
        let Self { events, thread } = self;
        drop(events);
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }

    /// Drain events until the terminal one, calling `on_progress` along the way.
    pub fn wait(
        mut self,
        mut on_progress: impl FnMut(usize, usize),
    ) -> SlidecastResult<JobOutput> {
        let outcome = loop {
            match self.events.recv() {
                Ok(JobEvent::Progress { current, total }) => on_progress(current, total),
                Ok(JobEvent::Done { buffer, extension }) => {
                    break Ok(JobOutput { buffer, extension });
                }
                Ok(JobEvent::Error { message }) => break Err(SlidecastError::render(message)),
                Err(_) => break Err(SlidecastError::render("job worker exited without a result")),
            }
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome
    }
}

/// Run `job` on a dedicated worker thread with the `ffmpeg` encoders.
pub fn spawn_job(job: RenderJob) -> SlidecastResult<JobHandle> {
    spawn_job_with(job, Arc::new(FfmpegEncoders))
}

pub fn spawn_job_with(
    job: RenderJob,
    encoders: Arc<dyn EncoderFactory + Send + Sync>,
) -> SlidecastResult<JobHandle> {
    let (tx, events) = mpsc::channel();
    let thread = thread::Builder::new()
        .name("slidecast-job".to_owned())
        .spawn(move || run_worker(job, encoders.as_ref(), &tx))
        .context("failed to spawn job worker thread")?;
    Ok(JobHandle {
        events,
        thread: Some(thread),
    })
}

fn run_worker(job: RenderJob, encoders: &dyn EncoderFactory, tx: &Sender<JobEvent>) {
    let result = run_job_with(job, encoders, &mut |current, total| {
        tx.send(JobEvent::Progress { current, total })
            .map_err(|_| SlidecastError::render("job cancelled: event receiver dropped"))
    });
    let event = match result {
        Ok(out) => JobEvent::Done {
            buffer: out.buffer,
            extension: out.extension,
        },
        Err(err) => {
            tracing::warn!(error = %err, "job failed");
            JobEvent::Error {
                message: err.to_string(),
            }
        }
    };
    // The receiver may already be gone.
    let _ = tx.send(event);
}
