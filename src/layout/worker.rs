//! Runs box-line layout off the interaction thread.
//!
//! There is no cancel signal: every job carries the generation it was started
//! for, and the session drops results whose generation is no longer current.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::LayoutConfig;
use crate::error::{FlowError, Result};
use crate::graph::FlowGraph;
use crate::theme::Theme;

use super::boxline::{LayoutBackend, compute_boxline_layout};
use super::{BoxLineLayout, Viewport};

#[derive(Debug)]
pub enum JobPoll {
    Pending,
    Done(Result<BoxLineLayout>),
}

pub struct LayoutWorker {
    generation: u64,
    started: Instant,
    receiver: Receiver<Result<BoxLineLayout>>,
}

impl LayoutWorker {
    pub fn spawn(
        generation: u64,
        graph: Arc<FlowGraph>,
        backend: Arc<dyn LayoutBackend>,
        theme: Theme,
        config: LayoutConfig,
        viewport: Viewport,
        started: Instant,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result =
                compute_boxline_layout(&graph, backend.as_ref(), &theme, &config, viewport);
            // The receiver is gone when the job was superseded.
            let _ = sender.send(result);
        });
        Self {
            generation,
            started,
            receiver,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn try_recv(&self) -> JobPoll {
        match self.receiver.try_recv() {
            Ok(result) => JobPoll::Done(result),
            Err(TryRecvError::Empty) => JobPoll::Pending,
            Err(TryRecvError::Disconnected) => JobPoll::Done(Err(FlowError::Backend {
                message: "layout worker exited without a result".to_string(),
            })),
        }
    }

    /// Blocks until the job finishes or `budget` runs out.
    pub fn wait(self, budget: Duration) -> Result<BoxLineLayout> {
        match self.receiver.recv_timeout(budget) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(timeout_error(budget, budget)),
            Err(RecvTimeoutError::Disconnected) => Err(FlowError::Backend {
                message: "layout worker exited without a result".to_string(),
            }),
        }
    }
}

pub(crate) fn timeout_error(elapsed: Duration, budget: Duration) -> FlowError {
    FlowError::LayoutTimeout {
        elapsed_ms: elapsed.as_millis() as u64,
        budget_ms: budget.as_millis() as u64,
    }
}
