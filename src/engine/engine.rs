use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::engine::pipeline::CommentaryPipeline;
use crate::engine::protocol::{EngineCommand, EngineResponse};

/// Serves pipeline invocations for a UI. Each command runs in its own task,
/// so a slow report never holds up a narrative request.
pub struct Engine {
    rx: UnboundedReceiver<EngineCommand>,
    tx: UnboundedSender<EngineResponse>,
    pipeline: CommentaryPipeline,
    in_flight: JoinSet<()>,
    closed: bool,
}

impl Engine {
    pub fn new(
        rx: UnboundedReceiver<EngineCommand>,
        tx: UnboundedSender<EngineResponse>,
        pipeline: CommentaryPipeline,
    ) -> Self {
        Self {
            rx,
            tx,
            pipeline,
            in_flight: JoinSet::new(),
            closed: false,
        }
    }

    /// Runs until the command channel closes and every in-flight request has replied.
    pub async fn run(mut self) {
        while self.step().await {}
    }

    /// Handle one thing: a new command or a finished task.
    /// Returns false once the channel is closed and nothing is left in flight.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            cmd = self.rx.recv(), if !self.closed => {
                match cmd {
                    Some(cmd) => self.dispatch(cmd),
                    None => self.closed = true,
                }
                true
            }
            Some(joined) = self.in_flight.join_next() => {
                log_join(joined);
                true
            }
            else => false,
        }
    }

    /// Tasks spawned but not yet collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn dispatch(&mut self, cmd: EngineCommand) {
        let pipeline = self.pipeline.clone();
        let tx = self.tx.clone();

        self.in_flight.spawn(async move {
            let response = handle(&pipeline, cmd).await;
            if tx.send(response).is_err() {
                debug!("response receiver dropped");
            }
        });
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "engine task failed");
    }
}

async fn handle(pipeline: &CommentaryPipeline, cmd: EngineCommand) -> EngineResponse {
    match cmd {
        EngineCommand::Narrate {
            request_id,
            event,
            tone,
            focus_player,
        } => {
            let result = pipeline
                .narrate_two_stage(&event, &tone, &focus_player)
                .await
                .map_err(|e| e.to_string());
            EngineResponse::Narrative { request_id, result }
        }

        EngineCommand::MatchReport {
            request_id,
            events,
            tone,
        } => {
            let report = pipeline.match_report(&events, &tone).await;
            EngineResponse::MatchReport { request_id, report }
        }
    }
}
