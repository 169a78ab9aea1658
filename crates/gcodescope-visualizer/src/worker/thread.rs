//! Worker handle and the reference background worker

use gcodescope_core::PipelineError;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::analyzer::analyze;
use super::protocol::{
    Envelope, LayerPayload, MultiLayerPayload, MultiZHeights, ProgressPayload, WorkerReply,
    WorkerRequest, ZHeightEntry,
};
use super::tokenizer::{ParsedModel, Tokenizer};

/// Capacity of the reply channel between worker and controller
pub const REPLY_CHANNEL_CAPACITY: usize = 256;

pub type ReplySender = mpsc::Sender<Envelope<WorkerReply>>;
pub type ReplyReceiver = mpsc::Receiver<Envelope<WorkerReply>>;

/// Create the bounded channel a worker replies on
pub fn reply_channel() -> (ReplySender, ReplyReceiver) {
    mpsc::channel(REPLY_CHANNEL_CAPACITY)
}

/// Handle to a background worker
///
/// Posting is fire-and-forget; replies arrive on the channel handed to the
/// worker when it was created, stamped with the request's generation.
pub trait GcodeWorker: Send {
    fn post(&mut self, generation: u64, request: WorkerRequest) -> Result<(), PipelineError>;
}

/// Request handling shared by every worker flavour
#[derive(Debug, Default)]
pub struct WorkerCore {
    parsed: Option<ParsedModel>,
}

impl WorkerCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one request, emitting its replies in order
    pub fn handle(
        &mut self,
        envelope: Envelope<WorkerRequest>,
        emit: &mut dyn FnMut(Envelope<WorkerReply>),
    ) {
        let generation = envelope.generation;
        match envelope.body {
            WorkerRequest::ParseGCode(request) => {
                let first_report = request.options.first_report;
                let parsed = Tokenizer::parse(request.options, &request.gcode);
                for reply in layer_replies(&parsed, first_report) {
                    emit(Envelope::new(generation, reply));
                }
                emit(Envelope::new(generation, WorkerReply::ReturnModel));
                self.parsed = Some(parsed);
            }
            WorkerRequest::AnalyzeModel {} => {
                let Some(parsed) = self.parsed.as_ref() else {
                    warn!("analyzeModel received before any parse");
                    return;
                };
                let info = analyze(parsed, |progress| {
                    emit(Envelope::new(
                        generation,
                        WorkerReply::AnalyzeProgress(ProgressPayload { progress }),
                    ))
                });
                emit(Envelope::new(generation, WorkerReply::AnalyzeDone(Box::new(info))));
            }
        }
    }
}

/// Split parsed layers into one multi-layer batch followed by single layers
fn layer_replies(parsed: &ParsedModel, first_report: usize) -> Vec<WorkerReply> {
    let split = first_report.min(parsed.layers.len());
    let (batch, rest) = parsed.layers.split_at(split);

    let mut replies = Vec::with_capacity(rest.len() + 1);
    if !batch.is_empty() {
        replies.push(WorkerReply::ReturnMultiLayer(MultiLayerPayload {
            layer_num: batch.iter().map(|l| l.source_number).collect(),
            model: batch
                .iter()
                .map(|l| (l.source_number, l.commands.clone()))
                .collect(),
            z_height_object: MultiZHeights {
                z_value: batch.iter().map(|l| l.z).collect(),
            },
        }));
    }
    replies.extend(rest.iter().map(|layer| {
        WorkerReply::ReturnLayer(LayerPayload {
            layer_num: layer.source_number,
            cmds: layer.commands.clone(),
            z_height_object: ZHeightEntry {
                z_value: layer.z,
                layer: layer.source_number,
            },
        })
    }));
    replies
}

/// Reference worker running on a dedicated thread
///
/// The thread exits once the handle is dropped or the reply channel closes.
pub struct ThreadWorker {
    requests: mpsc::UnboundedSender<Envelope<WorkerRequest>>,
}

impl ThreadWorker {
    pub fn spawn(replies: ReplySender) -> std::io::Result<Self> {
        let (requests, mut inbox) = mpsc::unbounded_channel::<Envelope<WorkerRequest>>();

        thread::Builder::new()
            .name("gcode-worker".to_string())
            .spawn(move || {
                let mut core = WorkerCore::new();
                while let Some(envelope) = inbox.blocking_recv() {
                    debug!(
                        "Worker handling {} (generation {})",
                        envelope.body.tag(),
                        envelope.generation
                    );
                    let mut closed = false;
                    core.handle(envelope, &mut |reply| {
                        if !closed && replies.blocking_send(reply).is_err() {
                            closed = true;
                        }
                    });
                    if closed {
                        debug!("Reply channel closed, worker exiting");
                        return;
                    }
                }
                debug!("Request channel closed, worker exiting");
            })?;

        info!("Background worker started");
        Ok(Self { requests })
    }
}

impl GcodeWorker for ThreadWorker {
    fn post(&mut self, generation: u64, request: WorkerRequest) -> Result<(), PipelineError> {
        self.requests
            .send(Envelope::new(generation, request))
            .map_err(|_| PipelineError::WorkerDisconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::split_lines;
    use crate::worker::protocol::{ParseOptions, ParseRequest};

    fn parse_request(text: &str, first_report: usize) -> WorkerRequest {
        WorkerRequest::ParseGCode(ParseRequest {
            gcode: split_lines(text),
            options: ParseOptions {
                first_report,
                ..Default::default()
            },
        })
    }

    fn run(core: &mut WorkerCore, generation: u64, request: WorkerRequest) -> Vec<WorkerReply> {
        let mut out = Vec::new();
        core.handle(Envelope::new(generation, request), &mut |reply| {
            assert_eq!(reply.generation, generation);
            out.push(reply.body);
        });
        out
    }

    const THREE_LAYERS: &str = "G1 Z0.2\nG1 X1 E1\nG1 Z0.4\nG1 X2 E2\nG1 Z0.6\nG1 X3 E3\n";

    #[test]
    fn test_parse_reply_sequence() {
        let mut core = WorkerCore::new();
        let replies = run(&mut core, 3, parse_request(THREE_LAYERS, 2));
        let tags: Vec<_> = replies.iter().map(WorkerReply::tag).collect();
        assert_eq!(tags, vec!["returnMultiLayer", "returnLayer", "returnModel"]);

        match &replies[0] {
            WorkerReply::ReturnMultiLayer(batch) => {
                assert_eq!(batch.layer_num, vec![0, 1]);
                assert_eq!(batch.z_height_object.z_value, vec![0.2, 0.4]);
            }
            other => panic!("unexpected {}", other.tag()),
        }
    }

    #[test]
    fn test_first_report_zero_sends_single_layers() {
        let mut core = WorkerCore::new();
        let replies = run(&mut core, 1, parse_request(THREE_LAYERS, 0));
        assert_eq!(replies.len(), 4);
        assert!(replies[..3]
            .iter()
            .all(|r| matches!(r, WorkerReply::ReturnLayer(_))));
    }

    #[test]
    fn test_analyze_after_parse() {
        let mut core = WorkerCore::new();
        run(&mut core, 1, parse_request(THREE_LAYERS, 5));
        let replies = run(&mut core, 1, WorkerRequest::AnalyzeModel {});
        assert!(matches!(replies.last(), Some(WorkerReply::AnalyzeDone(_))));
        assert!(replies[..replies.len() - 1]
            .iter()
            .all(|r| matches!(r, WorkerReply::AnalyzeProgress(_))));
    }

    #[test]
    fn test_analyze_without_parse_is_ignored() {
        let mut core = WorkerCore::new();
        assert!(run(&mut core, 1, WorkerRequest::AnalyzeModel {}).is_empty());
    }

    #[test]
    fn test_thread_worker_round_trip() {
        let (tx, mut rx) = reply_channel();
        let mut worker = ThreadWorker::spawn(tx).unwrap();
        worker.post(9, parse_request(THREE_LAYERS, 5)).unwrap();

        let first = rx.blocking_recv().unwrap();
        assert_eq!(first.generation, 9);
        assert_eq!(first.body.tag(), "returnMultiLayer");
        assert_eq!(rx.blocking_recv().unwrap().body, WorkerReply::ReturnModel);
    }
}
