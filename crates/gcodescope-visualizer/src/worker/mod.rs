//! Background worker
//!
//! The controller talks to the worker only through the message protocol.
//! `ThreadWorker` is the bundled implementation: a dedicated thread that
//! tokenizes lines into layered commands and analyzes the resulting model.

pub mod analyzer;
pub mod protocol;
pub mod thread;
pub mod tokenizer;

pub use analyzer::analyze;
pub use protocol::*;
pub use thread::{
    reply_channel, GcodeWorker, ReplyReceiver, ReplySender, ThreadWorker, WorkerCore,
    REPLY_CHANNEL_CAPACITY,
};
pub use tokenizer::{ParsedModel, Tokenizer};
