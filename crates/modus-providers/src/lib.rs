//! # modus-providers
//!
//! Model backends and request dispatch for Modus.

pub mod dispatcher;
mod http;
pub mod ollama;
pub mod openai;
pub mod retry;

pub use dispatcher::{check_ready, Dispatcher, StreamingGeneration};
