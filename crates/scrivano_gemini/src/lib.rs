//! Google Gemini backend for the scrivano dispatch core.
//!
//! Provides [`GeminiBackend`], a [`GenerationBackend`](scrivano_dispatch::GenerationBackend)
//! speaking the `generateContent` REST protocol, and [`TextGenerator`], the
//! high-level facade applications call: one method in, rate-limited and
//! retried text out.
//!
//! Non-2xx responses and defective success bodies are classified into the
//! dispatch taxonomy so the dispatcher can decide between retrying,
//! rotating credentials, and surfacing the failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod client;
pub mod dto;
mod generator;

pub use client::GeminiBackend;
pub use generator::TextGenerator;
