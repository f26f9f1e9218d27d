//! Clients for asynchronous media-generation APIs.
//!
//! Each vendor follows the same protocol: submit a task, poll its status until
//! it reaches a terminal state, then download the produced artifact. This crate
//! provides that protocol once ([`poll::wait_for_task`] over a [`TaskSource`])
//! and a thin client per vendor:
//!
//! - [`ark::ArkClient`] for Volcano Ark video generation.
//! - [`jimeng::JimengClient`] for Jimeng video products on Volcano Visual.
//! - [`topview::TopviewClient`] for TopView avatar videos, with its upload pre-flight.
//! - [`gemini::GeminiClient`] for synchronous Gemini image generation.
//!
//! ## Features
//! - Vendor statuses normalized through per-vendor tables into [`TaskState`].
//! - Explicit per-vendor polling policies, including retry of failed queries.
//! - Streamed artifact downloads that never leave a partial file behind.
//! - A shared credential file with environment overrides.

pub mod ark;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod gemini;
mod http;
pub mod jimeng;
pub mod models;
pub mod poll;
pub mod task;
pub mod topview;
pub mod types;
pub mod volc_sign;

pub use download::download_artifact;
pub use error::{MediaError, Result};
pub use poll::{ErrorPolicy, PollPolicy, TaskSource};
pub use task::{StatusTable, Task, TaskState};
pub use types::{InlineMedia, MediaSlot, MediaSource};
