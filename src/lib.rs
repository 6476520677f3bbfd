#![deny(missing_docs)]

//! Core library for the paper summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extraction;
/// In-memory similarity index over document chunks.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Summary pipeline metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Structured progress events and observers.
pub mod progress;
/// Remote summarization clients and prompt budgeting.
pub mod summarization;
