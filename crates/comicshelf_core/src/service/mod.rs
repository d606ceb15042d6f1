//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into catalog workflows.
//! - Keep presentation layers decoupled from storage details.

pub mod comic_book_service;
