//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into share/subscribe use cases.
//! - Keep session and sync layers decoupled from storage details.

pub mod share_service;
