//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into roster use-cases.
//! - Keep CLI layers decoupled from storage details.

pub mod roster_service;
