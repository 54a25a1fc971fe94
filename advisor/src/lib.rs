//! Pathway Advisor - career-prep assistant backend
//!
//! This crate provides the backend server for the advisor: a knowledge
//! actor that keeps an external vector index fresh from the internship
//! listing document, and a chat API that retrieves context from it.

pub mod actors;
pub mod api;
pub mod app_state;
pub mod completion;
pub mod config;
pub mod knowledge;
