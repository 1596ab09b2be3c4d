//! Chest X-ray diagnosis service.
//!
//! Forwards an uploaded X-ray and follow-up questions to a generative AI
//! provider and returns the generated text, optionally keeping a history of
//! reports and Q&A in MongoDB.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
