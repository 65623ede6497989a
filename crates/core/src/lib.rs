//! Core library: audio discovery, analysis with retry, reply parsing,
//! categorisation, file organisation and the per-file pipeline.

pub mod category;
pub mod classifier;
pub mod config;
pub mod models;
pub mod organizer;
pub mod pipeline;
pub mod response;
pub mod scanner;
