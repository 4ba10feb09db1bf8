//! # Burn Finetune
//!
//! Prepares labeled text for BERT-style classifiers, including the expansion of word tags to
//! wordpiece tags, and drives a fine-tuning loop with accuracy and F1 reporting.
#![forbid(unsafe_code)]

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

/// Error macros
#[macro_use]
extern crate anyhow;

/// Logging macros
#[macro_use]
extern crate log;
