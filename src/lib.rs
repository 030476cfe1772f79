// src/lib.rs

//! ECLI sitemap crawler library.
//!
//! Discovers root sitemap indexes from a robots listing, walks the two-level
//! sitemap tree, parses each entry into an [`models::EcliDocument`], and
//! ingests it into a deduplicating document store. Progress is checkpointed
//! so interrupted runs resume where they stopped.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
