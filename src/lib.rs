//! Open badge recommendation engine — vector retrieval with generative ranking.
//!
//! `badgerec` recommends digital credentials ("badges") to users by combining
//! similarity search over a managed embedding index with a generative-model
//! reasoning pass. Badge and user records are preprocessed into stable text
//! blobs, embedded, and stored in two namespaces of a shared vector index;
//! recommendations are produced by retrieving candidate badges for a user,
//! excluding badges already acquired, and asking a generative model to rank
//! and justify the candidates under a strict JSON output contract.
//!
//! # Architecture
//!
//! - **Index**: an external vector index consumed through the
//!   [`index::VectorIndex`] capability trait (cosine metric, `badge` and
//!   `user` namespaces partitioned by id prefix)
//! - **Embeddings**: an external embedding service behind
//!   [`embedding::EmbeddingProvider`]
//! - **Generation**: an external chat model behind [`llm::GenerativeModel`],
//!   constrained to a JSON-only recommendation schema
//! - **Safety net**: deleted vectors are snapshotted to memory- or
//!   file-backed stores with a bounded restore window ([`backup`])
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`record`] — Badge/user data model, preprocessing, and record-kind detection
//! - [`embedding`] — Text-to-vector embedding capability
//! - [`index`] — Vector index capability and lifecycle management
//! - [`llm`] — Generative-model capability
//! - [`backup`] — Pre-delete vector snapshots with timed expiry and restore
//! - [`retrieve`] — Semantic and exact-id retrieval with exclusion filters
//! - [`recommend`] — Prompt construction, generation, and structured-output parsing
//! - [`engine`] — Application facade wiring the pipeline together

pub mod backup;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod llm;
pub mod recommend;
pub mod record;
pub mod retrieve;
