//! # lev-eval
//!
//! An evaluation harness for tool-using language-model agents. A manifest
//! describes a set of MCP tool servers and a set of questions to ask a
//! solver model with those tools available; this crate drives the
//! propose/execute-tools/introspect loop for each question and scores the
//! resulting transcript with a configurable battery of scorers.
//!
//! ## Overview
//!
//! lev-eval can be used in two ways:
//!
//! 1. **As a standalone binary** — run the `lev-eval` CLI against a
//!    manifest file.
//! 2. **As a library** — embed the `Workflow`/`Runner` machinery in a
//!    larger Rust project with a custom `ModelClient` or `ResultSink`.
//!
//! ## Modules
//!
//! - [`transcript`] — the append-only conversation log shared by every
//!   agent, and its console-trace rendering.
//! - [`mcp`] — the stdio transport to MCP tool-server subprocesses, result
//!   normalization, and the registry that aggregates them.
//! - [`model`] — the `ModelClient` boundary and the reference
//!   OpenAI-compatible adapter.
//! - [`agent`] — `ToolAgent`, the stateful holder of a model, a system
//!   prompt, and a transcript.
//! - [`host`] — `Host`, which drives one agent through the
//!   propose/execute-tools/reprompt loop.
//! - [`introspector`] — the fail-open validation pass over a finished turn.
//! - [`workflow`] — `Workflow`, which composes a `Host` and an
//!   `Introspector` into the outer ask loop.
//! - [`scoring`] — the `Scorer` trait and its six implementations.
//! - [`judge`] — the critique/extract-value prompt templates shared by the
//!   LLM-backed scorers.
//! - [`manifest`] — the eval manifest schema and loader.
//! - [`profiles`] — provider-profile resolution (defaults → role override
//!   → model variant → environment variables).
//! - [`provider_registry`] — the role-keyed `ModelClient` registry.
//! - [`runner`] — drives every eval in a manifest through a fresh workflow
//!   and hands scored results to a `ResultSink`.
//! - [`telemetry`] — the CSV log of individual tool invocations.
//! - [`error`] — the harness's error type.
//! - [`cli`] — the `lev-eval` binary's command-line surface.

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Stateful model + transcript holder driving one conversation.
pub mod agent;
/// The `lev-eval` binary's command-line surface.
pub mod cli;
/// The harness's error type.
pub mod error;
/// Drives one agent through the propose/execute-tools/reprompt loop.
pub mod host;
/// Fail-open validation pass over a finished turn.
pub mod introspector;
/// Judge prompt templates shared by the LLM-backed scorers.
pub mod judge;
/// The eval manifest schema and loader.
pub mod manifest;
/// MCP client surface: transport, normalization, and registry.
pub mod mcp;
/// The `ModelClient` boundary and the reference OpenAI adapter.
pub mod model;
/// Provider-profile resolution.
pub mod profiles;
/// The role-keyed `ModelClient` registry.
pub mod provider_registry;
/// Drives every eval in a manifest through a fresh workflow.
pub mod runner;
/// The `Scorer` trait and its implementations.
pub mod scoring;
/// The CSV log of individual tool invocations.
pub mod telemetry;
/// The append-only conversation log.
pub mod transcript;
/// Composes a `Host` and an `Introspector` into the outer ask loop.
pub mod workflow;

pub use error::{HarnessError, Result};
pub use manifest::Manifest;
pub use runner::{EvalResult, Runner};
pub use workflow::Workflow;
