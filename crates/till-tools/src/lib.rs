//! # till-tools: Orchestration Bridge for Till POS
//!
//! The single-call bridge between an orchestrator (AI, CLI, or test) and
//! the transaction kernel: a declarative tool catalog with strict parameter
//! validation, and the in-process kernel client.
//!
//! ## Modules
//!
//! - [`definition`] - tool/parameter declarations and the normalized bag
//! - [`executor`] - the strict validate-then-invoke path
//! - [`client`] - the transport-neutral kernel surface (result envelopes)
//! - [`tools`] - the reference tool set (`start_transaction`, `add_item`,
//!   `pay`, `show`, `void_item`)
//!
//! The orchestrator contributes no financial logic: handlers delegate every
//! price to the store catalog and every total to the engine.

pub mod client;
pub mod definition;
pub mod executor;
pub mod tools;

pub use client::KernelClient;
pub use definition::{ParamType, ToolArgs, ToolDefinition, ToolParameter, ToolValue};
pub use executor::{ToolError, ToolExecutor, ToolHandler, ToolReply, ToolResult};
pub use tools::{register_reference_tools, ToolContext};
