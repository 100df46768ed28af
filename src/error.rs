// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use thiserror::Error;

/// Represents an error reported by a script engine
#[derive(Debug, Error)]
pub enum EngineError {
	/// The evaluation context could not be constructed.
	#[error("failed to create JavaScript context: {0}")]
	Environment(String),

	/// The script failed to parse, or threw during execution.
	#[error("{0}")]
	Evaluation(String),

	/// Execution was stopped because the engine ran out of heap.
	#[error("Script exceeded memory limit.")]
	MemoryLimit,

	/// A host binding could not be installed.
	#[error("cannot define global `{name}`: {reason}")]
	Binding { name: String, reason: String },
}
