// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::fmt;

use serde::Serialize;

use crate::{EngineValue, OutputPolicy};

/// Shown when a script neither logs anything nor evaluates to a defined value.
pub const NO_OUTPUT: &str = "No Output or undefined";

/// Shown when no engine could be created for the run.
pub const CONTEXT_FAILURE: &str = "Failed to create JavaScript context.";

/// Shown by the transcript policy when there is neither output nor a value.
pub const TRANSCRIPT_NO_OUTPUT: &str = "No Output";

/// Outcome of a single script run.
///
/// Every variant collapses into one display string through its [`Display`](fmt::Display) implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResult {
	/// The script logged at least one line. Any final value is discarded.
	ConsoleOutput { lines: Vec<String> },

	/// Nothing was logged, and the script evaluated to a defined value.
	EvaluationValue { text: String },

	/// Nothing was logged, and the final value was `undefined`.
	NoOutput,

	/// Logged lines and the final value side by side, see [`OutputPolicy::Transcript`].
	Transcript { lines: Vec<String>, value: Option<String> },

	/// The script failed to parse, or threw.
	EvaluationFailure { lines: Vec<String>, message: String },

	/// The script ran longer than the configured limit and was terminated.
	TimedOut { lines: Vec<String>, timeout_ms: u64 },

	/// No engine could be created, the script never ran.
	EnvironmentFailure,
}

impl ExecutionResult {
	/// Builds the result of a completed evaluation according to `policy`.
	pub fn completed(policy: OutputPolicy, lines: Vec<String>, value: EngineValue) -> Self {
		match policy {
			OutputPolicy::ConsoleFirst => {
				if !lines.is_empty() {
					return ExecutionResult::ConsoleOutput { lines };
				}

				match value {
					EngineValue::Defined(text) => ExecutionResult::EvaluationValue { text },
					EngineValue::Undefined => ExecutionResult::NoOutput,
				}
			}
			OutputPolicy::Transcript => {
				let value = value
					.into_option()
					.filter(|text| !text.is_empty() && text != "undefined");

				ExecutionResult::Transcript { lines, value }
			}
		}
	}

	/// `false` for failures, timeouts and a missing engine.
	pub fn is_success(&self) -> bool {
		!matches!(
			self,
			ExecutionResult::EvaluationFailure { .. }
				| ExecutionResult::TimedOut { .. }
				| ExecutionResult::EnvironmentFailure
		)
	}

	/// Short name of the variant, for diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			ExecutionResult::ConsoleOutput { .. } => "console_output",
			ExecutionResult::EvaluationValue { .. } => "evaluation_value",
			ExecutionResult::NoOutput => "no_output",
			ExecutionResult::Transcript { .. } => "transcript",
			ExecutionResult::EvaluationFailure { .. } => "evaluation_failure",
			ExecutionResult::TimedOut { .. } => "timed_out",
			ExecutionResult::EnvironmentFailure => "environment_failure",
		}
	}
}

impl fmt::Display for ExecutionResult {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ExecutionResult::ConsoleOutput { lines } => f.write_str(&join_lines(lines)),
			ExecutionResult::EvaluationValue { text } => f.write_str(text),
			ExecutionResult::NoOutput => f.write_str(NO_OUTPUT),
			ExecutionResult::Transcript { lines, value } => {
				let mut text = join_lines(lines);
				if let Some(value) = value {
					if !text.is_empty() {
						text.push_str("\n\n");
					}
					text.push_str("Result: ");
					text.push_str(value);
				}

				if text.is_empty() {
					f.write_str(TRANSCRIPT_NO_OUTPUT)
				} else {
					f.write_str(&text)
				}
			}
			ExecutionResult::EvaluationFailure { lines, message } => {
				write_after_lines(f, lines, message)
			}
			ExecutionResult::TimedOut { lines, timeout_ms } => write_after_lines(
				f,
				lines,
				&format!("Script execution timed out after {timeout_ms} ms."),
			),
			ExecutionResult::EnvironmentFailure => f.write_str(CONTEXT_FAILURE),
		}
	}
}

/// One line per logged message, trailing whitespace trimmed.
fn join_lines(lines: &[String]) -> String {
	lines.join("\n").trim_end().to_owned()
}

fn write_after_lines(f: &mut fmt::Formatter, lines: &[String], message: &str) -> fmt::Result {
	let output = join_lines(lines);
	if output.is_empty() {
		f.write_str(message)
	} else {
		write!(f, "{output}\n{message}")
	}
}
