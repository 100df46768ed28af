// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

/// Decides how captured output and the final value are collapsed into one result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputPolicy {
	/// Logged lines if there are any, otherwise the final value, otherwise the no-output sentinel.
	#[default]
	ConsoleFirst,

	/// Logged lines followed by `Result: <value>`.
	Transcript,
}

impl FromStr for OutputPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"console-first" => Ok(OutputPolicy::ConsoleFirst),
			"transcript" => Ok(OutputPolicy::Transcript),
			other => Err(format!(
				"unknown output policy `{other}` (expected `console-first` or `transcript`)"
			)),
		}
	}
}

impl fmt::Display for OutputPolicy {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			OutputPolicy::ConsoleFirst => f.write_str("console-first"),
			OutputPolicy::Transcript => f.write_str("transcript"),
		}
	}
}

/// Configuration for a [`ScriptRunner`](crate::ScriptRunner).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
	/// The maximum duration of a single run; `None` lets scripts run forever. Defaults to 5 seconds.
	#[serde_as(as = "Option<DurationMilliSeconds<u64>>", no_default)]
	pub max_execution_time: Option<Duration>,
	/// The hard limit for the engine heap in bytes; `None` keeps the engine default.
	pub max_heap_size: Option<usize>,
	pub output_policy: OutputPolicy,
}

impl RunnerConfig {
	pub const DEFAULT_EXECUTION_TIME: Duration = Duration::from_secs(5);

	/// Aborts every run after `timeout`.
	///
	/// Panics with a zero timeout; use [`Self::without_timeout()`] to disable the limit.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		assert!(timeout > Duration::ZERO);

		self.max_execution_time = Some(timeout);
		self
	}

	pub fn without_timeout(mut self) -> Self {
		self.max_execution_time = None;
		self
	}

	pub fn with_max_heap_size(mut self, max_heap_size: usize) -> Self {
		self.max_heap_size = Some(max_heap_size);
		self
	}

	pub fn with_output_policy(mut self, output_policy: OutputPolicy) -> Self {
		self.output_policy = output_policy;
		self
	}
}

impl Default for RunnerConfig {
	fn default() -> Self {
		Self {
			max_execution_time: Some(Self::DEFAULT_EXECUTION_TIME),
			max_heap_size: None,
			output_policy: OutputPolicy::default(),
		}
	}
}
