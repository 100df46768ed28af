// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::watchdog::Watchdog;
use crate::{DenoFactory, EngineFactory, ExecutionResult, HostFunction, RunnerConfig, ScriptEngine};

/// Global name under which the logging binding is installed.
pub const CONSOLE_LOG: &str = "console.log";

/// Runs scripts, one fresh engine per call, and captures what they log.
///
/// A typical usage pattern is to create one runner and hand it every source text the user submits.
/// Nothing a script does is visible to later runs.
pub struct ScriptRunner<F = DenoFactory> {
	factory: F,
	config: RunnerConfig,
}

impl ScriptRunner<DenoFactory> {
	/// Creates a runner backed by V8.
	pub fn new(config: RunnerConfig) -> Self {
		Self::with_factory(DenoFactory::new(config.max_heap_size), config)
	}
}

impl Default for ScriptRunner<DenoFactory> {
	fn default() -> Self {
		Self::new(RunnerConfig::default())
	}
}

impl<F: EngineFactory> ScriptRunner<F> {
	/// Creates a runner which obtains its engines from `factory`.
	///
	/// `config.max_heap_size` is not applied here, the factory is expected to be configured already.
	pub fn with_factory(factory: F, config: RunnerConfig) -> Self {
		Self { factory, config }
	}

	pub fn config(&self) -> &RunnerConfig {
		&self.config
	}

	/// Executes `source` and reports what it logged or evaluated to.
	///
	/// Blocks until the script completes, throws, or runs into the configured timeout. Never panics on script errors.
	pub fn run(&self, source: &str) -> ExecutionResult {
		let result = self.run_impl(source);
		debug!(
			source_len = source.len(),
			kind = result.kind(),
			"Script run completed."
		);

		result
	}

	fn run_impl(&self, source: &str) -> ExecutionResult {
		let mut engine = match self.factory.create() {
			Ok(engine) => engine,
			Err(err) => {
				error!("Unable to create script engine: {err}");
				return ExecutionResult::EnvironmentFailure;
			}
		};

		let console = ConsoleBuffer::default();
		if let Err(err) = engine.define_global(CONSOLE_LOG, console.host_function()) {
			error!("Unable to install the logging binding: {err}");
			return ExecutionResult::EnvironmentFailure;
		}

		let watchdog = self
			.config
			.max_execution_time
			.map(|timeout| Watchdog::arm(timeout, engine.interrupt_handle()));

		let outcome = engine.evaluate(source);
		let timed_out = watchdog.map_or(false, Watchdog::disarm);

		drop(engine);
		let lines = console.take_lines();

		match outcome {
			Ok(value) => ExecutionResult::completed(self.config.output_policy, lines, value),
			Err(_) if timed_out => {
				let timeout_ms = self.config.max_execution_time.map_or(0, timeout_ms);
				warn!(timeout_ms, "Script exceeded time limit, execution terminated.");

				ExecutionResult::TimedOut { lines, timeout_ms }
			}
			Err(err) => ExecutionResult::EvaluationFailure {
				lines,
				message: err.to_string(),
			},
		}
	}
}

/// Whole milliseconds of `timeout`, saturating at `u64::MAX`.
fn timeout_ms(timeout: Duration) -> u64 {
	u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Messages logged by the script during one run.
#[derive(Clone, Default)]
struct ConsoleBuffer {
	lines: Rc<RefCell<Vec<String>>>,
}

impl ConsoleBuffer {
	fn host_function(&self) -> HostFunction {
		let lines = self.lines.clone();
		Box::new(move |message: &str| lines.borrow_mut().push(message.to_owned()))
	}

	fn take_lines(&self) -> Vec<String> {
		self.lines.take()
	}
}
