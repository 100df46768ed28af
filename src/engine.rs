// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use crate::EngineError;

/// Function exposed to script code under a global name.
///
/// Receives the string coercion of the first argument the script passed.
pub type HostFunction = Box<dyn FnMut(&str)>;

/// Final value of an evaluated script, already coerced to a string by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineValue {
	/// The last statement produced no value, or the value `undefined`.
	Undefined,

	/// String coercion of any other value (including `null`).
	Defined(String),
}

impl EngineValue {
	pub fn into_option(self) -> Option<String> {
		match self {
			EngineValue::Undefined => None,
			EngineValue::Defined(text) => Some(text),
		}
	}
}

/// Aborts a running evaluation from another thread.
pub trait InterruptHandle: Send + 'static {
	fn interrupt(&self);
}

/// A single, isolated script-evaluation context.
///
/// One engine is created per run and dropped afterwards, so implementations never need to reset state.
pub trait ScriptEngine {
	type Interrupt: InterruptHandle;

	/// Installs `function` under `name` in the global scope.
	///
	/// Dotted names such as `console.log` create (or reuse) the intermediate objects.
	fn define_global(&mut self, name: &str, function: HostFunction) -> Result<(), EngineError>;

	/// Evaluates `source` as a classic script and returns the value of its last statement.
	fn evaluate(&mut self, source: &str) -> Result<EngineValue, EngineError>;

	/// Returns a handle which terminates the current evaluation when triggered.
	fn interrupt_handle(&mut self) -> Self::Interrupt;
}

/// Creates fresh engines, one for every run.
pub trait EngineFactory {
	type Engine: ScriptEngine;

	fn create(&self) -> Result<Self::Engine, EngineError>;
}
