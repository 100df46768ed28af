// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use js_scratchpad::{
	EngineError, EngineFactory, EngineValue, ExecutionResult, HostFunction, InterruptHandle, ScriptEngine,
};

/// Engine with a line-based command language instead of JavaScript:
///
/// * `log <text>` calls `console.log(text)`
/// * `value <text>` makes `text` the final value
/// * `throw <text>` fails with `text`
/// * `oom` fails as if the heap limit was reached
/// * `hang` spins until interrupted
pub struct FakeEngine {
	globals: HashMap<String, HostFunction>,
	interrupted: Arc<AtomicBool>,
	evaluations: Rc<Cell<usize>>,
}

impl ScriptEngine for FakeEngine {
	type Interrupt = FakeInterrupt;

	fn define_global(&mut self, name: &str, function: HostFunction) -> Result<(), EngineError> {
		self.globals.insert(name.to_owned(), function);
		Ok(())
	}

	fn evaluate(&mut self, source: &str) -> Result<EngineValue, EngineError> {
		self.evaluations.set(self.evaluations.get() + 1);

		let mut value = EngineValue::Undefined;
		for line in source.lines().map(str::trim).filter(|line| !line.is_empty()) {
			let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
			match command {
				"log" => {
					let log = self
						.globals
						.get_mut("console.log")
						.ok_or_else(|| EngineError::Evaluation("ReferenceError: console is not defined".into()))?;
					log(arg);
				}
				"value" => value = EngineValue::Defined(arg.to_owned()),
				"throw" => return Err(EngineError::Evaluation(arg.to_owned())),
				"oom" => return Err(EngineError::MemoryLimit),
				"hang" => {
					while !self.interrupted.load(Ordering::SeqCst) {
						thread::sleep(Duration::from_millis(1));
					}
					return Err(EngineError::Evaluation("Uncaught Error: execution terminated".into()));
				}
				other => return Err(EngineError::Evaluation(format!("SyntaxError: unknown command {other}"))),
			}
		}

		Ok(value)
	}

	fn interrupt_handle(&mut self) -> FakeInterrupt {
		FakeInterrupt(self.interrupted.clone())
	}
}

pub struct FakeInterrupt(Arc<AtomicBool>);

impl InterruptHandle for FakeInterrupt {
	fn interrupt(&self) {
		self.0.store(true, Ordering::SeqCst);
	}
}

/// Counts created engines and evaluations, and can simulate an unavailable engine.
#[derive(Default)]
pub struct FakeFactory {
	pub unavailable: bool,
	pub created: Rc<Cell<usize>>,
	pub evaluations: Rc<Cell<usize>>,
}

impl FakeFactory {
	pub fn unavailable() -> Self {
		Self {
			unavailable: true,
			..Default::default()
		}
	}
}

impl EngineFactory for FakeFactory {
	type Engine = FakeEngine;

	fn create(&self) -> Result<FakeEngine, EngineError> {
		if self.unavailable {
			return Err(EngineError::Environment("out of memory".into()));
		}

		self.created.set(self.created.get() + 1);
		Ok(FakeEngine {
			globals: HashMap::new(),
			interrupted: Arc::new(AtomicBool::new(false)),
			evaluations: self.evaluations.clone(),
		})
	}
}

pub fn expect_failure(result: &ExecutionResult, expected_message: &str) {
	match result {
		ExecutionResult::EvaluationFailure { message, .. } => {
			assert!(
				message.contains(expected_message),
				"Failure message {message:?} must contain {expected_message:?}"
			);
			println!("Expected error occurred:\n{message}");
		}
		other => panic!("Script must fail with {expected_message:?}, got {other:?}"),
	}
}
