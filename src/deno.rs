// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

use deno_core::error::{AnyError, JsError};
use deno_core::futures::task::AtomicWaker;
use tokio::runtime::Runtime;
use deno_core::{op2, v8, JsRuntime, OpState, PollEventLoopOptions, RuntimeOptions};
use tracing::{error, warn};

use crate::{EngineError, EngineFactory, EngineValue, HostFunction, InterruptHandle, ScriptEngine};

/// Initial heap size handed to V8 whenever a maximum is configured.
const INITIAL_HEAP_SIZE: usize = 1_048_576;

/// Reported when the event loop is abandoned because the run was interrupted.
const TERMINATED_MESSAGE: &str = "Uncaught Error: execution terminated";

/// Host functions installed through [`ScriptEngine::define_global`], keyed by global name.
///
/// Lives in the runtime's `OpState`, so every engine has its own table.
#[derive(Default)]
struct HostFunctions(HashMap<String, HostFunction>);

#[op2(fast)]
fn op_host_call(state: &mut OpState, #[string] name: String, #[string] message: String) {
	let Some(functions) = state.try_borrow_mut::<HostFunctions>() else {
		error!("Host function table is missing from the op state.");
		return;
	};

	match functions.0.get_mut(&name) {
		Some(function) => function(&message),
		None => warn!(function = %name, "Script called an unknown host function."),
	}
}

deno_core::extension!(scratchpad_host, ops = [op_host_call]);

/// A V8 isolate (through `deno_core`) evaluating one script.
///
/// The runtime is dropped together with the engine, taking all script globals with it.
pub struct DenoEngine {
	runtime: JsRuntime,
	// Drives the event loop; script timers are tokio timers.
	event_loop: Runtime,
	heap_exhausted: Arc<AtomicBool>,
	interrupted: Arc<AtomicBool>,
	wakeup: Arc<AtomicWaker>,
}

impl DenoEngine {
	const DEFAULT_FILENAME: &'static str = "scratchpad.js";
	const BINDING_FILENAME: &'static str = "scratchpad:bindings";

	/// Initializes the V8 platform. Call once from the main thread, before any engine is created.
	///
	/// Creating an engine without calling this first still works; V8 is then initialized lazily.
	pub fn init_platform() {
		JsRuntime::init_platform(None, false);
	}

	/// Creates an isolate, optionally capped at `max_heap_size` bytes.
	pub fn new(max_heap_size: Option<usize>) -> Result<Self, EngineError> {
		let create_params = max_heap_size.map(|max_heap_size| {
			v8::Isolate::create_params()
				.heap_limits(INITIAL_HEAP_SIZE.min(max_heap_size), max_heap_size)
		});

		let event_loop = tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
			.map_err(|err| EngineError::Environment(err.to_string()))?;

		let mut runtime = JsRuntime::try_new(RuntimeOptions {
			extensions: vec![scratchpad_host::init_ops()],
			create_params,
			..Default::default()
		})
		.map_err(|err| EngineError::Environment(err.to_string()))?;

		runtime.op_state().borrow_mut().put(HostFunctions::default());

		let heap_exhausted = Arc::new(AtomicBool::new(false));
		if max_heap_size.is_some() {
			let heap_exhausted = heap_exhausted.clone();
			let isolate_handle = runtime.v8_isolate().thread_safe_handle();
			runtime.add_near_heap_limit_callback(move |current_value, _| {
				error!("Approaching the memory limit of ({current_value}), terminating execution.");

				isolate_handle.terminate_execution();
				heap_exhausted.store(true, Ordering::Relaxed);

				// Leave enough room for the termination itself.
				5 * current_value
			});
		}

		Ok(Self {
			runtime,
			event_loop,
			heap_exhausted,
			interrupted: Arc::new(AtomicBool::new(false)),
			wakeup: Arc::new(AtomicWaker::new()),
		})
	}
}

fn to_engine_error(err: AnyError, heap_exhausted: &AtomicBool) -> EngineError {
	if heap_exhausted.load(Ordering::Relaxed) {
		return EngineError::MemoryLimit;
	}

	match err.downcast::<JsError>() {
		Ok(js_error) => EngineError::Evaluation(js_error.exception_message),
		Err(other) => EngineError::Evaluation(other.to_string()),
	}
}

impl ScriptEngine for DenoEngine {
	type Interrupt = DenoInterrupt;

	fn define_global(&mut self, name: &str, function: HostFunction) -> Result<(), EngineError> {
		let binding_error = |reason: String| EngineError::Binding {
			name: name.to_owned(),
			reason,
		};

		if name.split('.').any(str::is_empty) {
			return Err(binding_error("empty path segment".to_owned()));
		}

		{
			let state_rc = self.runtime.op_state();
			let mut state = state_rc.borrow_mut();
			let functions = state
				.try_borrow_mut::<HostFunctions>()
				.ok_or_else(|| binding_error("host function table is missing".to_owned()))?;
			functions.0.insert(name.to_owned(), function);
		}

		// The op is captured once, so scripts that replace `Deno` cannot break the binding.
		let path = serde_json::to_string(name).map_err(|err| binding_error(err.to_string()))?;
		let js_code = format!(
			"(() => {{
				const path = {path};
				const keys = path.split('.');
				const last = keys.pop();
				let target = globalThis;
				for (const key of keys) {{
					if (typeof target[key] !== 'object' || target[key] === null)
						target[key] = {{}};
					target = target[key];
				}}

				const hostCall = Deno.core.ops.op_host_call;
				target[last] = function(message) {{
					hostCall(path, String(message));
				}};
			}})();"
		);

		self.runtime
			.execute_script(Self::BINDING_FILENAME, js_code)
			.map_err(|err| binding_error(err.to_string()))?;

		Ok(())
	}

	fn evaluate(&mut self, source: &str) -> Result<EngineValue, EngineError> {
		// Timers are registered with tokio while the script runs.
		let _context = self.event_loop.enter();

		let result = self
			.runtime
			.execute_script(Self::DEFAULT_FILENAME, source.to_owned());
		let value = result.map_err(|err| to_engine_error(err, &self.heap_exhausted))?;

		// Settle promise callbacks and timers queued by the script, so their logging is captured too.
		// Termination only stops running JS, so a loop idling on a timer has to watch for the interrupt itself.
		let runtime = &mut self.runtime;
		let (heap_exhausted, interrupted, wakeup) = (&self.heap_exhausted, &self.interrupted, &self.wakeup);
		let event_loop = poll_fn(|cx| {
			wakeup.register(cx.waker());
			if interrupted.load(Ordering::SeqCst) {
				return Poll::Ready(Err(EngineError::Evaluation(TERMINATED_MESSAGE.to_owned())));
			}

			runtime
				.poll_event_loop(cx, PollEventLoopOptions::default())
				.map_err(|err| to_engine_error(err, heap_exhausted))
		});
		self.event_loop.block_on(event_loop)?;

		let scope = &mut self.runtime.handle_scope();
		let local = v8::Local::new(scope, value);
		if local.is_undefined() {
			return Ok(EngineValue::Undefined);
		}

		// String(symbol) throws, but the console form `Symbol(desc)` is what users expect to see.
		let text = if local.is_symbol() {
			local.to_detail_string(scope)
		} else {
			local.to_string(scope)
		};

		match text {
			Some(text) => Ok(EngineValue::Defined(text.to_rust_string_lossy(scope))),
			None => Err(EngineError::Evaluation(
				"Uncaught TypeError: result cannot be converted to a string".to_owned(),
			)),
		}
	}

	fn interrupt_handle(&mut self) -> DenoInterrupt {
		DenoInterrupt {
			isolate: self.runtime.v8_isolate().thread_safe_handle(),
			interrupted: self.interrupted.clone(),
			wakeup: self.wakeup.clone(),
		}
	}
}

/// Stops a [`DenoEngine`] from any thread, whether it is running JavaScript or waiting in its event loop.
pub struct DenoInterrupt {
	isolate: v8::IsolateHandle,
	interrupted: Arc<AtomicBool>,
	wakeup: Arc<AtomicWaker>,
}

impl InterruptHandle for DenoInterrupt {
	fn interrupt(&self) {
		self.interrupted.store(true, Ordering::SeqCst);
		self.isolate.terminate_execution();
		self.wakeup.wake();
	}
}

/// Creates one [`DenoEngine`] per run.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenoFactory {
	max_heap_size: Option<usize>,
}

impl DenoFactory {
	pub fn new(max_heap_size: Option<usize>) -> Self {
		Self { max_heap_size }
	}
}

impl EngineFactory for DenoFactory {
	type Engine = DenoEngine;

	fn create(&self) -> Result<DenoEngine, EngineError> {
		DenoEngine::new(self.max_heap_size)
	}
}
