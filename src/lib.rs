// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

//! `js-scratchpad` executes JavaScript snippets and reports what they printed. It is based on the [Deno] project's
//! `deno_core`, so every snippet runs in its own V8 isolate.
//!
//! The typical use case is a scratch pad front end: the user types some code, presses "Run", and sees either the
//! lines the code logged through `console.log()`, or the value of its last expression.
//!
//! Every run starts from a fresh engine. Variables defined by one snippet are gone for the next one.
//!
//! # Examples
//!
//! ## Print from JavaScript
//!
//! ```rust
//! let output = js_scratchpad::run_script("console.log('Hello, world!');");
//!
//! assert_eq!(output, "Hello, world!");
//! ```
//!
//! ## Show the value of an expression
//!
//! When nothing is logged, the string form of the last expression is returned:
//!
//! ```rust
//! assert_eq!(js_scratchpad::run_script("1 + 1;"), "2");
//! assert_eq!(js_scratchpad::run_script(""), js_scratchpad::NO_OUTPUT);
//! ```
//!
//! ## Configure the runner
//!
//! Scripts may loop forever. A [`ScriptRunner`] terminates them after a timeout (5 seconds by default):
//!
//! ```rust
//! use std::time::Duration;
//! use js_scratchpad::{ExecutionResult, RunnerConfig, ScriptRunner};
//!
//! let config = RunnerConfig::default().with_timeout(Duration::from_millis(100));
//! let runner = ScriptRunner::new(config);
//!
//! let result = runner.run("console.log('start'); for (;;) {}");
//!
//! assert!(matches!(result, ExecutionResult::TimedOut { .. }));
//! assert_eq!(result.to_string(), "start\nScript execution timed out after 100 ms.");
//! ```
//!
//! ## Plug in another engine
//!
//! The runner only talks to the [`ScriptEngine`] and [`EngineFactory`] traits, so tests and other front ends can
//! substitute their own interpreter through [`ScriptRunner::with_factory()`].
//!
//! [Deno]: https://deno.land

pub use config::{OutputPolicy, RunnerConfig};
pub use deno::{DenoEngine, DenoFactory, DenoInterrupt};
pub use engine::{EngineFactory, EngineValue, HostFunction, InterruptHandle, ScriptEngine};
pub use error::EngineError;
pub use result::{ExecutionResult, CONTEXT_FAILURE, NO_OUTPUT, TRANSCRIPT_NO_OUTPUT};
pub use runner::{ScriptRunner, CONSOLE_LOG};
pub use util::run_script;

mod config;
mod deno;
mod engine;
mod error;
mod result;
mod runner;
mod util;
mod watchdog;
