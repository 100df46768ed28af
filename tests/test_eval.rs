// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use js_scratchpad::{run_script, ExecutionResult, OutputPolicy, RunnerConfig, ScriptRunner, NO_OUTPUT};
use util::expect_failure;

mod util;

#[test]
fn console_log() {
	assert_eq!(run_script("console.log('Hello, world!');"), "Hello, world!");
}

#[test]
fn console_log_many() {
	let src = r#"
	for (const word of ["one", "two", "three"]) {
		console.log(word);
	}
	console.log("  ");"#;

	assert_eq!(run_script(src), "one\ntwo\nthree");
}

#[test]
fn console_log_coerces_argument() {
	assert_eq!(run_script("console.log(42); console.log({a: 1}); console.log();"), "42\n[object Object]\nundefined");
}

#[test]
fn expression() {
	assert_eq!(run_script("1+1;"), "2");
	assert_eq!(run_script("({a: 43, b: 12}).b - 2"), "10");
	assert_eq!(run_script("'multi' + 'ple'"), "multiple");
	assert_eq!(run_script("[1, 2, 3]"), "1,2,3");
	assert_eq!(run_script("null"), "null");
	assert_eq!(run_script("Symbol('tag')"), "Symbol(tag)");
}

#[test]
fn log_beats_value() {
	assert_eq!(run_script("console.log('a'); 5;"), "a");
}

#[test]
fn no_output() {
	assert_eq!(run_script(""), NO_OUTPUT);
	assert_eq!(run_script("var x = 3;"), NO_OUTPUT);
	assert_eq!(run_script("undefined"), NO_OUTPUT);
	assert_eq!(run_script("function f() {}"), NO_OUTPUT);
}

#[test]
fn promise_callbacks_are_captured() {
	assert_eq!(run_script("Promise.resolve('later').then((v) => console.log(v));"), "later");
}

#[test]
fn no_state_between_runs() {
	let runner = ScriptRunner::default();

	assert_eq!(runner.run("globalThis.leaked = 1; var counter = 1; counter"), ExecutionResult::EvaluationValue { text: "1".into() });
	assert_eq!(runner.run("typeof leaked + ',' + typeof counter").to_string(), "undefined,undefined");
}

#[test]
fn idempotent() {
	let runner = ScriptRunner::default();
	let src = "console.log([3, 1, 2].sort().join('-'));";

	assert_eq!(runner.run(src), runner.run(src));
}

#[test]
fn console_can_be_replaced_by_script() {
	assert_eq!(run_script("console = { log() {} }; console.log('hidden'); 'value'"), "value");
}

#[test]
fn syntax_error() {
	let result = ScriptRunner::default().run("({a: 43, b: 12})..b - 2");

	expect_failure(&result, "SyntaxError");
}

#[test]
fn runtime_exception() {
	let result = ScriptRunner::default().run("console.log('before'); undefinedFunction();");

	expect_failure(&result, "Uncaught ReferenceError: undefinedFunction is not defined");
	assert_matches!(&result, ExecutionResult::EvaluationFailure { lines, .. } if lines == &["before"]);
	assert!(result.to_string().starts_with("before\nUncaught ReferenceError"));
}

#[test]
fn thrown_string() {
	let result = ScriptRunner::default().run("throw 'string_error';");

	expect_failure(&result, "string_error");
}

#[test]
fn unhandled_rejection() {
	let result = ScriptRunner::default().run("Promise.reject(new Error('rejected'));");

	expect_failure(&result, "rejected");
}

#[test]
fn timeout() {
	let timeout = Duration::from_millis(200);
	let expected_stop_time = Duration::from_millis(1000);

	let runner = ScriptRunner::new(RunnerConfig::default().with_timeout(timeout));

	let start = Instant::now();
	let result = runner.run("console.log('looping'); for(;;){}");
	let duration = start.elapsed();

	assert_eq!(
		result,
		ExecutionResult::TimedOut {
			lines: vec!["looping".into()],
			timeout_ms: 200,
		}
	);
	assert!(
		duration >= timeout,
		"Terminates before the specified timeout (at {}ms)",
		duration.as_millis()
	);
	assert!(
		duration < timeout + expected_stop_time,
		"Took longer than {}ms to terminate (stopped at {}ms)",
		expected_stop_time.as_millis(),
		duration.as_millis()
	);
}

#[test]
fn timeout_while_waiting_on_timer() {
	let timeout = Duration::from_millis(200);
	let expected_stop_time = Duration::from_millis(1000);

	let runner = ScriptRunner::new(RunnerConfig::default().with_timeout(timeout));

	let start = Instant::now();
	let result = runner.run("console.log('waiting'); Deno.core.queueUserTimer(0, false, 60000, () => console.log('fired'));");
	let duration = start.elapsed();

	assert_eq!(
		result,
		ExecutionResult::TimedOut {
			lines: vec!["waiting".into()],
			timeout_ms: 200,
		}
	);
	assert!(
		duration < timeout + expected_stop_time,
		"Took longer than {}ms to terminate (stopped at {}ms)",
		expected_stop_time.as_millis(),
		duration.as_millis()
	);
}

#[test]
fn short_timer_completes() {
	let result = ScriptRunner::default().run("Deno.core.queueUserTimer(0, false, 10, () => console.log('fired'));");

	assert_eq!(result.to_string(), "fired");
}

#[test]
fn memory_limit() {
	let runner = ScriptRunner::new(RunnerConfig::default().with_max_heap_size(10 * 1024 * 1024));

	let src = r#"
	const chunks = [];
	for (;;) {
		chunks.push(new Array(100000).fill("memory"));
	}"#;
	let result = runner.run(src);

	expect_failure(&result, "Script exceeded memory limit.");

	// The process survives, and the next run gets a healthy engine.
	assert_eq!(runner.run("1 + 1").to_string(), "2");
}

#[test]
fn transcript_policy() {
	let runner = ScriptRunner::new(RunnerConfig::default().with_output_policy(OutputPolicy::Transcript));

	assert_eq!(runner.run("console.log('a'); 2 + 3").to_string(), "a\n\nResult: 5");
	assert_eq!(runner.run("console.log('a');").to_string(), "a");
	assert_eq!(runner.run("").to_string(), "No Output");
}
