// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use js_scratchpad::{DenoEngine, OutputPolicy, RunnerConfig, ScriptRunner};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Runs a JavaScript snippet and prints what it logged, or the value of its last expression.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Source code to run. Takes precedence over FILE.
	#[arg(short, long, value_name = "CODE", conflicts_with = "file")]
	eval: Option<String>,

	/// File to run. Reads from stdin if neither FILE nor --eval is given.
	file: Option<PathBuf>,

	/// Terminates the script after this many milliseconds, 0 disables the limit.
	#[arg(long, env = "JS_SCRATCHPAD_TIMEOUT", value_name = "MS", default_value_t = 5000)]
	timeout: u64,

	/// Hard limit for the engine heap in bytes.
	#[arg(long, env = "JS_SCRATCHPAD_MAX_HEAP_SIZE", value_name = "BYTES")]
	max_heap_size: Option<usize>,

	/// How logged lines and the final value are combined: console-first or transcript.
	#[arg(long, env = "JS_SCRATCHPAD_POLICY", default_value_t = OutputPolicy::ConsoleFirst)]
	policy: OutputPolicy,

	/// Prints the result as JSON.
	#[arg(long)]
	json: bool,
}

impl Args {
	fn runner_config(&self) -> RunnerConfig {
		let mut config = RunnerConfig::default().with_output_policy(self.policy);

		config = match self.timeout {
			0 => config.without_timeout(),
			ms => config.with_timeout(Duration::from_millis(ms)),
		};

		if let Some(max_heap_size) = self.max_heap_size {
			config = config.with_max_heap_size(max_heap_size);
		}

		config
	}

	fn read_source(&self) -> anyhow::Result<String> {
		if let Some(code) = &self.eval {
			return Ok(code.clone());
		}

		match &self.file {
			Some(path) => std::fs::read_to_string(path)
				.with_context(|| format!("Unable to read script file {}.", path.display())),
			None => {
				let mut source = String::new();
				std::io::stdin()
					.read_to_string(&mut source)
					.context("Unable to read script from stdin.")?;
				Ok(source)
			}
		}
	}
}

fn main() -> anyhow::Result<ExitCode> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	if std::env::var("RUST_LOG_FORMAT").is_ok_and(|format| format == "json") {
		tracing_subscriber::fmt()
			.json()
			.flatten_event(true)
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
	} else {
		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
	}

	let args = Args::parse();
	let config = args.runner_config();
	debug!(?config, "Runner configuration.");

	let source = args.read_source()?;

	DenoEngine::init_platform();
	let result = ScriptRunner::new(config).run(&source);

	if args.json {
		println!(
			"{}",
			serde_json::to_string_pretty(&result).context("Unable to serialize the result.")?
		);
	} else {
		println!("{result}");
	}

	Ok(if result.is_success() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}
