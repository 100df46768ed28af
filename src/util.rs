// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use crate::ScriptRunner;

/// Runs a standalone script with the default configuration, and returns the text to show to the user.
///
/// Logged lines win over the final value; failures are returned as text as well, this function never fails.
/// Usually, you would want to keep a [`ScriptRunner`] around to configure timeouts and the output policy.
pub fn run_script(source: &str) -> String {
	ScriptRunner::default().run(source).to_string()
}
