// Copyright (c) 2020-2023 js-sandbox contributors. Zlib license.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::InterruptHandle;

/// Terminates an evaluation that is still running once its time is up.
///
/// Each watchdog owns a thread which waits for either the timeout or [`Watchdog::disarm()`], whichever comes first.
pub(crate) struct Watchdog {
	disarm: mpsc::Sender<()>,
	fired: Arc<AtomicBool>,
}

impl Watchdog {
	pub fn arm(timeout: Duration, handle: impl InterruptHandle) -> Self {
		let (disarm, disarmed) = mpsc::channel();
		let fired = Arc::new(AtomicBool::new(false));

		let fired_clone = fired.clone();
		thread::spawn(move || {
			if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(timeout) {
				fired_clone.store(true, Ordering::SeqCst);
				handle.interrupt();
			}
		});

		Self { disarm, fired }
	}

	/// Stops the watchdog. Returns whether it had already interrupted the evaluation.
	pub fn disarm(self) -> bool {
		// Dropping the sender wakes the thread up immediately.
		drop(self.disarm);
		self.fired.load(Ordering::SeqCst)
	}
}
