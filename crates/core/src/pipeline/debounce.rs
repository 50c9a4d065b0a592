use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

enum TimerMsg {
    Arm,
    Shutdown,
}

/// Resettable quiet-period timer on a dedicated thread.
///
/// `schedule` arms the timer; scheduling again before the quiet period
/// elapses resets it, so a burst of N events yields exactly one callback
/// after the last event. The callback runs on the timer thread.
pub struct DebounceTimer {
    tx: Sender<TimerMsg>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn spawn<F>(quiet: Duration, on_quiet: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = unbounded::<TimerMsg>();
        let handle = thread::spawn(move || loop {
            match rx.recv() {
                Ok(TimerMsg::Arm) => loop {
                    // Armed: each further Arm restarts the window.
                    match rx.recv_timeout(quiet) {
                        Ok(TimerMsg::Arm) => continue,
                        Ok(TimerMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                        Err(RecvTimeoutError::Timeout) => {
                            on_quiet();
                            break;
                        }
                    }
                },
                Ok(TimerMsg::Shutdown) | Err(_) => return,
            }
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Arms the timer, or resets the running window.
    pub fn schedule(&self) {
        let _ = self.tx.send(TimerMsg::Arm);
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        let _ = self.tx.send(TimerMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
