use anyhow::Result;
use crossbeam_channel::Sender;
use std::io;
use std::process;
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM};

#[cfg(unix)]
use signal_hook::iterator::{Handle, Signals};

#[cfg(windows)]
use signal_hook::flag;
#[cfg(windows)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(windows)]
use std::sync::Arc;

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }

    pub fn for_signal(signal: i32) -> Self {
        match signal {
            SIGINT => ExitCode::SignalInt,
            SIGTERM => ExitCode::SignalTerm,
            _ => ExitCode::GeneralError,
        }
    }
}

/// Control messages forwarded by the signal handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ctrl {
    Shutdown { signal: i32 },
}

/// Forwards SIGINT and SIGTERM to a control channel
pub struct SignalHandler {
    handle: Option<thread::JoinHandle<()>>,
    #[cfg(unix)]
    signals: Handle,
    #[cfg(windows)]
    stop: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Initialize signal handling - cross-platform
    pub fn new(ctrl_sender: Sender<Ctrl>) -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGTERM])?;
            let signals_handle = signals.handle();

            let handle = thread::Builder::new()
                .name("signal-forwarder".to_string())
                .spawn(move || {
                    for sig in signals.forever() {
                        // Receiver gone means teardown already ran
                        if ctrl_sender.send(Ctrl::Shutdown { signal: sig }).is_err() {
                            break;
                        }
                    }
                })?;

            Ok(SignalHandler {
                handle: Some(handle),
                signals: signals_handle,
            })
        }

        #[cfg(windows)]
        {
            // Windows signal handling using flag-based approach
            let term_flag = Arc::new(AtomicBool::new(false));
            flag::register(SIGINT, Arc::clone(&term_flag))?;
            let stop = Arc::new(AtomicBool::new(false));

            let stop_flag = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name("signal-forwarder".to_string())
                .spawn(move || {
                    while !stop_flag.load(Ordering::Relaxed) {
                        thread::sleep(std::time::Duration::from_millis(100));
                        if term_flag.swap(false, Ordering::Relaxed)
                            && ctrl_sender.send(Ctrl::Shutdown { signal: SIGINT }).is_err()
                        {
                            break;
                        }
                    }
                })?;

            Ok(SignalHandler {
                handle: Some(handle),
                stop,
            })
        }
    }

    /// Stop forwarding and join the forwarding thread
    pub fn close(&mut self) {
        #[cfg(unix)]
        self.signals.close();
        #[cfg(windows)]
        self.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cross-platform broken pipe detection
pub fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        // On Windows, broken pipe manifests as different error codes
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA "The pipe is being closed"
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE "The pipe has been ended"
    }
}
