//! Shutdown and profiling coordination
//!
//! A [`Coordinator`] owns the optional CPU profile and the OS signal
//! forwarding for the duration of a command. A listener thread waits for
//! either an interrupt or the completion notice sent by
//! [`Coordinator::finish`], and tears down exactly once:
//!
//! ```text
//! Idle -> Profiling -> Running -> Completed   -> Stopped
//!                             \-> Interrupted -> Stopped -> exit(128 + signal)
//! ```
//!
//! On completion `finish` blocks until the listener acknowledges that the
//! profile has been flushed and closed.

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::platform::{Ctrl, ExitCode, SignalHandler};
use crate::profiler::CpuProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Profiling,
    Running,
    Completed,
    Interrupted,
    Stopped,
}

#[derive(Clone)]
struct SharedState(Arc<Mutex<CoordinatorState>>);

impl SharedState {
    fn get(&self) -> CoordinatorState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: CoordinatorState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

pub struct Coordinator {
    state: SharedState,
    done_sender: Option<Sender<()>>,
    ack_receiver: Receiver<Result<()>>,
    listener: Option<thread::JoinHandle<()>>,
}

impl Coordinator {
    /// Install signal forwarding, start profiling if requested and spawn
    /// the listener
    pub fn start(cpuprofile: Option<&Path>) -> Result<Self> {
        let state = SharedState(Arc::new(Mutex::new(CoordinatorState::Idle)));

        let (ctrl_sender, ctrl_receiver) = unbounded();
        let signals = SignalHandler::new(ctrl_sender)?;

        let profile = match cpuprofile {
            Some(path) => {
                let profile = CpuProfile::start(path)?;
                state.set(CoordinatorState::Profiling);
                Some(profile)
            }
            None => None,
        };

        let (done_sender, done_receiver) = bounded(1);
        let (ack_sender, ack_receiver) = bounded(1);

        let listener_state = state.clone();
        let listener = thread::Builder::new()
            .name("coordinator".to_string())
            .spawn(move || {
                listen(
                    listener_state,
                    signals,
                    profile,
                    ctrl_receiver,
                    done_receiver,
                    ack_sender,
                )
            })?;
        state.set(CoordinatorState::Running);

        Ok(Self {
            state,
            done_sender: Some(done_sender),
            ack_receiver,
            listener: Some(listener),
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.get()
    }

    /// Signal completion and wait for teardown; later calls are no-ops
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        if let Some(done_sender) = self.done_sender.take() {
            let _ = done_sender.send(());
        }
        let result = self
            .ack_receiver
            .recv()
            .unwrap_or_else(|_| Err(anyhow!("Coordinator stopped without acknowledging")));

        if listener.join().is_err() {
            return Err(anyhow!("Coordinator thread panicked"));
        }
        result
    }

    /// Signal completion, wait for teardown and consume the coordinator
    pub fn finish(mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Shutdown failed: {:#}", e);
        }
    }
}

fn listen(
    state: SharedState,
    mut signals: SignalHandler,
    profile: Option<CpuProfile>,
    ctrl_receiver: Receiver<Ctrl>,
    done_receiver: Receiver<()>,
    ack_sender: Sender<Result<()>>,
) {
    let interrupted = select! {
        recv(ctrl_receiver) -> msg => match msg {
            Ok(Ctrl::Shutdown { signal }) => Some(signal),
            Err(_) => {
                let _ = done_receiver.recv();
                None
            }
        },
        recv(done_receiver) -> _ => None,
    };

    match interrupted {
        Some(signal) => {
            state.set(CoordinatorState::Interrupted);
            tracing::info!(signal, "Received signal, shutting down");
            if let Err(e) = stop_profile(profile) {
                tracing::error!("{:#}", e);
            }
            state.set(CoordinatorState::Stopped);
            ExitCode::for_signal(signal).exit();
        }
        None => {
            state.set(CoordinatorState::Completed);
            let result = stop_profile(profile);
            signals.close();
            state.set(CoordinatorState::Stopped);
            let _ = ack_sender.send(result);
        }
    }
}

fn stop_profile(profile: Option<CpuProfile>) -> Result<()> {
    if let Some(profile) = profile {
        let path = profile.path().to_path_buf();
        let stacks = profile.stop()?;
        tracing::info!(path = %path.display(), stacks, "CPU profile written");
    }
    Ok(())
}
