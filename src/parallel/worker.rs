//! Worker thread for the throughput harness
//!
//! Each worker owns its scanner for the whole run. The parser is shared
//! read-only. A failing worker raises the shared abort flag so the rest of
//! the pool stops taking lines.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::InputFormat;
use crate::parser::Parser;
use crate::scanner::Scanner;

use super::types::BenchMode;

/// Per-line operation instance
pub(crate) struct LineWorker<'p> {
    scanner: Scanner,
    parser: &'p Parser,
    mode: BenchMode,
}

impl<'p> LineWorker<'p> {
    pub fn new(mode: BenchMode, format: InputFormat, parser: &'p Parser) -> Self {
        Self {
            scanner: Scanner::new(format),
            parser,
            mode,
        }
    }

    /// Run the per-line work and discard its result
    pub fn process(&mut self, line: &str) -> Result<()> {
        let seq = self
            .scanner
            .scan(line)
            .with_context(|| format!("Failed to scan message: {}", line))?;

        if self.mode == BenchMode::Parse {
            // A miss is a normal outcome here
            let _ = black_box(self.parser.parse(&seq));
        }
        black_box(seq);
        Ok(())
    }
}

/// Worker thread: drains the queue until it is closed or the run is aborted
pub(crate) fn worker_thread(
    worker_id: usize,
    work_receiver: Receiver<&str>,
    abort: &AtomicBool,
    mode: BenchMode,
    format: InputFormat,
    parser: &Parser,
) -> Result<usize> {
    let mut worker = LineWorker::new(mode, format, parser);
    let mut processed = 0usize;

    for line in work_receiver.iter() {
        if abort.load(Ordering::Acquire) {
            tracing::trace!(worker = worker_id, processed, "worker aborted");
            return Ok(processed);
        }
        if let Err(e) = worker.process(line) {
            abort.store(true, Ordering::Release);
            return Err(e).with_context(|| format!("Worker {} failed", worker_id));
        }
        processed += 1;
    }

    tracing::trace!(worker = worker_id, processed, "worker finished");
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn counts_every_line_until_the_queue_closes() {
        let parser = Parser::new();
        let (tx, rx) = unbounded();
        for line in ["user login ok", "user logout fail", "disk full"] {
            tx.send(line).unwrap();
        }
        drop(tx);

        let abort = AtomicBool::new(false);
        let processed =
            worker_thread(0, rx, &abort, BenchMode::Parse, InputFormat::Text, &parser).unwrap();
        assert_eq!(processed, 3);
        assert!(!abort.load(Ordering::Acquire));
    }

    #[test]
    fn scan_failure_stops_the_worker() {
        let parser = Parser::new();
        let (tx, rx) = unbounded();
        tx.send("user login ok").unwrap();
        tx.send("  ").unwrap();
        drop(tx);

        let abort = AtomicBool::new(false);
        let err = worker_thread(7, rx, &abort, BenchMode::Scan, InputFormat::Text, &parser)
            .unwrap_err();
        assert!(err.to_string().contains("Worker 7 failed"));
        assert!(abort.load(Ordering::Acquire));
    }

    #[test]
    fn raised_abort_flag_stops_the_worker() {
        let parser = Parser::new();
        let (tx, rx) = unbounded();
        for _ in 0..50 {
            tx.send("user login ok").unwrap();
        }
        drop(tx);

        let abort = AtomicBool::new(true);
        let processed =
            worker_thread(1, rx, &abort, BenchMode::Scan, InputFormat::Text, &parser).unwrap();
        assert_eq!(processed, 0);
    }
}
