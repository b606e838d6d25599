//! Harness orchestration
//!
//! One worker runs the lines on the calling thread. More workers share a
//! bounded queue that the calling thread fills in input order and then
//! closes. Lines are borrowed from the batch for the whole run, so the
//! workers live in a thread scope. The first worker error aborts the run:
//! the queue stops being filled and the other workers stop taking lines.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crate::parser::Parser;
use crate::readers::LineBatch;

use super::types::{BenchConfig, BenchMode, BenchReport};
use super::worker::{worker_thread, LineWorker};

pub struct BenchHarness<'p> {
    config: BenchConfig,
    parser: &'p Parser,
}

impl<'p> BenchHarness<'p> {
    pub fn new(config: BenchConfig, parser: &'p Parser) -> Self {
        Self { config, parser }
    }

    pub fn run(&self, batch: &LineBatch) -> Result<BenchReport> {
        let workers = self.config.workers.max(1);
        tracing::debug!(
            workers,
            lines = batch.len(),
            mode = %self.config.mode,
            "starting benchmark"
        );

        let start = Instant::now();
        let lines_processed = if workers == 1 {
            self.run_sequential(batch)?
        } else {
            self.run_parallel(batch, workers)?
        };
        let elapsed = start.elapsed();

        Ok(BenchReport {
            mode: self.config.mode,
            workers,
            elapsed,
            lines_processed,
            total_bytes: batch.total_bytes,
        })
    }

    fn run_sequential(&self, batch: &LineBatch) -> Result<usize> {
        let mut worker = LineWorker::new(self.config.mode, self.config.format, self.parser);
        for line in &batch.lines {
            worker.process(line)?;
        }
        Ok(batch.len())
    }

    fn run_parallel(&self, batch: &LineBatch, workers: usize) -> Result<usize> {
        let (dispatched, outcome) = self.run_pool(batch, workers);
        if outcome.is_err() {
            tracing::debug!(dispatched, total = batch.len(), "benchmark aborted");
        }
        outcome
    }

    /// Run the worker pool, returning how many lines were queued alongside
    /// the outcome
    fn run_pool(&self, batch: &LineBatch, workers: usize) -> (usize, Result<usize>) {
        let (work_sender, work_receiver) = bounded::<&str>(self.config.queue_capacity.max(1));
        let abort = AtomicBool::new(false);
        let mode = self.config.mode;
        let format = self.config.format;
        let parser = self.parser;

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker_id| {
                    let work_receiver = work_receiver.clone();
                    let abort = &abort;
                    scope.spawn(move || {
                        worker_thread(worker_id, work_receiver, abort, mode, format, parser)
                    })
                })
                .collect();
            drop(work_receiver);

            let mut dispatched = 0usize;
            for line in &batch.lines {
                if abort.load(Ordering::Acquire) {
                    break;
                }
                // Every receiver is gone once all workers stopped
                if work_sender.send(line.as_str()).is_err() {
                    break;
                }
                dispatched += 1;
            }
            drop(work_sender);

            let mut processed = 0usize;
            let mut first_error = None;
            for (idx, handle) in handles.into_iter().enumerate() {
                let outcome = handle
                    .join()
                    .map_err(|_| anyhow!("Worker thread {} panicked", idx))
                    .and_then(|result| result);
                match outcome {
                    Ok(count) => processed += count,
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }

            let outcome = match first_error {
                Some(e) => Err(e).context("Benchmark failed"),
                None => Ok(processed),
            };
            (dispatched, outcome)
        })
    }
}

/// Run `mode` over every line of `batch` with `workers` threads
pub fn benchmark(
    batch: &LineBatch,
    parser: &Parser,
    workers: usize,
    mode: BenchMode,
) -> Result<BenchReport> {
    let config = BenchConfig {
        workers,
        mode,
        ..BenchConfig::default()
    };
    BenchHarness::new(config, parser).run(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputFormat;
    use crate::scanner::Scanner;

    fn fixture(lines: usize) -> LineBatch {
        let mut batch = LineBatch::default();
        for i in 0..lines {
            batch.push(format!(
                "2023-06-0{} 10:15:{:02} host{} sshd[{}]: Accepted publickey for user{} from 10.0.{}.{}",
                i % 9 + 1,
                i % 60,
                i % 5,
                1000 + i,
                i % 17,
                i % 256,
                i % 200
            ));
        }
        batch
    }

    #[test]
    fn single_and_multi_worker_process_every_line() {
        let batch = fixture(10_000);
        let parser = Parser::new();

        for workers in [1, 4] {
            let report = benchmark(&batch, &parser, workers, BenchMode::Scan).unwrap();
            assert_eq!(report.lines_processed, 10_000);
            assert_eq!(report.workers, workers);
            assert_eq!(report.total_bytes, batch.total_bytes);
        }
    }

    #[test]
    fn parse_mode_with_known_patterns() {
        let batch = fixture(500);
        let mut parser = Parser::new();
        let mut scanner = Scanner::new(InputFormat::Text);
        parser.add(&scanner.scan("%date% %time% %string% %string% Accepted").unwrap());

        let config = BenchConfig {
            workers: 3,
            queue_capacity: 8,
            mode: BenchMode::Parse,
            format: InputFormat::Text,
        };
        let report = BenchHarness::new(config, &parser).run(&batch).unwrap();
        assert_eq!(report.lines_processed, 500);
        assert_eq!(report.mode, BenchMode::Parse);
    }

    #[test]
    fn empty_batch_reports_zero_lines() {
        let report = benchmark(&LineBatch::default(), &Parser::new(), 2, BenchMode::Scan).unwrap();
        assert_eq!(report.lines_processed, 0);
        assert_eq!(report.total_bytes, 0);
    }

    #[test]
    fn worker_failure_fails_the_run() {
        let mut batch = fixture(100);
        batch.push("   ".to_string());
        batch.lines.extend(fixture(100).lines);

        for workers in [1, 4] {
            let err = benchmark(&batch, &Parser::new(), workers, BenchMode::Scan).unwrap_err();
            assert!(format!("{:#}", err).contains("Failed to scan message"));
        }
    }

    #[test]
    fn worker_failure_stops_dispatching() {
        let mut batch = LineBatch::default();
        batch.push("   ".to_string());
        batch.lines.extend(fixture(100_000).lines);

        let config = BenchConfig {
            workers: 4,
            queue_capacity: 16,
            mode: BenchMode::Scan,
            format: InputFormat::Text,
        };
        let parser = Parser::new();
        let (dispatched, outcome) = BenchHarness::new(config, &parser).run_pool(&batch, 4);

        let err = outcome.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to scan message"));
        assert!(
            dispatched < 50_000,
            "queued {} of {} lines after the first line failed",
            dispatched,
            batch.len()
        );
    }
}
