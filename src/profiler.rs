//! CPU profiling to a flamegraph file

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::io::Write;

/// Sampling frequency in Hz
#[cfg(unix)]
const FREQUENCY: i32 = 1000;

/// An active CPU profile; samples land in `path` when stopped
pub struct CpuProfile {
    path: PathBuf,
    file: File,
    #[cfg(unix)]
    guard: pprof::ProfilerGuard<'static>,
}

impl CpuProfile {
    /// Create the target file and start sampling
    #[cfg(unix)]
    pub fn start(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create profile file '{}'", path.display()))?;
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(FREQUENCY)
            .blocklist(&["libc", "libgcc", "pthread", "vdso"])
            .build()
            .context("Failed to start CPU profiler")?;

        tracing::debug!(path = %path.display(), "cpu profiling started");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            guard,
        })
    }

    #[cfg(not(unix))]
    pub fn start(path: &Path) -> Result<Self> {
        anyhow::bail!(
            "CPU profiling is not supported on this platform: {}",
            path.display()
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop sampling, write the flamegraph and sync the file
    ///
    /// Returns the number of distinct stacks sampled. Nothing is written
    /// when no sample was taken.
    #[cfg(unix)]
    pub fn stop(mut self) -> Result<usize> {
        let report = self
            .guard
            .report()
            .build()
            .context("Failed to build CPU profile")?;
        drop(self.guard);

        let stacks = report.data.len();
        if stacks > 0 {
            report
                .flamegraph(&mut self.file)
                .with_context(|| format!("Failed to write profile '{}'", self.path.display()))?;
        }
        self.file.flush()?;
        self.file
            .sync_all()
            .with_context(|| format!("Failed to sync profile '{}'", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), stacks, "cpu profile written");
        Ok(stacks)
    }

    #[cfg(not(unix))]
    pub fn stop(self) -> Result<usize> {
        self.file.sync_all()?;
        Ok(0)
    }
}
