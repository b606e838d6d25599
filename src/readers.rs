//! Line streams
//!
//! Every command consumes its input as a stream of message lines with
//! comment (`#`) and blank lines already removed. A [`LineSource`] can be
//! opened more than once, which is what the two-pass discovery relies on.
//! Bytes that are not valid UTF-8 are replaced, never rejected.

use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::PathBuf;

use crate::decompression::open_input;

pub type LineIter<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;
pub type NumberedLineIter<'a> = Box<dyn Iterator<Item = Result<(usize, String)>> + 'a>;

/// Re-openable, ordered stream of message lines
pub trait LineSource {
    /// Open the stream from its first line
    fn lines(&self) -> Result<LineIter<'_>>;
}

/// Lines that carry a message: not empty and not a `#` comment
pub fn is_content_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#')
}

impl LineSource for [String] {
    fn lines(&self) -> Result<LineIter<'_>> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}

impl LineSource for Vec<String> {
    fn lines(&self) -> Result<LineIter<'_>> {
        self.as_slice().lines()
    }
}

/// A log file on disk, re-read from the start every time it is opened
#[derive(Debug, Clone)]
pub struct InputFile {
    path: PathBuf,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InputFile {
    /// Content lines paired with their 1-based line number in the file
    pub fn numbered_lines(&self) -> Result<NumberedLineIter<'_>> {
        let reader = open_input(&self.path)?;
        let path = &self.path;

        Ok(Box::new(LossyLines::new(reader).enumerate().filter_map(
            move |(idx, line)| match line {
                Ok(line) => is_content_line(&line).then_some(Ok((idx + 1, line))),
                Err(e) => Some(
                    Err(e).with_context(|| format!("Failed to read from '{}'", path.display())),
                ),
            },
        )))
    }
}

impl LineSource for InputFile {
    fn lines(&self) -> Result<LineIter<'_>> {
        Ok(Box::new(
            self.numbered_lines()?
                .map(|line| line.map(|(_, line)| line)),
        ))
    }
}

/// Newline-split lines with invalid UTF-8 replaced by U+FFFD
struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                }
                if self.buf.ends_with(b"\r") {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// A fully materialized line stream
#[derive(Debug, Clone, Default)]
pub struct LineBatch {
    pub lines: Vec<String>,
    pub total_bytes: usize,
}

impl LineBatch {
    /// Read a whole source into memory
    pub fn load<S: LineSource + ?Sized>(source: &S) -> Result<Self> {
        let mut batch = Self::default();
        for line in source.lines()? {
            batch.push(line?);
        }
        Ok(batch)
    }

    /// Build a batch from raw text, dropping comment and blank lines
    pub fn from_text(text: &str) -> Self {
        let mut batch = Self::default();
        for line in text.lines().filter(|line| is_content_line(line)) {
            batch.push(line.to_string());
        }
        batch
    }

    pub fn push(&mut self, line: String) {
        self.total_bytes += line.len();
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for LineBatch {
    fn lines(&self) -> Result<LineIter<'_>> {
        self.lines.as_slice().lines()
    }
}
