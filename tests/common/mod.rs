// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_sequence")
}

/// Run sequence with the given arguments, returning stdout, stderr and exit code
pub fn run_sequence(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(binary_path())
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to run sequence");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run sequence with `-i <temp file>` appended to the arguments
pub fn run_sequence_with_file(args: &[&str], file_content: &str) -> (String, String, i32) {
    let file = temp_file_with(file_content);
    let mut full_args = args.to_vec();
    full_args.push("-i");
    full_args.push(file.path().to_str().unwrap());
    run_sequence(&full_args)
}

/// Create a temporary file holding `content`
pub fn temp_file_with(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

/// A syslog-like fixture of `lines` messages spread over a handful of shapes
pub fn syslog_fixture(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        let line = match i % 4 {
            0 => format!(
                "Jan 12 06:49:{:02} host{} sshd[{}]: Accepted publickey for user{} from 10.0.0.{} port {}",
                i % 60,
                i % 3,
                1000 + i,
                i % 7,
                i % 250,
                40000 + i
            ),
            1 => format!(
                "Jan 12 06:50:{:02} host{} kernel: eth0 link up speed {} Mbps",
                i % 60,
                i % 3,
                if i % 2 == 0 { 100 } else { 1000 }
            ),
            2 => format!(
                "Jan 12 06:51:{:02} host{} cron[{}]: job {} finished in {} ms",
                i % 60,
                i % 3,
                2000 + i,
                i % 11,
                i % 900
            ),
            _ => format!(
                "Jan 12 06:52:{:02} host{} sshd[{}]: Connection closed by 192.168.1.{}",
                i % 60,
                i % 3,
                3000 + i,
                i % 250
            ),
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}
