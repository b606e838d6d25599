mod common;
use common::*;

#[test]
fn test_scan_single_message() {
    let (stdout, stderr, exit_code) =
        run_sequence(&["scan", "Jan 12 06:49:42 irc sshd[7034]: Accepted password"]);

    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.iter().all(|line| line.starts_with('#')), "{}", stdout);
    assert!(stdout.contains("time"), "06:49:42 should be typed: {}", stdout);
    assert!(stdout.contains("integer"), "7034 should be typed: {}", stdout);
    assert!(stdout.contains("sshd"));
}

#[test]
fn test_scan_file_skips_comments() {
    let (stdout, stderr, exit_code) =
        run_sequence_with_file(&["scan"], "# comment\nuser login ok\n\nuser logout fail\n");

    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(stdout.matches("\n\n").count(), 2, "one block per message: {}", stdout);
    assert!(stdout.contains("login"));
    assert!(stdout.contains("logout"));
    assert!(!stdout.contains("comment"));
}

#[test]
fn test_scan_json_message() {
    let (stdout, stderr, exit_code) =
        run_sequence(&["scan", "--format", "json", r#"{"status":200,"path":"/index"}"#]);

    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("status"));
    assert!(stdout.contains("integer"));
}

#[test]
fn test_scan_invalid_json_is_fatal() {
    let (_, stderr, exit_code) = run_sequence(&["scan", "--format", "json", "{not json"]);

    assert_eq!(exit_code, 1);
    assert!(stderr.contains("Failed to scan message"));
}

#[test]
fn test_scan_without_message_or_file() {
    let (_, stderr, exit_code) = run_sequence(&["scan"]);

    assert_eq!(exit_code, 2);
    assert!(stderr.contains("Invalid input file or string specified"));
}

#[test]
fn test_parse_prints_matches_and_logs_failures() {
    let patterns = temp_file_with("# known\n%integer% user %string% ok\n");

    let (stdout, stderr, exit_code) = run_sequence_with_file(
        &["parse", "-p", path_str(patterns.path())],
        "2023 user login ok\ndisk full on sda\n",
    );

    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert!(stdout.starts_with("2023 user login ok\n# %integer% user %string% ok\n"));
    assert!(!stdout.contains("disk full"));
    assert!(stderr.contains("disk full on sda"), "failure should be logged: {}", stderr);
    assert!(stderr.contains("Parsed 2 messages in"));
}

#[test]
fn test_parse_requires_input() {
    let (_, _, exit_code) = run_sequence(&["parse"]);
    assert_eq!(exit_code, 2);
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let (_, _, exit_code) = run_sequence(&["frobnicate"]);
    assert_eq!(exit_code, 2);
}
