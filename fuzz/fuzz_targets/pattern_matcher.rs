#![no_main]

use libfuzzer_sys::fuzz_target;
use sequence::{Analyzer, InputFormat, Parser, Scanner};

const MAX_LINES: usize = 64;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // First line is a known pattern, the rest are messages
    let mut lines = input.lines().take(MAX_LINES);
    let Some(pattern) = lines.next() else {
        return;
    };

    let mut scanner = Scanner::new(InputFormat::Text);
    let mut parser = Parser::new();
    if let Ok(seq) = scanner.scan(pattern) {
        parser.add(&seq);
    }

    let messages: Vec<_> = lines.filter_map(|line| scanner.scan(line).ok()).collect();
    let mut analyzer = Analyzer::default();
    for seq in &messages {
        let _ = parser.parse(seq);
        analyzer.add(seq).unwrap();
    }
    analyzer.finalize().unwrap();

    // Every trained message classifies
    for seq in &messages {
        assert!(analyzer.analyze(seq).is_ok());
    }
});
