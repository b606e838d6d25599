#![no_main]

use libfuzzer_sys::fuzz_target;
use sequence::{InputFormat, Scanner};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Scan errors are fine; we only care about panics.
        for format in [InputFormat::Text, InputFormat::Json] {
            let mut scanner = Scanner::new(format);
            if let Ok(seq) = scanner.scan(input) {
                assert!(!seq.is_empty());
                let _ = seq.signature();
                let _ = seq.print_tokens();
            }
        }
    }
});
