#![no_main]

use libfuzzer_sys::fuzz_target;
use squill_core::{parse_rendered, LintConfig, Linter};

fuzz_target!(|data: &str| {
    let rendered = Linter::render_string(
        "<fuzz>".to_string(),
        data.to_string(),
        LintConfig::default(),
    );
    let _ = parse_rendered(&rendered);
});
