#![no_main]

use libfuzzer_sys::fuzz_target;
use squill_core::{render_source, TemplateConfig, TemplateMode};

fuzz_target!(|data: &str| {
    let config = TemplateConfig {
        mode: TemplateMode::Jinja,
        context: Default::default(),
    };
    let _ = render_source(data, &config);
});
