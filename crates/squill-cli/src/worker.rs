//! Worker-mode entry point for process-parallel linting.

use std::process::ExitCode;

/// Runs the JSONL worker loop over stdin/stdout until the controller
/// closes the pipe.
pub fn run() -> ExitCode {
    // The controller is the sole signal-handling authority: workers swallow
    // SIGINT so a ctrl-c only reaches the controller, which then tears the
    // pool down in one place.
    unsafe {
        let _ = signal_hook::low_level::register(signal_hook::consts::SIGINT, || {});
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match squill_core::run_worker(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("squill: worker error: {err}");
            ExitCode::from(1)
        }
    }
}
