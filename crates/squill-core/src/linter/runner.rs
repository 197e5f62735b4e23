//! Lint execution runners.
//!
//! One [`Runner`] type, three execution strategies behind the same `run`
//! surface:
//!
//! - `Sequential` — units execute on the calling thread, in input order.
//! - `ThreadParallel` — a fixed thread pool; results come back in
//!   submission order.
//! - `ProcessParallel` — a fixed pool of worker processes; results come
//!   back in completion order.
//!
//! File rendering always happens on the calling thread, one file at a time,
//! overlapped with execution on the workers. Per-file failures are reported
//! and skipped; raw i/o failures abort the run; a user interrupt tears the
//! pool down and ends the run quietly.

use crate::error::LintError;
use crate::linter::envelope::DelayedFailure;
use crate::linter::pool::{PoolOutcome, ProcessPool, ThreadPool, WorkerPool, WorkerSpec};
use crate::linter::{Formatter, Linter};
use crate::templater::RenderedFile;
use crate::types::FileLintResult;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::warn;

const RUNNER_TARGET: &str = "squill::runner";

/// One file's deferred lint computation, self-contained and serializable so
/// it can execute under any strategy, in or out of process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WorkUnit {
    pub fname: String,
    pub rendered: RenderedFile,
    pub fix: bool,
}

impl WorkUnit {
    /// Builds a fresh rule-set from the file's effective configuration and
    /// lints. The formatter participates only for in-process execution.
    pub(crate) fn execute(
        &self,
        formatter: Option<&dyn Formatter>,
    ) -> Result<FileLintResult, LintError> {
        let rule_set = Linter::get_ruleset(&self.rendered.config);
        Linter::lint_rendered(&self.rendered, &rule_set, self.fix, formatter)
    }
}

/// A render-time failure, attributed to its file.
struct UnitError {
    fname: String,
    error: LintError,
}

/// Execution strategy: a closed set of variants, with variant-specific
/// behaviour carried as data.
#[derive(Debug)]
enum Strategy {
    Sequential,
    ThreadParallel { pool_size: usize },
    ProcessParallel { pool_size: usize, worker: WorkerSpec },
}

/// Executes lint work over a list of files under a chosen strategy.
pub struct Runner {
    linter: Arc<Linter>,
    strategy: Strategy,
    interrupt: Arc<AtomicBool>,
}

impl Runner {
    pub fn sequential(linter: Arc<Linter>) -> Self {
        Self::with_strategy(linter, Strategy::Sequential)
    }

    pub fn thread_parallel(linter: Arc<Linter>, pool_size: usize) -> Self {
        Self::with_strategy(
            linter,
            Strategy::ThreadParallel {
                pool_size: pool_size.max(1),
            },
        )
    }

    pub fn process_parallel(linter: Arc<Linter>, pool_size: usize, worker: WorkerSpec) -> Self {
        Self::with_strategy(
            linter,
            Strategy::ProcessParallel {
                pool_size: pool_size.max(1),
                worker,
            },
        )
    }

    fn with_strategy(linter: Arc<Linter>, strategy: Strategy) -> Self {
        Self {
            linter,
            strategy,
            interrupt: interrupt_flag(),
        }
    }

    /// Replaces the interrupt flag consulted during parallel runs. The
    /// default is the process-wide SIGINT flag.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// The strategy this runner executes under.
    pub fn strategy_name(&self) -> &'static str {
        match self.strategy {
            Strategy::Sequential => "sequential",
            Strategy::ThreadParallel { .. } => "thread-parallel",
            Strategy::ProcessParallel { .. } => "process-parallel",
        }
    }

    /// Renders files and builds work units lazily, in input order, on the
    /// calling thread. Rendering and i/o are never distributed to workers.
    fn iter_units<'a>(
        &'a self,
        paths: &'a [PathBuf],
        fix: bool,
    ) -> impl Iterator<Item = Result<WorkUnit, UnitError>> + 'a {
        paths.iter().map(move |path| {
            match self.linter.render_file(path) {
                Ok(rendered) => Ok(WorkUnit {
                    fname: rendered.name.clone(),
                    rendered,
                    fix,
                }),
                Err(error) => Err(UnitError {
                    fname: path.display().to_string(),
                    error,
                }),
            }
        })
    }

    /// Runs linting over `paths`, yielding results lazily.
    ///
    /// Successful results stream out as they become available (submission
    /// order for sequential and thread execution, completion order for
    /// process execution). A per-file failure is reported with its trace
    /// and yields nothing; a raw i/o failure is yielded as `Err` and ends
    /// the run.
    pub fn run<'a>(
        &'a self,
        paths: &'a [PathBuf],
        fix: bool,
    ) -> Box<dyn Iterator<Item = Result<FileLintResult, LintError>> + 'a> {
        let units: Box<dyn Iterator<Item = Result<WorkUnit, UnitError>> + 'a> =
            Box::new(self.iter_units(paths, fix));
        match &self.strategy {
            Strategy::Sequential => Box::new(SequentialRun {
                runner: self,
                units,
                finished: false,
            }),
            Strategy::ThreadParallel { pool_size } => Box::new(ParallelRun::new(
                self,
                units,
                Box::new(ThreadPool::spawn(*pool_size)),
                true,
                fix,
            )),
            Strategy::ProcessParallel { pool_size, worker } => {
                match ProcessPool::spawn(*pool_size, worker, self.linter.config()) {
                    Ok(pool) => Box::new(ParallelRun::new(self, units, Box::new(pool), false, fix)),
                    Err(error) => Box::new(std::iter::once(Err(error))),
                }
            }
        }
    }
}

/// Reports a soft per-file failure: filename plus the diagnostic trace.
fn handle_lint_path_failure(fname: &str, error: &LintError, trace: &str) {
    warn!(
        target: RUNNER_TARGET,
        file = %fname,
        error = %error,
        trace = %trace,
        "unable to lint file due to an internal error; it contributes no result"
    );
}

struct SequentialRun<'a> {
    runner: &'a Runner,
    units: Box<dyn Iterator<Item = Result<WorkUnit, UnitError>> + 'a>,
    finished: bool,
}

impl Iterator for SequentialRun<'_> {
    type Item = Result<FileLintResult, LintError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let unit = match self.units.next()? {
                Ok(unit) => unit,
                Err(unit_error) => {
                    if unit_error.error.is_fatal() {
                        self.finished = true;
                        return Some(Err(unit_error.error));
                    }
                    handle_lint_path_failure(
                        &unit_error.fname,
                        &unit_error.error,
                        &Backtrace::force_capture().to_string(),
                    );
                    continue;
                }
            };
            match unit.execute(self.runner.linter.formatter()) {
                Ok(result) => return Some(Ok(result)),
                Err(error) if error.is_fatal() => {
                    self.finished = true;
                    return Some(Err(error));
                }
                Err(error) => {
                    handle_lint_path_failure(
                        &unit.fname,
                        &error,
                        &Backtrace::force_capture().to_string(),
                    );
                }
            }
        }
    }
}

/// Shared collector for both parallel strategies.
///
/// Each `next()` first tops the pool up — rendering further files on the
/// calling thread while workers execute — then blocks for one outcome.
/// `ordered` selects submission-order collection (threads) versus
/// completion-order collection (processes).
struct ParallelRun<'a> {
    runner: &'a Runner,
    units: Box<dyn Iterator<Item = Result<WorkUnit, UnitError>> + 'a>,
    pool: Box<dyn WorkerPool>,
    ordered: bool,
    fix: bool,
    next_submit: usize,
    next_yield: usize,
    pending: usize,
    /// Reorder buffer for ordered collection; `None` marks a failed slot.
    buffer: BTreeMap<usize, Option<FileLintResult>>,
    units_done: bool,
    finished: bool,
}

impl<'a> ParallelRun<'a> {
    fn new(
        runner: &'a Runner,
        units: Box<dyn Iterator<Item = Result<WorkUnit, UnitError>> + 'a>,
        pool: Box<dyn WorkerPool>,
        ordered: bool,
        fix: bool,
    ) -> Self {
        Self {
            runner,
            units,
            pool,
            ordered,
            fix,
            next_submit: 0,
            next_yield: 0,
            pending: 0,
            buffer: BTreeMap::new(),
            units_done: false,
            finished: false,
        }
    }

    fn dispatch(&self, result: &FileLintResult) {
        if let Some(formatter) = self.runner.linter.formatter() {
            formatter.dispatch_file_violations(&result.name, result, self.fix);
        }
    }

    /// Pops buffered results that are next in submission order.
    fn pop_ordered(&mut self) -> Option<FileLintResult> {
        while let Some(slot) = self.buffer.remove(&self.next_yield) {
            self.next_yield += 1;
            if let Some(result) = slot {
                return Some(result);
            }
        }
        None
    }
}

impl Iterator for ParallelRun<'_> {
    type Item = Result<FileLintResult, LintError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if self.runner.interrupt.swap(false, Ordering::SeqCst) {
                // In-flight work is abandoned: neither success nor failure.
                eprintln!("squill: received interrupt, cleaning up and shutting down...");
                self.pool.terminate();
                self.finished = true;
                return None;
            }

            if self.ordered {
                if let Some(result) = self.pop_ordered() {
                    self.dispatch(&result);
                    return Some(Ok(result));
                }
            }

            // Top up: keep rendering on this thread while workers are busy.
            while !self.units_done && self.pending < self.pool.capacity() {
                match self.units.next() {
                    Some(Ok(unit)) => {
                        self.pool.submit(self.next_submit, unit);
                        self.next_submit += 1;
                        self.pending += 1;
                    }
                    Some(Err(unit_error)) => {
                        if unit_error.error.is_fatal() {
                            self.pool.terminate();
                            self.finished = true;
                            return Some(Err(unit_error.error));
                        }
                        handle_lint_path_failure(
                            &unit_error.fname,
                            &unit_error.error,
                            &Backtrace::force_capture().to_string(),
                        );
                    }
                    None => {
                        self.units_done = true;
                    }
                }
            }

            if self.pending == 0 {
                self.finished = true;
                return None;
            }

            match self.pool.recv() {
                Some((index, PoolOutcome::Completed(result))) => {
                    self.pending -= 1;
                    if self.ordered {
                        self.buffer.insert(index, Some(result));
                    } else {
                        self.dispatch(&result);
                        return Some(Ok(result));
                    }
                }
                Some((index, PoolOutcome::Failed(failure))) => {
                    self.pending -= 1;
                    if failure.is_fatal() {
                        self.pool.terminate();
                        self.finished = true;
                        return Some(Err(failure.reraise()));
                    }
                    let (fname, error, trace) = failure.into_parts();
                    handle_lint_path_failure(&fname, &error, &trace);
                    if self.ordered {
                        self.buffer.insert(index, None);
                    }
                }
                None => {
                    // every worker is gone; nothing more will arrive
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

static INTERRUPT: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// The process-wide interrupt flag, registering the SIGINT hook on first
/// use. Installation happens exactly once per process lifetime; only the
/// controller observes the flag (workers disable interrupt delivery).
pub fn interrupt_flag() -> Arc<AtomicBool> {
    INTERRUPT
        .get_or_init(|| {
            let flag = Arc::new(AtomicBool::new(false));
            if let Err(err) =
                signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))
            {
                warn!(
                    target: RUNNER_TARGET,
                    error = %err,
                    "failed to install interrupt handler; ctrl-c will abort abruptly"
                );
            }
            flag
        })
        .clone()
}

/// Picks a runner for the requested concurrency.
///
/// `parallel <= 1` is sequential. Otherwise process parallelism is
/// preferred when allowed and the runtime supports it; contexts that
/// disallow it (tests, embedders) get threads. A runtime that cannot
/// support parallel execution at all falls back to sequential with a
/// warning — degraded, never an error.
pub fn get_runner(linter: Arc<Linter>, parallel: usize, allow_process_parallelism: bool) -> Runner {
    if parallel <= 1 {
        return Runner::sequential(linter);
    }
    if std::thread::available_parallelism().is_err() {
        warn!(
            target: RUNNER_TARGET,
            requested = parallel,
            "parallel linting is not supported on this runtime; falling back to sequential"
        );
        return Runner::sequential(linter);
    }
    if allow_process_parallelism {
        match WorkerSpec::current_exe() {
            Ok(worker) => Runner::process_parallel(linter, parallel, worker),
            Err(err) => {
                warn!(
                    target: RUNNER_TARGET,
                    error = %err,
                    "cannot locate the worker executable; using thread parallelism instead"
                );
                Runner::thread_parallel(linter, parallel)
            }
        }
    } else {
        Runner::thread_parallel(linter, parallel)
    }
}
