//! Worker pools for parallel lint execution.
//!
//! Two pool flavours sit behind one trait: [`ThreadPool`] (cooperating
//! threads sharing memory) and [`ProcessPool`] (independent worker
//! processes speaking JSONL over stdin/stdout). Both catch failures at the
//! point they happen and return them as [`DelayedFailure`] envelopes; a
//! failing unit never takes a worker down.
//!
//! The process protocol: the controller spawns `<worker program> <args>`
//! per worker, writes one JSON line with the pool configuration, then one
//! JSON line per work unit; the worker answers each unit with one JSON
//! line carrying either a result or an envelope. [`run_worker`] is the
//! worker side, called by the CLI's hidden worker mode.

use crate::error::LintError;
use crate::linter::config::LintConfig;
use crate::linter::envelope::DelayedFailure;
use crate::linter::runner::WorkUnit;
use crate::types::FileLintResult;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

const POOL_TARGET: &str = "squill::pool";

/// Argument that switches the squill binary into worker mode.
pub const WORKER_FLAG: &str = "--squill-worker";

/// How to launch one worker process.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerSpec {
    /// Workers are the current executable re-run in worker mode.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: vec![WORKER_FLAG.to_string()],
        })
    }
}

/// What a pool hands back for one unit.
pub(crate) enum PoolOutcome {
    Completed(FileLintResult),
    Failed(DelayedFailure),
}

/// A pool of workers executing units out of band.
pub(crate) trait WorkerPool {
    /// Number of units that may be in flight at once.
    fn capacity(&self) -> usize;

    /// Queues a unit; `index` is its submission position.
    fn submit(&mut self, index: usize, unit: WorkUnit);

    /// Blocks for the next finished unit. `None` when every worker is gone.
    fn recv(&mut self) -> Option<(usize, PoolOutcome)>;

    /// Tears the pool down immediately, abandoning in-flight work.
    fn terminate(&mut self);
}

type WorkQueue = Arc<Mutex<Receiver<(usize, WorkUnit)>>>;
type ResultSender = Sender<(usize, PoolOutcome)>;

/// Pool of threads sharing the controller's memory.
pub(crate) struct ThreadPool {
    work_tx: Option<Sender<(usize, WorkUnit)>>,
    results_rx: Receiver<(usize, PoolOutcome)>,
    handles: Vec<JoinHandle<()>>,
    size: usize,
}

impl ThreadPool {
    pub fn spawn(size: usize) -> Self {
        let size = size.max(1);
        let (work_tx, work_rx) = mpsc::channel::<(usize, WorkUnit)>();
        let work_rx: WorkQueue = Arc::new(Mutex::new(work_rx));
        let (results_tx, results_rx) = mpsc::channel();

        let handles = (0..size)
            .map(|index| {
                let work_rx = Arc::clone(&work_rx);
                let results_tx = results_tx.clone();
                std::thread::Builder::new()
                    .name(format!("squill-lint-{index}"))
                    .spawn(move || thread_worker(&work_rx, &results_tx))
                    .expect("failed to spawn lint worker thread")
            })
            .collect();

        Self {
            work_tx: Some(work_tx),
            results_rx,
            handles,
            size,
        }
    }
}

fn thread_worker(work_rx: &WorkQueue, results_tx: &ResultSender) {
    loop {
        let job = {
            let Ok(guard) = work_rx.lock() else { return };
            guard.recv()
        };
        let Ok((index, unit)) = job else { return };
        let fname = unit.fname.clone();
        let outcome = match catch_unwind(AssertUnwindSafe(|| unit.execute(None))) {
            Ok(Ok(result)) => PoolOutcome::Completed(result),
            Ok(Err(error)) => PoolOutcome::Failed(DelayedFailure::capture(&fname, error)),
            Err(payload) => PoolOutcome::Failed(DelayedFailure::from_panic(&fname, payload)),
        };
        if results_tx.send((index, outcome)).is_err() {
            // controller stopped listening
            return;
        }
    }
}

impl WorkerPool for ThreadPool {
    fn capacity(&self) -> usize {
        self.size
    }

    fn submit(&mut self, index: usize, unit: WorkUnit) {
        if let Some(tx) = &self.work_tx {
            let _ = tx.send((index, unit));
        }
    }

    fn recv(&mut self) -> Option<(usize, PoolOutcome)> {
        self.results_rx.recv().ok()
    }

    fn terminate(&mut self) {
        // Close the queue and detach the workers; in-flight units finish in
        // the background but nothing collects them.
        self.work_tx = None;
        self.handles.clear();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.work_tx = None;
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Pool of independent worker processes.
pub(crate) struct ProcessPool {
    children: Vec<Child>,
    work_tx: Option<Sender<(usize, WorkUnit)>>,
    results_rx: Receiver<(usize, PoolOutcome)>,
    forwarders: Vec<JoinHandle<()>>,
    size: usize,
}

impl ProcessPool {
    /// Spawns `size` workers and runs the one-time initializer in each: the
    /// first protocol line delivers the resolved configuration (the worker
    /// also disables interrupt delivery on startup, so only the controller
    /// reacts to ctrl-c).
    pub fn spawn(size: usize, spec: &WorkerSpec, config: &LintConfig) -> Result<Self, LintError> {
        let size = size.max(1);
        let init_line = serde_json::to_string(config)
            .map_err(|err| LintError::internal(format!("failed to encode worker init: {err}")))?;

        let (work_tx, work_rx) = mpsc::channel::<(usize, WorkUnit)>();
        let work_rx: WorkQueue = Arc::new(Mutex::new(work_rx));
        let (results_tx, results_rx) = mpsc::channel();

        let mut children = Vec::with_capacity(size);
        let mut forwarders = Vec::with_capacity(size);
        for index in 0..size {
            let mut child = Command::new(&spec.program)
                .args(&spec.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|err| {
                    LintError::internal(format!(
                        "failed to spawn worker process {}: {err}",
                        spec.program.display()
                    ))
                })?;

            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| LintError::internal("failed to capture worker stdin"))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| LintError::internal("failed to capture worker stdout"))?;

            writeln!(stdin, "{init_line}").map_err(|err| {
                LintError::internal(format!("failed to initialize worker: {err}"))
            })?;

            debug!(target: POOL_TARGET, worker = index, "spawned lint worker process");

            let work_rx = Arc::clone(&work_rx);
            let results_tx = results_tx.clone();
            let mut reader = BufReader::new(stdout);
            forwarders.push(
                std::thread::Builder::new()
                    .name(format!("squill-forwarder-{index}"))
                    .spawn(move || loop {
                        let job = {
                            let Ok(guard) = work_rx.lock() else { return };
                            guard.recv()
                        };
                        let Ok((unit_index, unit)) = job else { return };
                        let fname = unit.fname.clone();
                        let outcome = forward_unit(&mut stdin, &mut reader, &unit)
                            .unwrap_or_else(|err| {
                                PoolOutcome::Failed(DelayedFailure::capture(&fname, err))
                            });
                        if results_tx.send((unit_index, outcome)).is_err() {
                            return;
                        }
                    })
                    .expect("failed to spawn worker forwarder thread"),
            );
            children.push(child);
        }

        Ok(Self {
            children,
            work_tx: Some(work_tx),
            results_rx,
            forwarders,
            size,
        })
    }
}

/// Ships one unit to a worker and reads its reply.
fn forward_unit(
    stdin: &mut std::process::ChildStdin,
    reader: &mut BufReader<std::process::ChildStdout>,
    unit: &WorkUnit,
) -> Result<PoolOutcome, LintError> {
    let line = serde_json::to_string(unit)
        .map_err(|err| LintError::internal(format!("failed to encode work unit: {err}")))?;
    writeln!(stdin, "{line}")
        .and_then(|()| stdin.flush())
        .map_err(|err| LintError::internal(format!("worker pipe closed: {err}")))?;

    let mut reply = String::new();
    let bytes = reader
        .read_line(&mut reply)
        .map_err(|err| LintError::internal(format!("failed to read worker reply: {err}")))?;
    if bytes == 0 {
        return Err(LintError::internal("worker exited without replying"));
    }

    let reply: WorkerReply = serde_json::from_str(reply.trim())
        .map_err(|err| LintError::internal(format!("worker produced invalid JSON: {err}")))?;
    Ok(match reply {
        WorkerReply::Result(result) => PoolOutcome::Completed(result),
        WorkerReply::Failure(failure) => PoolOutcome::Failed(failure),
    })
}

impl WorkerPool for ProcessPool {
    fn capacity(&self) -> usize {
        self.size
    }

    fn submit(&mut self, index: usize, unit: WorkUnit) {
        if let Some(tx) = &self.work_tx {
            let _ = tx.send((index, unit));
        }
    }

    fn recv(&mut self) -> Option<(usize, PoolOutcome)> {
        self.results_rx.recv().ok()
    }

    fn terminate(&mut self) {
        debug!(target: POOL_TARGET, "terminating worker pool");
        self.work_tx = None;
        for child in &mut self.children {
            if let Err(err) = child.kill() {
                warn!(target: POOL_TARGET, error = %err, "failed to kill lint worker");
            }
            let _ = child.wait();
        }
        self.children.clear();
        self.forwarders.clear();
    }
}

impl Drop for ProcessPool {
    fn drop(&mut self) {
        self.work_tx = None;
        for handle in self.forwarders.drain(..) {
            let _ = handle.join();
        }
        // Forwarders dropped the worker stdins, so workers exit on EOF.
        for mut child in self.children.drain(..) {
            let _ = child.wait();
        }
    }
}

/// One reply line from a worker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub(crate) enum WorkerReply {
    Result(FileLintResult),
    Failure(DelayedFailure),
}

/// Serves the worker side of the process-pool protocol until stdin closes.
///
/// The first line is the pool configuration sent by the controller's
/// one-time initializer; each further line is one work unit. Failures,
/// including panics, are caught and answered as envelopes — a bad unit must
/// not take the worker down.
pub fn run_worker(reader: impl BufRead, mut writer: impl Write) -> Result<(), LintError> {
    let mut lines = reader.lines();

    let Some(init) = lines.next() else {
        return Ok(());
    };
    let init =
        init.map_err(|err| LintError::internal(format!("failed to read worker init: {err}")))?;
    let config: LintConfig = serde_json::from_str(init.trim())
        .map_err(|err| LintError::internal(format!("invalid worker init line: {err}")))?;
    debug!(
        target: POOL_TARGET,
        disabled_rules = config.disabled_rules.len(),
        "worker initialized"
    );

    for line in lines {
        let line =
            line.map_err(|err| LintError::internal(format!("failed to read work unit: {err}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<WorkUnit>(line.trim()) {
            Ok(unit) => {
                let fname = unit.fname.clone();
                match catch_unwind(AssertUnwindSafe(|| unit.execute(None))) {
                    Ok(Ok(result)) => WorkerReply::Result(result),
                    Ok(Err(error)) => {
                        WorkerReply::Failure(DelayedFailure::capture(&fname, error))
                    }
                    Err(payload) => {
                        WorkerReply::Failure(DelayedFailure::from_panic(&fname, payload))
                    }
                }
            }
            Err(err) => WorkerReply::Failure(DelayedFailure::capture(
                "<protocol>",
                LintError::internal(format!("undecodable work unit: {err}")),
            )),
        };
        let json = serde_json::to_string(&reply)
            .map_err(|err| LintError::internal(format!("failed to encode reply: {err}")))?;
        writeln!(writer, "{json}")
            .and_then(|()| writer.flush())
            .map_err(|err| LintError::internal(format!("controller pipe closed: {err}")))?;
    }

    Ok(())
}
