//! Cooperative subprocess supervision (spec.md §4.A), grounded on
//! `original_source/pilot/control/data.py`'s `_call()`: every second, polled
//! as ten 100 ms sub-ticks, the shutdown signal is checked; on shutdown the
//! child is sent a graceful termination signal, given 3 seconds to exit, then
//! killed outright.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use pilot_common::error::{PilotError, Result};
use pilot_common::shutdown::Shutdown;
use tracing::{debug, error, info};

const POLL_SUB_TICK: Duration = Duration::from_millis(100);
const POLL_SUB_TICKS_PER_SECOND: usize = 10;
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Outcome of a supervised subprocess run.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs `argv[0]` with the remaining elements as arguments, in `cwd`,
/// cooperatively cancellable via `cancel`.
///
/// Mirrors `_call()`: the process is polled every second (as ten 100 ms
/// sub-ticks checking `cancel`); once `cancel` is observed, SIGTERM is sent,
/// the process is given 3 seconds to exit, then SIGKILL. Success means exit
/// code 0.
pub fn run(argv: &[String], cwd: &Path, cancel: &Shutdown) -> Result<CommandOutcome> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PilotError::CommandExecError("empty argv".into()))?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| {
            error!("could not execute {}: {}", program, e);
            PilotError::CommandExecError(format!("could not execute {program}: {e}"))
        })?;

    let pid = child.id();
    info!("started -- pid={} executable={}", pid, program);

    loop {
        let mut cancelled = false;
        for _ in 0..POLL_SUB_TICKS_PER_SECOND {
            if cancel.is_set() {
                cancelled = true;
                break;
            }
            thread::sleep(POLL_SUB_TICK);
        }

        if cancelled {
            debug!("breaking: sending SIGTERM pid={}", pid);
            send_sigterm(&child);
            debug!("breaking: sleep 3s before sending SIGKILL pid={}", pid);
            thread::sleep(KILL_GRACE_PERIOD);
            let _ = child.kill();
            break;
        }

        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => continue,
            Err(e) => {
                error!("error polling pid={}: {}", pid, e);
                break;
            }
        }
    }

    // A single `wait_with_output` both reaps the (already-exited-or-killed)
    // child and collects its buffered stdout/stderr; calling `wait()` a
    // second time on an already-reaped child would fail.
    let output = child
        .wait_with_output()
        .map_err(|e| PilotError::CommandExecError(format!("failed to collect output: {e}")))?;
    let exit_code = output.status.code();
    info!("finished -- pid={} exit_code={:?}", pid, exit_code);

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    debug!("stdout:\n{}", stdout);
    debug!("stderr:\n{}", stderr);

    Ok(CommandOutcome {
        success: exit_code == Some(0),
        stdout,
        stderr,
        exit_code,
    })
}

/// Indirection over [`run`] so the stage-in/stage-out drivers can be
/// exercised against a fake transfer tool in tests instead of a real
/// subprocess.
pub trait TransferRunner: Send + Sync {
    fn run(&self, argv: &[String], cwd: &Path, cancel: &Shutdown) -> Result<CommandOutcome>;
}

/// Production runner: spawns the real subprocess via [`run`].
pub struct SystemTransferRunner;

impl TransferRunner for SystemTransferRunner {
    fn run(&self, argv: &[String], cwd: &Path, cancel: &Shutdown) -> Result<CommandOutcome> {
        run(argv, cwd, cancel)
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    unsafe {
        libc::kill(child.id() as i32, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {}
