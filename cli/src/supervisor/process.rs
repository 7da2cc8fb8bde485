// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PID file management, signal delivery, and process-group spawning (§5:
//! child subprocesses run in their own process group so `kill(-pgid, sig)`
//! reaches every descendant).

use crate::config::DaemonConfig;
use crate::supervisor::error::SupervisorError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;

pub fn write_pid_file(config: &DaemonConfig, component: &str, pid: u32) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::write(config.pid_path(component), pid.to_string())
}

pub fn read_pid_file(config: &DaemonConfig, component: &str) -> Option<u32> {
    std::fs::read_to_string(config.pid_path(component))
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

pub fn remove_pid_file(config: &DaemonConfig, component: &str) {
    let _ = std::fs::remove_file(config.pid_path(component));
}

#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
pub fn process_exists(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
pub fn send_signal(pid: u32, signal: i32) -> Result<(), SupervisorError> {
    let result = unsafe { libc::kill(pid as i32, signal) };
    if result != 0 {
        return Err(SupervisorError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Signals the whole process group (negative pid), per §5's process-group
/// requirement — `setpgid(0, 0)` was applied at spawn time via
/// `pre_spawn_hook` so the pid itself is also the pgid.
#[cfg(unix)]
pub fn send_signal_to_group(pid: u32, signal: i32) -> Result<(), SupervisorError> {
    let result = unsafe { libc::kill(-(pid as i32), signal) };
    if result != 0 {
        return Err(SupervisorError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Applied to a `tokio::process::Command` before spawning so the child
/// becomes its own process-group leader (§5).
#[cfg(unix)]
pub fn detach_into_own_group(cmd: &mut tokio::process::Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn detach_into_own_group(_cmd: &mut tokio::process::Command) {}

/// `server start`'s re-exec into a detached background process: a new
/// session (`setsid`) so the daemon outlives the invoking shell.
#[cfg(unix)]
pub fn detach_into_new_session(cmd: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn detach_into_new_session(_cmd: &mut std::process::Command) {}

/// TCP-accept poll health check for networked components (§4.1): 500 ms
/// cadence up to `timeout`.
pub async fn wait_for_port(port: u16, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(500)).await;
    }
}

/// Polls until `pid` exits or `timeout` elapses. Used both by the in-process
/// stop sequence and by `server stop`'s cross-process wait on the daemon pid.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while process_exists(pid) {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(200)).await;
    }
    true
}

/// Worker health: pid alive plus a start-success marker line present in its
/// log file (§4.5: `"worker ready: queue=<name>"`).
pub fn worker_log_has_ready_marker(log_path: &PathBuf) -> bool {
    std::fs::read_to_string(log_path)
        .map(|contents| contents.contains("worker ready:"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        write_pid_file(&config, "backend", 4242).unwrap();
        assert_eq!(read_pid_file(&config, "backend"), Some(4242));
        remove_pid_file(&config, "backend");
        assert_eq!(read_pid_file(&config, "backend"), None);
    }

    #[test]
    fn current_process_is_alive() {
        assert!(process_exists(std::process::id()));
    }

    #[test]
    fn marker_detection_is_substring_based() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("workflow-worker.log");
        std::fs::write(&log, "starting up\nworker ready: queue=workflow_execution_stigmer\n").unwrap();
        assert!(worker_log_has_ready_marker(&log));

        let empty = dir.path().join("empty.log");
        std::fs::write(&empty, "starting up\n").unwrap();
        assert!(!worker_log_has_ready_marker(&empty));
    }

    #[tokio::test]
    async fn wait_for_port_times_out_on_closed_port() {
        let found = wait_for_port(1, Duration::from_millis(50)).await;
        assert!(!found);
    }
}
