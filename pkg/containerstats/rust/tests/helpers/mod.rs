// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const BIN: &str = env!("CARGO_BIN_EXE_dd-container-stats");

/// Write a stand-in `docker` that answers `docker stats web ...` with one JSON
/// line per call (memory grows by 100MiB each call) and fails for any other
/// container the way the real CLI does.
pub fn fake_docker(dir: &Path) -> PathBuf {
    let counter = dir.join("calls");
    let script = format!(
        r#"#!/bin/sh
if [ "$1" != "stats" ] || [ "$2" != "web" ]; then
  echo "Error response from daemon: No such container: $2" >&2
  exit 1
fi
n=$(cat '{counter}' 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > '{counter}'
echo "{{\"Container\":\"web\",\"CPUPerc\":\"$n.50%\",\"MemUsage\":\"${{n}}00MiB / 2GiB\",\"MemPerc\":\"5.00%\",\"NetIO\":\"1kB / 2kB\",\"BlockIO\":\"1.2kB / 0B\",\"PIDs\":\"3\"}}"
"#,
        counter = counter.display()
    );
    let path = dir.join("docker");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn command(docker: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.arg("--docker-binary")
        .arg(docker)
        .args(args)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "info")
        .env_remove("DD_CONTAINER_STATS_CONFIG");
    cmd
}

/// Run the binary to completion (for runs that stop on their own).
pub fn run_to_exit(docker: &Path, args: &[&str]) -> Output {
    command(docker, args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run dd-container-stats")
}

/// Handle to a running collector process.
pub struct CollectorHandle {
    child: Child,
    log_lines: Arc<Mutex<Vec<String>>>,
    _stderr_thread: std::thread::JoinHandle<()>,
}

impl CollectorHandle {
    pub fn start(docker: &Path, args: &[&str]) -> Self {
        let mut child = command(docker, args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start dd-container-stats");

        let stderr = child.stderr.take().expect("failed to capture stderr");
        let log_lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let lines_clone = Arc::clone(&log_lines);

        // tracing output goes to stderr.
        let _stderr_thread = std::thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        eprintln!("[collector] {l}");
                        lines_clone.lock().unwrap().push(l);
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            child,
            log_lines,
            _stderr_thread,
        }
    }

    pub fn log_contains(&self, pattern: &str) -> bool {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().any(|l| l.contains(pattern))
    }

    pub fn send_signal(&self, sig: Signal) {
        let pid = self.child.id() as i32;
        signal::kill(Pid::from_raw(pid), sig).expect("failed to send signal to collector");
    }

    /// Send `sig` and wait for the collector to exit. Returns the exit status.
    pub fn stop_with(&mut self, sig: Signal) -> ExitStatus {
        self.send_signal(sig);
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn wait_with_timeout(&mut self, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            match self
                .child
                .try_wait()
                .expect("failed to check collector status")
            {
                Some(status) => return status,
                None => {
                    if Instant::now() >= deadline {
                        self.child.kill().ok();
                        return self.child.wait().expect("failed to wait on killed collector");
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Complete (newline-terminated) lines of `path`; empty if it does not exist.
pub fn record_lines(path: &Path) -> Vec<String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let end = contents.rfind('\n').map_or(0, |i| i + 1);
    contents[..end].lines().map(str::to_string).collect()
}

/// Wait until `path` holds at least `rows` data rows, or timeout.
pub fn wait_for_rows(path: &Path, rows: usize, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if record_lines(path).len() > rows {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
