// src/runner/signal.rs

//! Platform signalling helpers for the runner.

#[cfg(unix)]
mod imp {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    /// Request graceful shutdown: SIGINT to the process group, falling back
    /// to the single process when the group cannot be signalled. ESRCH means
    /// the process is already gone.
    pub fn interrupt_process(pid: u32) {
        let pid = Pid::from_raw(pid as i32);
        match killpg(pid, Signal::SIGINT) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(_) => {
                let _ = kill(pid, Signal::SIGINT);
            }
        }
    }

    /// Force kill: SIGKILL to the process group, then the process itself as
    /// a second attempt.
    pub fn kill_process(pid: u32) {
        let pid = Pid::from_raw(pid as i32);
        let _ = killpg(pid, Signal::SIGKILL);
        let _ = kill(pid, Signal::SIGKILL);
    }
}

#[cfg(windows)]
mod imp {
    /// Windows cannot deliver an interrupt to another process without a
    /// console attach; the forceful path is the effective stop.
    pub fn interrupt_process(_pid: u32) {}

    /// Kill the process tree with taskkill, the closest equivalent of a
    /// process-group SIGKILL.
    pub fn kill_process(pid: u32) {
        let _ = std::process::Command::new("taskkill")
            .args(["/T", "/F", "/PID", &pid.to_string()])
            .output();
    }
}

pub use imp::{interrupt_process, kill_process};
