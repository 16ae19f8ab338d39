//! Process and host sampling backed by `/proc`.
//!
//! Values are read on demand; nothing is cached. On platforms without `/proc`
//! (or when a field is missing) the value is reported as 0.

use std::fs;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{GaugeFn, MetricRegistry};
use crate::error::Result;

/// Memory of the current process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    /// Resident set size (`VmRSS`).
    pub rss: u64,
    /// Data segment size (`VmData`).
    pub vm_data: u64,
    /// Anonymous resident pages (`RssAnon`).
    pub rss_anon: u64,
    /// File-backed resident pages (`RssFile`).
    pub rss_file: u64,
}

/// Host memory, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemMemory {
    pub total: u64,
    pub available: u64,
}

/// Parse `Key:   1234 kB` lines into bytes.
fn kb_field(text: &str, key: &str) -> u64 {
    text.lines()
        .find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix(':')?;
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            Some(kb * 1024)
        })
        .unwrap_or(0)
}

fn read_proc(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::trace!(path, error = %e, "proc read failed");
            None
        }
    }
}

pub fn process_memory() -> ProcessMemory {
    let Some(status) = read_proc("/proc/self/status") else {
        return ProcessMemory::default();
    };
    ProcessMemory {
        rss: kb_field(&status, "VmRSS"),
        vm_data: kb_field(&status, "VmData"),
        rss_anon: kb_field(&status, "RssAnon"),
        rss_file: kb_field(&status, "RssFile"),
    }
}

pub fn system_memory() -> SystemMemory {
    let Some(info) = read_proc("/proc/meminfo") else {
        return SystemMemory::default();
    };
    SystemMemory {
        total: kb_field(&info, "MemTotal"),
        available: kb_field(&info, "MemAvailable"),
    }
}

pub fn hostname() -> String {
    read_proc("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Wall-clock time as unix seconds.
pub fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Register `process_resident_memory_bytes` and `process_start_time_seconds`.
pub fn register_process_metrics(registry: &MetricRegistry, start_unix_secs: f64) -> Result<()> {
    registry.register(Arc::new(GaugeFn::new(
        "process_resident_memory_bytes",
        "Resident memory size in bytes.",
        || process_memory().rss as f64,
    )?))?;
    registry.register(Arc::new(GaugeFn::new(
        "process_start_time_seconds",
        "Start time of the process since unix epoch in seconds.",
        move || start_unix_secs,
    )?))?;
    Ok(())
}
