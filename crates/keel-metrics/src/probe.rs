//! Host utilisation probes.
//!
//! `ProcfsProbe` samples CPU and memory from procfs and disk usage via
//! `statvfs(3)`. CPU utilisation is computed from the delta against the
//! previous sample, so the probe never sleeps; the first call reports the
//! average since boot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("host probe unsupported on this platform")]
    Unsupported,
}

/// Raw utilisation percentages returned by a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl HostUsage {
    /// Clamp every field into `[0, 100]`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            cpu_percent: clamp_percent(self.cpu_percent),
            memory_percent: clamp_percent(self.memory_percent),
            disk_percent: clamp_percent(self.disk_percent),
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Source of host CPU/memory/disk utilisation.
pub trait HostProbe: Send + Sync {
    fn sample(&self) -> Result<HostUsage, ProbeError>;
}

/// Probe that always reports the same values.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub HostUsage);

impl HostProbe for StaticProbe {
    fn sample(&self) -> Result<HostUsage, ProbeError> {
        Ok(self.0)
    }
}

// ── procfs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

/// Linux probe backed by `/proc` and `statvfs`.
pub struct ProcfsProbe {
    proc_root: PathBuf,
    disk_path: PathBuf,
    last_cpu: Mutex<Option<CpuTimes>>,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new("/proc", "/")
    }
}

impl ProcfsProbe {
    pub fn new(proc_root: impl Into<PathBuf>, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            disk_path: disk_path.into(),
            last_cpu: Mutex::new(None),
        }
    }

    fn read(&self, name: &str) -> Result<String, ProbeError> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| ProbeError::Io { path, source })
    }

    fn cpu_percent(&self) -> Result<f64, ProbeError> {
        let current = parse_cpu_times(&self.read("stat")?)?;
        let mut last = self.last_cpu.lock();
        let (busy, total) = match *last {
            Some(prev) if current.total > prev.total => (
                current.busy.saturating_sub(prev.busy),
                current.total - prev.total,
            ),
            _ => (current.busy, current.total),
        };
        *last = Some(current);
        Ok(ratio_percent(busy, total))
    }

    fn memory_percent(&self) -> Result<f64, ProbeError> {
        parse_memory_percent(&self.read("meminfo")?)
    }
}

impl HostProbe for ProcfsProbe {
    fn sample(&self) -> Result<HostUsage, ProbeError> {
        Ok(HostUsage {
            cpu_percent: self.cpu_percent()?,
            memory_percent: self.memory_percent()?,
            disk_percent: disk_usage_percent(&self.disk_path)?,
        })
    }
}

fn ratio_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Fields: user nice system idle iowait irq softirq steal [guest guest_nice].
/// Guest time is already counted in user/nice, so only the first eight
/// fields contribute to the total.
fn parse_cpu_times(stat: &str) -> Result<CpuTimes, ProbeError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ProbeError::Parse {
            what: "/proc/stat",
            detail: "missing aggregate cpu line".to_string(),
        })?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProbeError::Parse {
            what: "/proc/stat",
            detail: e.to_string(),
        })?;

    if fields.len() < 4 {
        return Err(ProbeError::Parse {
            what: "/proc/stat",
            detail: format!("expected at least 4 cpu fields, got {}", fields.len()),
        });
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// `1 - MemAvailable / MemTotal`, as a percentage.
fn parse_memory_percent(meminfo: &str) -> Result<f64, ProbeError> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find_map(|l| l.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|v| v.parse().ok())
    };

    let total = field("MemTotal").ok_or_else(|| ProbeError::Parse {
        what: "/proc/meminfo",
        detail: "missing MemTotal".to_string(),
    })?;
    let available = field("MemAvailable").ok_or_else(|| ProbeError::Parse {
        what: "/proc/meminfo",
        detail: "missing MemAvailable".to_string(),
    })?;

    Ok(ratio_percent(total.saturating_sub(available), total))
}

/// Used fraction of the filesystem holding `path`, as reported to
/// unprivileged users (`used / (used + avail)`).
#[cfg(unix)]
fn disk_usage_percent(path: &Path) -> Result<f64, ProbeError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| ProbeError::Parse {
        what: "disk path",
        detail: e.to_string(),
    })?;

    // SAFETY: statvfs is a plain C struct for which all-zero is a valid value.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: c_path is a valid NUL-terminated string and stat outlives the call.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ProbeError::Io {
            path: path.to_path_buf(),
            source: io::Error::last_os_error(),
        });
    }

    let frsize = stat.f_frsize as u64;
    let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64) * frsize;
    let avail = stat.f_bavail as u64 * frsize;
    Ok(ratio_percent(used, used + avail))
}

#[cfg(not(unix))]
fn disk_usage_percent(_path: &Path) -> Result<f64, ProbeError> {
    Err(ProbeError::Unsupported)
}
