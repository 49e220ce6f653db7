/*!
 * Procfs Memory Probe
 * Samples resident memory of the current process on Linux
 */

use super::{MemoryProbe, MemoryUsage};
use crate::core::limits::PROC_PAGE_SIZE;
use log::debug;
use std::path::PathBuf;

/// Memory probe backed by `/proc/self/statm` and `/proc/meminfo`
///
/// `used` is resident set size, `total` is virtual size, `limit` is the
/// machine's total memory. Returns `None` wherever procfs is unreadable.
#[derive(Debug, Clone)]
pub struct ProcMemoryProbe {
    statm: PathBuf,
    meminfo: PathBuf,
    page_size: u64,
}

impl ProcMemoryProbe {
    pub fn new() -> Self {
        Self::with_paths("/proc/self/statm", "/proc/meminfo")
    }

    pub fn with_paths(statm: impl Into<PathBuf>, meminfo: impl Into<PathBuf>) -> Self {
        Self {
            statm: statm.into(),
            meminfo: meminfo.into(),
            page_size: PROC_PAGE_SIZE,
        }
    }

    /// Whether the probe can produce samples on this host
    pub fn is_supported(&self) -> bool {
        self.statm.exists()
    }
}

impl Default for ProcMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcMemoryProbe {
    fn sample(&self) -> Option<MemoryUsage> {
        let statm = match std::fs::read_to_string(&self.statm) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("Memory probe unavailable: {}", e);
                return None;
            }
        };
        let (total_pages, resident_pages) = parse_statm(&statm)?;

        let limit_bytes = std::fs::read_to_string(&self.meminfo)
            .ok()
            .and_then(|m| parse_meminfo_total(&m))
            .unwrap_or(0);

        Some(MemoryUsage {
            used_bytes: resident_pages * self.page_size,
            total_bytes: total_pages * self.page_size,
            limit_bytes,
        })
    }
}

/// Parse `(size, resident)` page counts from a statm line
pub fn parse_statm(contents: &str) -> Option<(u64, u64)> {
    let mut fields = contents.split_whitespace();
    let size = fields.next()?.parse().ok()?;
    let resident = fields.next()?.parse().ok()?;
    Some((size, resident))
}

/// Parse `MemTotal` from meminfo, in bytes
pub fn parse_meminfo_total(contents: &str) -> Option<u64> {
    contents
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}
