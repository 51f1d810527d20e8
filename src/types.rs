use serde::{Deserialize, Serialize};

/// Summary of a single raw read, written by the driver as a JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadSummary {
    pub source: String,
    pub host: Option<String>,
    pub read_flags: u32,
    pub record_offset: u32,
    pub buffer_size: u32,
    pub min_bytes_needed: u32,
    pub bytes_dumped: usize,
    pub collected_at: u64,
}
