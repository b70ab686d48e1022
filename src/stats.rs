// Per-handle compression counters.
//
// Field names follow the transport's handle statistics so they can be
// reported side by side with link counters.

use std::time::Duration;

/// Min/max/total of a timed operation, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeStats {
    pub samples: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub total_us: u64,
}

impl TimeStats {
    pub(crate) fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if self.samples == 0 || us < self.min_us {
            self.min_us = us;
        }
        self.max_us = self.max_us.max(us);
        self.total_us = self.total_us.saturating_add(us);
        self.samples += 1;
    }

    /// Mean time per sample, 0 when nothing was recorded.
    pub fn avg_us(&self) -> u64 {
        self.total_us.checked_div(self.samples).unwrap_or(0)
    }
}

/// Snapshot of a handle's compression activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressStats {
    /// Packets sent compressed.
    pub tx_compressed_packets: u64,
    /// Payload bytes before compression, for packets sent compressed.
    pub tx_compressed_original_bytes: u64,
    /// Bytes after compression.
    pub tx_compressed_size_bytes: u64,
    /// Packets sent uncompressed while a model was configured.
    pub tx_passthrough_packets: u64,
    /// Compression attempts that failed with an error.
    pub tx_failed_to_compress: u64,
    pub tx_compress_time: TimeStats,

    /// Packets successfully decompressed.
    pub rx_compressed_packets: u64,
    /// Bytes received compressed.
    pub rx_compressed_size_bytes: u64,
    /// Bytes after decompression.
    pub rx_compressed_original_bytes: u64,
    /// Decompression attempts that failed.
    pub rx_failed_to_decompress: u64,
    pub rx_decompress_time: TimeStats,
}

impl CompressStats {
    /// Compressed bytes over original bytes for outgoing traffic, 1.0 when
    /// nothing was compressed.
    pub fn tx_ratio(&self) -> f64 {
        if self.tx_compressed_original_bytes == 0 {
            return 1.0;
        }
        self.tx_compressed_size_bytes as f64 / self.tx_compressed_original_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_stats_track_extremes() {
        let mut t = TimeStats::default();
        assert_eq!(t.avg_us(), 0);
        t.record(Duration::from_micros(30));
        t.record(Duration::from_micros(10));
        t.record(Duration::from_micros(20));
        assert_eq!(t.samples, 3);
        assert_eq!(t.min_us, 10);
        assert_eq!(t.max_us, 30);
        assert_eq!(t.avg_us(), 20);
    }

    #[test]
    fn ratio_without_traffic() {
        let stats = CompressStats::default();
        assert_eq!(stats.tx_ratio(), 1.0);
        let stats = CompressStats {
            tx_compressed_original_bytes: 200,
            tx_compressed_size_bytes: 50,
            ..Default::default()
        };
        assert_eq!(stats.tx_ratio(), 0.25);
    }
}
