//! Per-operation latency tracking for ring buffer runs.
//!
//! Records how long each write or read call took, including time spent
//! waiting for the lock, and summarizes min/avg/max plus a power-of-two
//! histogram. Updates are plain arithmetic so measurement stays cheap next to
//! the operation being measured.

/// Number of histogram buckets. Bucket `i` covers `[2^i, 2^(i+1))` ns; the
/// last bucket also takes everything slower.
pub const BUCKETS: usize = 24;

/// Latency and outcome counters for one kind of operation.
pub struct OpStats {
    pub label: &'static str,
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    /// Calls that returned an error (full buffer, not enough data).
    pub failed: u64,
    /// Bytes moved by successful calls.
    pub bytes: u64,
    pub buckets: [u64; BUCKETS],
}

impl OpStats {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            failed: 0,
            bytes: 0,
            buckets: [0; BUCKETS],
        }
    }

    /// Records one call that took `nanos` and moved `bytes` (zero on failure).
    pub fn update(&mut self, nanos: u64, bytes: usize, ok: bool) {
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        self.sum += nanos;
        self.count += 1;
        if ok {
            self.bytes += bytes as u64;
        } else {
            self.failed += 1;
        }
        self.buckets[bucket_index(nanos)] += 1;
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub fn succeeded(&self) -> u64 {
        self.count - self.failed
    }

    pub fn print_report(&self) {
        println!("\n{} latency", self.label);
        println!(
            "Calls: {} ({} ok, {} failed), {} bytes",
            self.count,
            self.succeeded(),
            self.failed,
            self.bytes
        );
        if self.count == 0 {
            return;
        }
        println!("Min:   {} ns", self.min);
        println!("Avg:   {:.1} ns", self.avg());
        println!("Max:   {} ns", self.max);

        println!("Distribution:");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let lower = 1u64 << i;
            if i == BUCKETS - 1 {
                println!("[>= {:>9} ns]: {}", lower, count);
            } else {
                println!("[{:>9}-{:<9} ns]: {}", lower, lower << 1, count);
            }
        }
    }
}

/// Maps a latency onto its log2 bucket; zero lands in the first bucket.
pub fn bucket_index(nanos: u64) -> usize {
    let log2 = (u64::BITS - 1).saturating_sub(nanos.max(1).leading_zeros()) as usize;
    log2.min(BUCKETS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_log2() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(1), 0);
        assert_eq!(bucket_index(2), 1);
        assert_eq!(bucket_index(3), 1);
        assert_eq!(bucket_index(1024), 10);
        assert_eq!(bucket_index(u64::MAX), BUCKETS - 1);
    }

    #[test]
    fn update_tracks_extremes_and_failures() {
        let mut s = OpStats::new("write");
        assert_eq!(s.avg(), 0.0);

        s.update(100, 10, true);
        s.update(300, 0, false);
        s.update(200, 5, true);

        assert_eq!(s.min, 100);
        assert_eq!(s.max, 300);
        assert_eq!(s.count, 3);
        assert_eq!(s.failed, 1);
        assert_eq!(s.succeeded(), 2);
        assert_eq!(s.bytes, 15);
        assert_eq!(s.avg(), 200.0);
        assert_eq!(s.buckets.iter().sum::<u64>(), 3);
    }
}
