use crate::LockArg;
use crate::stats::OpStats;
use anyhow::{Context, Result, bail};
use bytering_core::{FullPolicy, RawLock, RingBuffer, RingConfig, RingError, SpinLock, StdLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    pub capacity: usize,
    pub ops: usize,
    pub policy: FullPolicy,
    pub seed: u64,
}

/// Outcome of one writer/reader run.
#[derive(Debug, Default)]
pub struct StreamReport {
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Bytes whose value broke the writer's counter sequence.
    pub mismatches: u64,
    /// Largest occupancy seen by the monitor.
    pub peak_occupancy: usize,
    pub residual: usize,
    pub elapsed: Duration,
}

pub fn run_stream(cfg: StreamConfig, lock: LockArg) -> Result<()> {
    println!("RING BUFFER STREAM");
    println!("Capacity: {} bytes", cfg.capacity);
    println!("Ops:      {} per side", cfg.ops);
    println!("Policy:   {:?}", cfg.policy);
    println!("Lock:     {:?}", lock);
    println!("Seed:     {}", cfg.seed);
    println!("-------------------------------");

    let report = match lock {
        LockArg::Std => stream_with::<StdLock>(cfg)?,
        LockArg::Spin => stream_with::<SpinLock>(cfg)?,
    };

    println!("\nElapsed:   {:?}", report.elapsed);
    println!("Written:   {} bytes", report.bytes_written);
    println!("Read:      {} bytes", report.bytes_read);
    println!("Residual:  {} bytes", report.residual);
    println!("Peak:      {} bytes", report.peak_occupancy);
    println!("Mismatch:  {} bytes", report.mismatches);

    if cfg.policy == FullPolicy::Reject && report.mismatches > 0 {
        bail!("{} bytes read out of order", report.mismatches);
    }
    println!("Done.");
    Ok(())
}

/// Runs one writer and one reader thread against a shared buffer.
///
/// The writer fills each chunk with a running byte counter, so the reader can
/// check ordering without a side channel. A rejected write leaves the counter
/// where it was. Under the overwrite policy evicted bytes show up as gaps, and
/// mismatches are counted but expected.
pub fn stream_with<L>(cfg: StreamConfig) -> Result<StreamReport>
where
    L: RawLock + Send + Sync + 'static,
{
    let max_chunk = (cfg.capacity / 2).max(1);
    let ring_cfg = RingConfig::new(cfg.capacity).with_policy(cfg.policy);
    let rb = Arc::new(
        RingBuffer::<L>::with_config(ring_cfg)
            .with_context(|| format!("failed to create {}-byte ring buffer", cfg.capacity))?,
    );

    let running = Arc::new(AtomicBool::new(true));
    let mismatches = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let rb_prod = rb.clone();
    let producer = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut stats = OpStats::new("Write");
        let mut chunk = vec![0u8; max_chunk];
        let mut next: u8 = 0;

        for _ in 0..cfg.ops {
            let len = rng.gen_range(1..=max_chunk);
            for (i, b) in chunk[..len].iter_mut().enumerate() {
                *b = next.wrapping_add(i as u8);
            }

            let t = Instant::now();
            let res = rb_prod.write(&chunk[..len]);
            let ns = t.elapsed().as_nanos() as u64;

            match res {
                Ok(()) => next = next.wrapping_add(len as u8),
                Err(RingError::InsufficientSpace) => thread::yield_now(),
                Err(e) => log::warn!("write of {} bytes failed: {}", len, e),
            }
            stats.update(ns, len, res.is_ok());
        }
        stats
    });

    let rb_cons = rb.clone();
    let m_cons = mismatches.clone();
    let consumer = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(cfg.seed.rotate_left(17));
        let mut stats = OpStats::new("Read");
        let mut out = vec![0u8; max_chunk];
        let mut expected: u8 = 0;

        for _ in 0..cfg.ops {
            let len = rng.gen_range(1..=max_chunk);

            let t = Instant::now();
            let res = rb_cons.read(&mut out[..len]);
            let ns = t.elapsed().as_nanos() as u64;

            match res {
                Ok(()) => {
                    for &b in &out[..len] {
                        if b != expected {
                            m_cons.fetch_add(1, Ordering::Relaxed);
                        }
                        // Resynchronize so one gap counts once.
                        expected = b.wrapping_add(1);
                    }
                }
                Err(RingError::InsufficientData) => thread::yield_now(),
                Err(e) => log::warn!("read of {} bytes failed: {}", len, e),
            }
            stats.update(ns, len, res.is_ok());
        }
        stats
    });

    let rb_mon = rb.clone();
    let r_mon = running.clone();
    let monitor = thread::spawn(move || {
        let mut peak = 0;
        while r_mon.load(Ordering::Relaxed) {
            let len = rb_mon.occupied_length();
            peak = peak.max(len);
            thread::sleep(Duration::from_micros(50));
        }
        peak
    });

    let write_stats = producer
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))?;
    let read_stats = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("reader thread panicked"))?;
    running.store(false, Ordering::Relaxed);
    let peak_occupancy = monitor
        .join()
        .map_err(|_| anyhow::anyhow!("monitor thread panicked"))?;

    let elapsed = start.elapsed();
    write_stats.print_report();
    read_stats.print_report();

    let report = StreamReport {
        bytes_written: write_stats.bytes,
        bytes_read: read_stats.bytes,
        mismatches: mismatches.load(Ordering::Relaxed),
        peak_occupancy,
        residual: rb.occupied_length(),
        elapsed,
    };
    log::debug!("stream report: {:?}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(policy: FullPolicy, seed: u64) -> StreamConfig {
        StreamConfig {
            capacity: 1024,
            ops: 1000,
            policy,
            seed,
        }
    }

    #[test]
    fn reject_stream_preserves_order() {
        for seed in [1, 2, 3] {
            let report = stream_with::<StdLock>(cfg(FullPolicy::Reject, seed)).unwrap();
            assert_eq!(report.mismatches, 0);
            assert!(report.bytes_read <= report.bytes_written);
            assert_eq!(
                report.residual as u64,
                report.bytes_written - report.bytes_read
            );
            assert!(report.peak_occupancy <= 1023);
        }
    }

    #[test]
    fn spin_lock_stream_preserves_order() {
        let report = stream_with::<SpinLock>(cfg(FullPolicy::Reject, 9)).unwrap();
        assert_eq!(report.mismatches, 0);
    }

    #[test]
    fn overwrite_stream_completes() {
        let report = stream_with::<StdLock>(cfg(FullPolicy::Overwrite, 5)).unwrap();
        assert!(report.residual <= 1023);
    }

    #[test]
    fn invalid_capacity_is_an_error() {
        let mut c = cfg(FullPolicy::Reject, 0);
        c.capacity = 1000;
        assert!(stream_with::<StdLock>(c).is_err());
    }
}
