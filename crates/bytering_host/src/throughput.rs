use anyhow::{Context, Result, ensure};
use bytering_core::{RingBuffer, RingError, SpinLock};
use rayon::prelude::*;
use std::time::Instant;

/// Round-trips `rounds` chunks through one buffer and returns the number of
/// bytes that came back intact.
fn round_trip(id: usize, capacity: usize, rounds: usize, chunk: usize) -> Result<u64, RingError> {
    let rb = RingBuffer::<SpinLock>::new(capacity)?;
    let mut src = vec![0u8; chunk];
    let mut dst = vec![0u8; chunk];
    let mut verified = 0u64;

    for round in 0..rounds {
        let fill = (id.wrapping_mul(31) ^ round) as u8;
        src.fill(fill);
        rb.write(&src)?;
        rb.read(&mut dst)?;
        if dst == src {
            verified += chunk as u64;
        }
    }
    Ok(verified)
}

/// Total bytes a run moves, or `None` if it does not fit in a `u64`.
fn total_bytes(buffers: usize, rounds: usize, chunk: usize) -> Option<u64> {
    (buffers as u64)
        .checked_mul(rounds as u64)?
        .checked_mul(chunk as u64)
}

pub fn run_benchmark(capacity: usize, buffers: usize, rounds: usize, chunk: usize) -> Result<()> {
    ensure!(chunk > 0, "chunk size must be nonzero");
    ensure!(
        chunk < capacity,
        "chunk of {} bytes does not fit a {}-byte buffer",
        chunk,
        capacity
    );
    let expected = total_bytes(buffers, rounds, chunk).with_context(|| {
        format!(
            "{} buffers x {} rounds x {} bytes overflows the byte counter",
            buffers, rounds, chunk
        )
    })?;

    println!(
        "Starting Benchmark (Parallel - Rayon): {} buffers x {} rounds x {} bytes",
        buffers, rounds, chunk
    );
    let start_bench = Instant::now();

    let verified: u64 = (0..buffers)
        .into_par_iter()
        .map(|id| round_trip(id, capacity, rounds, chunk))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .sum();

    let duration = start_bench.elapsed();
    let seconds = duration.as_secs_f64();
    let throughput = verified as f64 / seconds / (1024.0 * 1024.0);

    println!("Results");
    println!("Time: {:.4} s", seconds);
    println!("Throughput: {:.2} MiB/s", throughput);
    println!("Verified: {}/{} bytes", verified, expected);

    ensure!(verified == expected, "{} bytes corrupted", expected - verified);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies_every_byte() {
        assert_eq!(round_trip(3, 64, 100, 40), Ok(4_000));
    }

    #[test]
    fn benchmark_rejects_oversized_chunk() {
        assert!(run_benchmark(64, 2, 10, 64).is_err());
        assert!(run_benchmark(64, 2, 10, 0).is_err());
        assert!(run_benchmark(60, 2, 10, 8).is_err());
    }

    #[test]
    fn byte_total_overflow_is_detected() {
        assert_eq!(total_bytes(8, 200, 100), Some(160_000));
        assert_eq!(total_bytes(usize::MAX, usize::MAX, 2), None);
        assert!(run_benchmark(64, usize::MAX, usize::MAX, 8).is_err());
    }

    #[test]
    fn small_benchmark_succeeds() {
        run_benchmark(256, 8, 200, 100).unwrap();
    }
}
