//! Walkthrough of a single write/read cycle on a small buffer.

use anyhow::{Context, Result, ensure};
use bytering_core::{RingBuffer, StdLock};

const MESSAGE: &[u8] = b"1234567890";

fn print_state(rb: &RingBuffer<StdLock>) {
    println!("Occupied: {} bytes", rb.occupied_length());
    println!("Empty:    {}", rb.is_empty());
    println!("Full:     {}", rb.is_full());
}

pub fn run_demo(capacity: usize) -> Result<()> {
    ensure!(
        capacity > MESSAGE.len(),
        "capacity {} cannot hold the {}-byte demo message",
        capacity,
        MESSAGE.len()
    );

    let mut rb = RingBuffer::<StdLock>::new(capacity)
        .with_context(|| format!("failed to create ring buffer of {} bytes", capacity))?;
    println!("Ring buffer: {} bytes ({} usable)", rb.capacity(), rb.usable_capacity());

    println!("Writing: {}", String::from_utf8_lossy(MESSAGE));
    rb.write(MESSAGE).context("demo write failed")?;
    print_state(&rb);

    let mut out = vec![0u8; MESSAGE.len()];
    rb.read(&mut out).context("demo read failed")?;
    println!("Read:    {}", String::from_utf8_lossy(&out));
    print_state(&rb);

    rb.destroy();
    println!("Released ring buffer.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_on_default_capacity() {
        run_demo(16).unwrap();
    }

    #[test]
    fn demo_rejects_small_or_invalid_capacity() {
        assert!(run_demo(8).is_err());
        assert!(run_demo(24).is_err());
    }
}
