use dma_bench::{measure, AlignedBuffer, RunAccumulator, ThroughputRecord};
use std::env;

/// Parses an optional positional argument, falling back to `default`.
fn optional(arg: Option<&String>, default: u64) -> Result<u64, std::num::ParseIntError> {
    arg.map_or(Ok(default), |s| s.parse())
}

/// Host memory baseline: how fast the aligned buffer itself can be swept.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        let program = env!("CARGO_BIN_NAME");
        return Err(format!("usage: {} SIZE [ITERATIONS] [OFFSET]", program).into());
    }

    let size: u64 = args[0].parse()?;
    let iterations = optional(args.get(1), 16)?;
    let offset = optional(args.get(2), 0)?;

    let mut buffer = AlignedBuffer::allocate(size, offset)?;
    let view = buffer.as_ptr();
    println!("0x{:x} bytes at {:p}", buffer.len(), view);

    let mut accumulator = RunAccumulator::default();
    let mut checksum: usize = 0;
    for i in 0..iterations {
        let (sum, elapsed) = measure(|| {
            buffer.fill(i as u8);
            buffer.chunks_exact(2).fold(0usize, |acc, bs| {
                let word = u16::from_ne_bytes([bs[0], bs[1]]) as usize;
                acc.wrapping_add(word)
            })
        });
        checksum = checksum.wrapping_add(sum);
        accumulator.record(elapsed);
        println!("0x{:x} in {}", checksum, elapsed);
    }

    match accumulator.throughput(size) {
        Some(throughput) => println!("{}", ThroughputRecord { size, throughput }),
        None => println!("no iterations"),
    }
    Ok(())
}
