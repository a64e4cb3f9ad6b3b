use clap::Parser;
use std::path::PathBuf;

use dma_bench::config::{DEFAULT_COUNT, DEFAULT_DEVICE, DEFAULT_SIZE};
use dma_bench::{Scenario, TransferConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Timed DMA transfers against a device node", long_about = None)]
pub struct Cli {
    /// device name
    #[arg(short, long, default_value = DEFAULT_DEVICE)]
    pub device: PathBuf,
    /// the start address on the AXI bus
    #[arg(short, long, value_parser = parse_integer, default_value_t = 0)]
    pub address: u64,
    /// size of a single transfer in bytes
    #[arg(short, long, value_parser = parse_integer, default_value_t = DEFAULT_SIZE)]
    pub size: u64,
    /// page offset of transfer
    #[arg(short, long, value_parser = parse_integer, default_value_t = 0)]
    pub offset: u64,
    /// number of transfers
    #[arg(short, long, value_parser = parse_integer, default_value_t = DEFAULT_COUNT)]
    pub count: u64,
    /// filename to read the data from (ignored for read scenario)
    #[arg(short = 'f', long)]
    pub infile: Option<PathBuf>,
    /// filename to write the data of the transfers
    #[arg(short = 'w', long)]
    pub outfile: Option<PathBuf>,
    /// verbose output
    #[arg(short, long)]
    pub verbose: bool,
    /// use read scenario (write scenario without this flag)
    #[arg(short, long)]
    pub read: bool,
}

impl Cli {
    pub fn to_config(&self) -> TransferConfig {
        let scenario = if self.read {
            Scenario::Read
        } else {
            Scenario::Write
        };
        let mut config = TransferConfig::new(&self.device)
            .with_address(self.address)
            .with_size(self.size)
            .with_offset(self.offset)
            .with_count(self.count)
            .with_scenario(scenario)
            .with_verbose(self.verbose);
        if let Some(path) = &self.infile {
            config = config.with_infile(path);
        }
        if let Some(path) = &self.outfile {
            config = config.with_outfile(path);
        }
        config
    }
}

/// C-style integer: `0x` hex, leading `0` octal, decimal otherwise.
pub fn parse_integer(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    u64::from_str_radix(digits, radix).map_err(|e| format!("invalid integer '{}': {}", s, e))
}
