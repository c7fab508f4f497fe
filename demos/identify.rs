//! Scan the segment for PROFINET devices and print what answers.

use clap::Parser;
use profidcp::{Dcp, MacAddress};
use std::time::Duration;

#[derive(Parser)]
struct Opts {
    /// IP address of the network interface to scan from
    #[clap(short, long)]
    ip: String,
    /// Identify a single device instead of the whole segment
    #[clap(short, long)]
    mac: Option<MacAddress>,
    /// How many seconds to collect responses for
    #[clap(short, long)]
    timeout: Option<u64>,
}

fn main() -> Result<(), profidcp::Error> {
    env_logger::init();
    let opts = Opts::parse();

    let mut dcp = Dcp::open(&opts.ip)?;
    match opts.mac {
        Some(mac) => {
            let device = dcp.identify(mac)?;
            println!("{device}");
        }
        None => {
            let timeout = opts.timeout.map(Duration::from_secs);
            let devices = dcp.identify_all(timeout)?;
            if devices.is_empty() {
                println!("no devices answered");
            }
            for device in devices {
                println!("{device}");
            }
        }
    }
    Ok(())
}
