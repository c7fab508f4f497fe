//! Give a PROFINET device its IP configuration.
//!
//! Without `--mac` the segment is scanned first and the first
//! unconfigured device (address 0.0.0.0) is picked.

use clap::Parser;
use profidcp::{Dcp, IpConfig, MacAddress};
use std::net::Ipv4Addr;

#[derive(Parser)]
struct Opts {
    /// IP address of the network interface to send from
    #[clap(short, long)]
    ip: String,
    /// MAC address of the device to configure
    #[clap(short, long)]
    mac: Option<MacAddress>,
    /// Address to apply
    #[clap(short, long, default_value = "192.168.0.2")]
    address: String,
    /// Subnet mask to apply
    #[clap(short, long, default_value = "255.255.255.0")]
    subnet_mask: String,
    /// Gateway to apply
    #[clap(short, long, default_value = "192.168.0.1")]
    gateway: String,
    /// Keep the configuration across power cycles
    #[clap(short, long)]
    permanent: bool,
}

fn main() -> Result<(), profidcp::Error> {
    env_logger::init();
    let opts = Opts::parse();

    let config = IpConfig::from_parts(&opts.address, &opts.subnet_mask, &opts.gateway)?;
    let mut dcp = Dcp::open(&opts.ip)?;

    let mac = match opts.mac {
        Some(mac) => mac,
        None => {
            let devices = dcp.identify_all(None)?;
            let unconfigured = devices
                .iter()
                .find(|device| device.ip == Some(Ipv4Addr::UNSPECIFIED) || device.ip.is_none());
            match unconfigured {
                Some(device) => {
                    println!("configuring {device}");
                    device.mac
                }
                None => {
                    eprintln!("no unconfigured device found among {} devices", devices.len());
                    return Ok(());
                }
            }
        }
    };

    let outcome = dcp.set_ip(mac, &config, opts.permanent)?;
    if outcome.is_success() {
        println!("applied {} to {mac}", opts.address);
    } else {
        eprintln!("device refused: {outcome}");
    }
    Ok(())
}
