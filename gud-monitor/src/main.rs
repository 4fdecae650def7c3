//! gud-monitor - print GUD transactions seen on a USB bus
//!
//! Needs read access to `/dev/usbmonN` (`modprobe usbmon`, usually root).
//! Stop with Ctrl+C to get the flush statistics.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use gud_monitor::{signal, MonitorConfig, Observation, Session, UsbmonDevice};

#[derive(Parser)]
#[command(name = "gud-monitor")]
#[command(version)]
#[command(about = "Decode GUD display traffic from usbmon")]
struct Cli {
    /// USB bus number, 0 for all buses
    busnum: Option<u16>,

    /// Follow this device instead of discovering it
    #[arg(long)]
    devnum: Option<u8>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    // CLI overrides
    if let Some(busnum) = cli.busnum {
        config.busnum = busnum;
    }
    if let Some(devnum) = cli.devnum {
        config.devnum = Some(devnum);
    }
    config.debug = config.debug.max(cli.debug);

    // Priority: -d, then RUST_LOG, then "info"
    let log_level = match config.debug {
        0 => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::fmt().with_env_filter(&log_level).init();

    let cancel = signal::install_sigint().context("installing SIGINT handler")?;
    let device = UsbmonDevice::open(config.busnum, config.ring_size)
        .context("is the usbmon module loaded and are you root?")?
        .with_cancel(cancel);

    let devstr = config
        .devnum
        .map_or_else(|| "???".to_string(), |devnum| format!("{:03}", devnum));
    println!("Monitoring: {:03}:{}\n", config.busnum, devstr);

    let mut session = Session::new(device, &config);
    session.run(|observation| match observation {
        Observation::Anomaly(anomaly) => warn!("{}", anomaly),
        other => println!("{}", other),
    })?;

    info!("capture stopped");
    println!("\n{}", session.stats());
    Ok(())
}
