use clap::Parser;
use mstp_bridge::{MstpBridge, PortParams, SimulatedLink, DEFAULT_CAPACITY};
use std::path::PathBuf;
use std::time::Duration;

/// Runs the bridge over a simulated MS/TP segment, so the channel side
/// can be exercised without RS-485 hardware. Frames the consumer sends
/// are reflected back from a simulated peer station.
#[derive(Parser, Debug)]
#[command(name = "mstp-bridge-sim")]
struct Args {
    /// Directory holding the bridge and peer sockets.
    #[arg(long)]
    dir: PathBuf,
    #[arg(long, default_value = "/dev/ttyS2")]
    device: String,
    #[arg(long, default_value_t = 25)]
    mac: u8,
    #[arg(long, default_value_t = 38400)]
    baud: u32,
    #[arg(long, default_value_t = 127)]
    max_master: u8,
    #[arg(long, default_value_t = 1)]
    max_info_frames: u8,
    /// Station address the simulated peer answers from.
    #[arg(long, default_value_t = 16)]
    peer_mac: u8,
    /// Seconds between stats reports.
    #[arg(long, default_value_t = 10)]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let bridge = MstpBridge::open(&args.dir, DEFAULT_CAPACITY)?;
    let (link, mut segment) = SimulatedLink::new();
    let params = PortParams {
        mac_address: args.mac,
        max_master: args.max_master,
        baud_rate: args.baud,
        max_info_frames: args.max_info_frames,
    };
    let index = bridge.register_port(&args.device, params, link).await?;
    let slot = bridge.lookup(index)?;
    println!(
        "port {index} registered: server socket {} peer socket {}",
        bridge.endpoint_path().display(),
        slot.peer_path().display()
    );

    let peer_mac = args.peer_mac;
    let echo = tokio::spawn(async move {
        while let Some((dest, payload)) = segment.next_sent().await {
            log::info!("wire: {} octets to {dest}", payload.len());
            segment.inject(peer_mac, &payload);
        }
    });

    println!("Reporting stats every {}s (Ctrl+C to stop)...", args.stats_interval);
    let mut ticker = tokio::time::interval(Duration::from_secs(args.stats_interval));
    ticker.tick().await; // first tick fires immediately
    loop {
        ticker.tick().await;
        for stats in bridge.stats() {
            println!("{}", serde_json::to_string(&stats)?);
        }
        if echo.is_finished() {
            break;
        }
    }
    bridge.shutdown_all().await;
    bridge.stop();
    Ok(())
}
