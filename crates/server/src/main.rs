mod config;
mod server;

use anyhow::Result;
use clap::Parser;

use config::RelayConfig;
use server::RelayServer;

#[derive(Parser)]
#[command(name = "gecko-server")]
#[command(about = "Pose replication relay for gecko clients")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = gecko::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 32)]
    max_peers: usize,

    #[arg(long, default_value_t = 120, help = "Seconds of silence before a peer is dropped")]
    timeout_secs: u64,

    #[arg(long, default_value_t = 120, help = "Inbound poll rate in Hz")]
    poll_rate: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = RelayConfig {
        max_peers: args.max_peers,
        timeout_secs: args.timeout_secs,
        poll_rate: args.poll_rate,
    };

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let mut relay = RelayServer::new(&bind_addr, config)?;
    relay.run();
    Ok(())
}
