use clap::Parser;
use log::{error, info};
use server::network::Server;
use shared::{NetworkConfig, MAX_CONNECTIONS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiplayer session server")]
struct Args {
    /// IP address to bind to
    #[arg(long, requires = "port")]
    ip: Option<String>,
    /// Port to listen on
    #[arg(short, long, requires = "ip")]
    port: Option<String>,
    /// Ticks per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,
    /// Peers accepted before new connections are declined
    #[arg(short, long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = NetworkConfig::from_args(args.ip, args.port)?.socket_addr()?;
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64);

    let mut server = Server::bind(addr, tick_duration, args.max_connections).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
