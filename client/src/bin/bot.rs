//! Headless client that walks in a circle and logs what it sees.

use clap::Parser;
use client::events::SessionEvent;
use client::input::InputSource;
use client::network::NetworkClient;
use log::{info, warn};
use shared::{NetworkConfig, MOVEMENT_SPEED};
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted headless session client")]
struct Args {
    /// Server IP address
    #[arg(long, requires = "port")]
    ip: Option<String>,

    /// Server port
    #[arg(short, long, requires = "ip")]
    port: Option<String>,

    /// Seconds to stay connected, 0 runs until Ctrl+C
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// Radius of the walked circle in world units
    #[arg(short, long, default_value = "3.0")]
    radius: f32,
}

/// Walks counter-clockwise around the origin at the movement speed.
struct CircleWalk {
    radius: f32,
    angle: f32,
}

impl CircleWalk {
    fn advance(&mut self, dt: f32) {
        if self.radius > 0.0 {
            self.angle += MOVEMENT_SPEED * dt / self.radius;
        }
    }
}

impl InputSource for CircleWalk {
    fn local_input_vector(&self) -> (f32, f32) {
        (-self.angle.sin(), self.angle.cos())
    }

    fn current_local_position(&self) -> (f32, f32) {
        (
            self.radius * self.angle.cos(),
            self.radius * self.angle.sin(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = NetworkConfig::from_args(args.ip, args.port)?;
    let mut client = NetworkClient::connect(&config)?;

    let (tx, mut rx) = unbounded_channel();
    client.subscribe(Box::new(tx));

    let mut walk = CircleWalk {
        radius: args.radius,
        angle: 0.0,
    };

    let tick = Duration::from_millis(16);
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run = async {
        let mut warned_silent = false;
        loop {
            ticker.tick().await;
            let dt = tick.as_secs_f32();
            walk.advance(dt);
            client.poll(dt, &walk);

            while let Ok(event) = rx.try_recv() {
                match event {
                    SessionEvent::PeerPositionUpdate(_) => {}
                    other => info!("{:?}", other),
                }
            }

            let silent = client.server_silent();
            if silent && !warned_silent {
                warn!("No response from server at {}", client.server_addr());
            }
            warned_silent = silent;
        }
    };

    if args.duration > 0 {
        tokio::select! {
            _ = run => {}
            _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {
                info!("Finished after {}s", args.duration);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
        }
    } else {
        tokio::select! {
            _ = run => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    Ok(())
}
