use clap::Parser;
use client::input::KeyboardInput;
use client::network::NetworkClient;
use client::rendering::{PresentationState, Renderer, UiConfig};
use log::{error, info};
use macroquad::prelude::*;
use shared::{NetworkConfig, MOVEMENT_SPEED};
use tokio::sync::mpsc::unbounded_channel;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address
    #[arg(long, requires = "port")]
    ip: Option<String>,

    /// Server port
    #[arg(short = 'p', long, requires = "ip")]
    port: Option<String>,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,

    /// Movement speed in world units per second
    #[arg(short = 's', long, default_value_t = MOVEMENT_SPEED)]
    speed: f32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Session client".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = match NetworkConfig::from_args(args.ip, args.port) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid server address: {}", e);
            return;
        }
    };

    let mut client = match NetworkClient::connect_with_speed(&config, args.speed) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to start client: {}", e);
            return;
        }
    };
    info!("Connecting to {}", client.server_addr());
    info!("Controls: WASD/arrows to move, P to toggle prediction, Esc to quit");

    let (tx, mut rx) = unbounded_channel();
    client.subscribe(Box::new(tx));

    let renderer = Renderer::new(args.width, args.height);
    let mut state = PresentationState::new();
    let mut input = KeyboardInput::new((0.0, 0.0), args.speed);
    let mut prediction_enabled = true;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        if is_key_pressed(KeyCode::P) {
            prediction_enabled = !prediction_enabled;
            client.session_mut().set_prediction_enabled(prediction_enabled);
            info!("Prediction: {}", prediction_enabled);
        }

        let dt = get_frame_time();
        input.update(dt);
        client.poll(dt, &input);

        while let Ok(event) = rx.try_recv() {
            state.apply(event);
        }

        renderer.render(
            &state,
            input.position(),
            UiConfig {
                server_time: client.server_time(),
                server_silent: client.server_silent(),
                prediction_enabled,
            },
        );

        next_frame().await;
    }
}
