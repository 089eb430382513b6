/// The controller's entry-point.
///
/// If no game server is running, this function will periodically try
/// to connect. Whenever the game server stops, this function will panic.
#[tokio::main]
async fn main() {
    use std::sync::Arc;
    use std::time::Duration;

    use dotenv::dotenv;
    use tokio::time::{delay_for, interval, interval_at, Instant};

    use dedisync::config::Config;
    use dedisync::controller::Controller;
    use dedisync::network::{HttpTransport, Transport};
    use dedisync::server::{Calls, RpcConnection};

    // Read environment variables from an '.env' file in the working directory.
    // We use these env vars:
    //  - RUST_LOG
    //  - DEDISYNC_CONFIG
    let using_env_file = dotenv().is_ok();

    env_logger::init(); // Use log::* to write to stderr

    if using_env_file {
        log::info!("using .env file")
    }

    let config = Config::load();

    let retry_after = Duration::from_secs(1);

    log::info!("waiting for dedicated server connection...");
    let mut conn = loop {
        match RpcConnection::new(&config.rpc_address).await {
            None => {
                delay_for(retry_after).await;
                log::debug!("waiting for dedicated server connection...");
            }
            Some(conn) => break conn,
        }
    };
    log::info!("got dedicated server connection");

    let server = Arc::new(conn.client.clone()) as Arc<dyn Calls>;
    server
        .authenticate(&config.rpc_login, &config.rpc_password)
        .await;
    server.set_api_version().await;
    server.enable_callbacks().await;

    let transport = Arc::new(HttpTransport::new(&config.dedimania.url)) as Arc<dyn Transport>;
    let (mut controller, mut completions) =
        Controller::init(&config.dedimania, server, transport).await;

    // The first liveness tick completes immediately, and opens the session.
    let mut liveness_ticks = interval(config.dedimania.liveness_interval());
    let player_update_interval = config.dedimania.player_update_interval();
    let mut player_ticks = interval_at(
        Instant::now() + player_update_interval,
        player_update_interval,
    );

    log::info!("running event loop...");
    loop {
        tokio::select! {
            callback = conn.callbacks.recv() => {
                let callback = callback.expect("callback receiver disconnected");
                controller.on_server_event(callback).await;
            }
            Some(completion) = completions.recv() => {
                controller.on_completion(completion).await;
            }
            _ = liveness_ticks.tick() => {
                controller.on_liveness_tick().await;
            }
            _ = player_ticks.tick() => {
                controller.on_players_tick().await;
            }
        }
    }

    // Here we don't care about explicitly joining the TCP ('conn.tcp_handle')
    // or msg loop ('conn.msg_handle'), and simply run the event loop in the
    // main task until something breaks.
}
