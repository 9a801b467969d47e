// rescue-client/examples/live_map.rs
// 实时地图示例 - 登录, 拉取初始点位, 订阅 /ws/map/

use rescue_client::logger::init_logger_from_config;
use rescue_client::{ClientConfig, RescueClient, SessionEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = ClientConfig::from_env();
    init_logger_from_config(&config, "info")?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        println!("Usage: {} <identifier> <password>", args[0]);
        println!("  Example: RESCUE_API_BASE=http://127.0.0.1:8000 {} ops@rescue.example secret", args[0]);
        return Ok(());
    }

    let client = RescueClient::new(config)?;
    let user = client.auth().login(&args[1], &args[2]).await?;
    tracing::info!(user = %user.email, "Logged in");

    let channel = client.realtime();
    channel.seed(None).await;
    tracing::info!(points = channel.points().len(), "Seeded");
    channel.connect().await;

    let mut points = channel.subscribe_points();
    let mut state = channel.subscribe_state();
    let mut session = client.subscribe_session();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = points.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = points.borrow_and_update().clone();
                let clusters = snapshot.iter().filter(|p| p.is_cluster()).count();
                tracing::info!(total = snapshot.len(), clusters, "Point set changed");
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!(state = %*state.borrow_and_update(), "Channel state");
            }
            event = session.recv() => {
                if let Ok(SessionEvent::Ended { reason }) = event {
                    tracing::warn!(?reason, "Session ended, log in again");
                    break;
                }
            }
        }
    }

    channel.shutdown().await;
    Ok(())
}
