use anyhow::Context;
use arez::{ClientConfig, PaladinsApi};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arez=info")),
        )
        .init();

    // PALADINS_DEV_ID / PALADINS_AUTH_KEY, from the environment or a .env file
    let config = ClientConfig::from_env_file("PALADINS").context("loading credentials")?;
    let api = PaladinsApi::new(config)?;

    println!("Ping: {}", api.ping().await?);
    println!("Patch: {}", api.get_patch_info().await?);

    for status in api.get_server_status().await? {
        println!(
            "{} ({}): {}",
            status.platform,
            status.environment,
            if status.up { "UP" } else { "DOWN" }
        );
    }

    let champions = api.get_champions(None).await?;
    println!("Loaded {} champions", champions.len());
    for champion in champions.iter().take(5) {
        println!("  {} - {} ({})", champion.name, champion.title, champion.role);
    }

    if let Some(player_id) = std::env::args().nth(1) {
        let player_id: u64 = player_id.parse().context("player id must be a number")?;
        let player = api.wrap_player(player_id);
        match player.resolve().await {
            Ok(full) => {
                println!("{} (level {}, {:?})", full.name, full.level, full.platform);
                let status = player.get_status().await?;
                println!("  currently {:?}", status.status);
            }
            Err(e) => println!("Could not fetch player {}: {}", player_id, e),
        }
    }

    let usage = api.get_data_used().await?;
    println!(
        "Requests today: {}/{}",
        usage.total_requests_today, usage.request_limit_daily
    );

    api.close().await;
    Ok(())
}
