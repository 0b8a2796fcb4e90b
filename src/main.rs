use roomcast::{HubConfig, Server, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HubConfig::from_env()?;
    logging::init_tracing(config.log_json);

    tracing::info!(
        port = config.port,
        room_param = %config.room_param,
        user_param = %config.user_param,
        outbound_queue = config.outbound_queue,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        admin = config.admin_token.is_some(),
        "starting roomcast"
    );

    Server::new(config).run().await?;

    Ok(())
}
