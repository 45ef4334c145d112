use std::{env, process, sync::Arc};

use crossbeam_channel::bounded;
use tracing::{error, info, warn};

use whep_play::{
    config::{Config, read_config},
    error::WhepClientError,
    logger::init_logger,
    negotiation::run_negotiation,
    peer_connection::PlaybackPeerConnection,
    pipeline::{PipelineController, spawn_render_thread},
    session::Session,
    signaling::WhepHttpClient,
};

#[tokio::main]
async fn main() {
    let Some(endpoint_url) = env::args().nth(1) else {
        eprintln!("Usage: whep-play WHEP-URL");
        eprintln!(
            "Environment: WHEP_PLAY_STUN_SERVERS, WHEP_PLAY_BEARER_TOKEN, WHEP_PLAY_LOGGER_LEVEL, WHEP_PLAY_LOGGER_FORMAT"
        );
        process::exit(1);
    };

    let config = read_config();
    init_logger(config.logger.clone());
    info!("Starting WHEP playback for {endpoint_url}");

    if let Err(err) = run(&config, &endpoint_url).await {
        error!("Playback session failed: {err}");
        process::exit(1);
    }
}

async fn run(config: &Config, endpoint_url: &str) -> Result<(), WhepClientError> {
    let client = WhepHttpClient::new(endpoint_url, &config.bearer_token)?;
    let mut session = Session::new(client.endpoint_url().clone());

    let pc = PlaybackPeerConnection::new(config).await?;
    let negotiation_needed = pc.on_negotiation_needed();

    let (frame_sender, frame_receiver) = bounded(5);
    let controller = Arc::new(PipelineController::new(frame_sender));
    pc.on_media_pad(controller);
    let _render_thread = spawn_render_thread(frame_receiver);

    pc.prepare_video_transceiver().await?;

    let negotiated = tokio::select! {
        result = run_negotiation(&mut session, &pc, &client, negotiation_needed) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            teardown(&pc, &client, &session).await;
            return Ok(());
        }
    };
    if let Err(err) = negotiated {
        teardown(&pc, &client, &session).await;
        return Err(err);
    }

    info!("Playing...");
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "Failed to listen for the interrupt signal");
    }
    info!("Received interrupt, shutting down");
    teardown(&pc, &client, &session).await;
    Ok(())
}

async fn teardown(pc: &PlaybackPeerConnection, client: &WhepHttpClient, session: &Session) {
    if let Some(session_url) = session.session_url() {
        client.delete_session(session_url).await;
    }
    if let Err(err) = pc.close().await {
        warn!(%err, "Failed to close the peer connection");
    }
}
