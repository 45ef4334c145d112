use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, info};
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::{
    error::WhepClientError,
    session::{NegotiationPhase, Session},
    signaling::{SdpOffer, WhepHttpClient},
};

/// The asynchronous operations the negotiation needs from the WebRTC
/// engine.
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    async fn set_remote_description(
        &self,
        offer: RTCSessionDescription,
    ) -> Result<(), WhepClientError>;

    async fn create_answer(&self) -> Result<RTCSessionDescription, WhepClientError>;

    async fn set_local_description(
        &self,
        answer: RTCSessionDescription,
    ) -> Result<(), WhepClientError>;
}

/// Drives the session from `Idle` to `AnswerSubmitted`.
///
/// Fetches the remote offer, waits for the engine to request
/// negotiation, then runs the remaining steps in strict order. The
/// caller owns the session for the whole sequence, so no two
/// transitions can race. Any failure marks the session `Failed`; the
/// session is single-shot and not resumable.
pub async fn run_negotiation<E: NegotiationEngine>(
    session: &mut Session,
    engine: &E,
    client: &WhepHttpClient,
    negotiation_needed: oneshot::Receiver<()>,
) -> Result<(), WhepClientError> {
    match drive(session, engine, client, negotiation_needed).await {
        Ok(()) => Ok(()),
        Err(err) => {
            session.fail();
            Err(err)
        }
    }
}

async fn drive<E: NegotiationEngine>(
    session: &mut Session,
    engine: &E,
    client: &WhepHttpClient,
    negotiation_needed: oneshot::Receiver<()>,
) -> Result<(), WhepClientError> {
    debug_assert_eq!(session.phase(), NegotiationPhase::Idle);

    let SdpOffer { offer, session_url } = client.fetch_offer().await?;
    session.offer_fetched(offer.clone(), session_url.clone());
    info!("Fetched remote offer, session resource: {session_url}");

    // The engine decides when negotiation starts.
    if negotiation_needed.await.is_err() {
        return Err(WhepClientError::EngineClosed);
    }
    debug!("Engine requested negotiation");

    let offer = RTCSessionDescription::offer(offer).map_err(WhepClientError::InvalidSdpOffer)?;
    engine.set_remote_description(offer).await?;
    session.remote_description_set();

    let answer = engine.create_answer().await?;
    if answer.sdp.trim().is_empty() {
        return Err(WhepClientError::NoAnswerGenerated);
    }
    // serialize for transport before the commit, so the submitted text
    // is exactly the committed description
    let answer_sdp = answer.sdp.clone();
    session.answer_created(answer_sdp.clone());
    debug!("SDP answer: {answer_sdp}");

    engine.set_local_description(answer).await?;
    session.local_description_set();

    client.submit_answer(&session_url, &answer_sdp).await?;
    session.answer_submitted();
    info!("Answer accepted, negotiation complete");

    Ok(())
}
