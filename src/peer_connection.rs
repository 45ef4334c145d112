use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error};
use webrtc::{
    api::{
        APIBuilder, interceptor_registry::register_default_interceptors,
        media_engine::MediaEngine,
    },
    ice_transport::{
        ice_connection_state::RTCIceConnectionState, ice_server::RTCIceServer,
    },
    interceptor::registry::Registry,
    peer_connection::{
        RTCPeerConnection, configuration::RTCConfiguration,
        sdp::session_description::RTCSessionDescription,
    },
    rtp_transceiver::{
        RTCRtpTransceiverInit, rtp_codec::RTPCodecType,
        rtp_transceiver_direction::RTCRtpTransceiverDirection,
    },
};

use crate::{
    config::Config,
    error::WhepClientError,
    negotiation::NegotiationEngine,
    pipeline::{MediaPadContext, PipelineController},
};

/// Recv-only peer connection playing back a single remote video track.
#[derive(Debug, Clone)]
pub struct PlaybackPeerConnection {
    pc: Arc<RTCPeerConnection>,
}

impl PlaybackPeerConnection {
    pub async fn new(config: &Config) -> Result<Self, WhepClientError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.stun_servers.to_vec(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        peer_connection.on_ice_connection_state_change(Box::new(
            move |connection_state: RTCIceConnectionState| {
                debug!("Connection state has changed {connection_state}.");
                Box::pin(async {})
            },
        ));

        Ok(Self {
            pc: peer_connection,
        })
    }

    /// Registers the negotiation trigger. The engine decides when
    /// negotiation starts; the returned receiver resolves once.
    pub fn on_negotiation_needed(&self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        let mut sender = Some(sender);
        self.pc.on_negotiation_needed(Box::new(move || {
            if let Some(sender) = sender.take() {
                let _ = sender.send(());
            }
            Box::pin(async {})
        }));
        receiver
    }

    /// Adding a recv-only video transceiver marks the connection as
    /// needing negotiation, which fires the trigger above.
    pub async fn prepare_video_transceiver(&self) -> Result<(), WhepClientError> {
        self.pc
            .add_transceiver_from_kind(
                RTPCodecType::Video,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(())
    }

    /// Hands every emitted media pad to the pipeline controller. Link
    /// failures are reported here and never affect the negotiation.
    pub fn on_media_pad(&self, controller: Arc<PipelineController>) {
        self.pc.on_track(Box::new(move |track, _, _| {
            let ctx = MediaPadContext { track };
            if let Err(err) = controller.on_media_pad_available(ctx) {
                error!(%err, "Failed to link media pad");
            }
            Box::pin(async {})
        }));
    }

    pub async fn close(&self) -> Result<(), webrtc::Error> {
        self.pc.close().await
    }
}

#[async_trait]
impl NegotiationEngine for PlaybackPeerConnection {
    async fn set_remote_description(
        &self,
        offer: RTCSessionDescription,
    ) -> Result<(), WhepClientError> {
        self.pc
            .set_remote_description(offer)
            .await
            .map_err(WhepClientError::RemoteDescriptionError)
    }

    async fn create_answer(&self) -> Result<RTCSessionDescription, WhepClientError> {
        self.pc
            .create_answer(None)
            .await
            .map_err(WhepClientError::AnswerCreationError)
    }

    async fn set_local_description(
        &self,
        answer: RTCSessionDescription,
    ) -> Result<(), WhepClientError> {
        self.pc
            .set_local_description(answer)
            .await
            .map_err(WhepClientError::LocalDescriptionError)
    }
}
