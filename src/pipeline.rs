use std::{
    sync::{Arc, Mutex},
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};
use webrtc::{api::media_engine::MIME_TYPE_VP8, track::track_remote::TrackRemote};

use crate::{
    depayloader::{EncodedFrame, Vp8Depayloader},
    error::PipelineLinkError,
};

/// Events traveling down the media chain.
#[derive(Debug)]
pub enum PipelineEvent<T> {
    Data(T),
    Eos,
}

/// A media pad emitted by the engine once a track is flowing.
pub struct MediaPadContext {
    pub track: Arc<TrackRemote>,
}

/// Wires an incoming media pad through the fixed playback chain
/// (depayload, decode, render), exactly once per session.
///
/// Link failures are reported to the caller and never affect the
/// negotiation; the two concerns are independent.
pub struct PipelineController {
    linked: Mutex<bool>,
    frame_sender: Sender<PipelineEvent<EncodedFrame>>,
}

impl PipelineController {
    pub fn new(frame_sender: Sender<PipelineEvent<EncodedFrame>>) -> Self {
        Self {
            linked: Mutex::new(false),
            frame_sender,
        }
    }

    pub fn on_media_pad_available(&self, ctx: MediaPadContext) -> Result<(), PipelineLinkError> {
        let mime_type = ctx.track.codec().capability.mime_type;
        self.claim_link(&mime_type)?;

        info!(%mime_type, "Linking media pad into the playback chain");
        tokio::spawn(run_media_chain(ctx.track, self.frame_sender.clone()));
        Ok(())
    }

    /// A failed claim leaves the gate open, only a successful link
    /// consumes it. A second pad after that is the unsupported
    /// multi-track case.
    fn claim_link(&self, mime_type: &str) -> Result<(), PipelineLinkError> {
        let mut linked = self.linked.lock().unwrap();
        if *linked {
            return Err(PipelineLinkError::AlreadyLinked);
        }
        if !mime_type.eq_ignore_ascii_case(MIME_TYPE_VP8) {
            return Err(PipelineLinkError::UnsupportedCodec(mime_type.to_string()));
        }
        *linked = true;
        Ok(())
    }
}

async fn run_media_chain(
    track: Arc<TrackRemote>,
    frame_sender: Sender<PipelineEvent<EncodedFrame>>,
) {
    let mut depayloader = Vp8Depayloader::default();
    loop {
        let packet = match track.read_rtp().await {
            Ok((packet, _)) => packet,
            Err(err) => {
                debug!(%err, "Media pad closed");
                break;
            }
        };
        trace!(?packet, "Received RTP packet");

        let frame = match depayloader.depayload(&packet) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                warn!(%err, "Failed to depayload RTP packet");
                continue;
            }
        };

        if frame_sender.send(PipelineEvent::Data(frame)).is_err() {
            debug!("Failed to send frame, channel closed");
            return;
        }
    }
    let _ = frame_sender.send(PipelineEvent::Eos);
}

/// Stand-in for the renderer collaborator: drains the frame channel and
/// reports what would be decoded and displayed.
pub fn spawn_render_thread(
    frame_receiver: Receiver<PipelineEvent<EncodedFrame>>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("Render loop".to_string())
        .spawn(move || {
            for event in frame_receiver.iter() {
                match event {
                    PipelineEvent::Data(frame) => {
                        debug!(
                            len = frame.data.len(),
                            pts = frame.pts,
                            keyframe = frame.keyframe,
                            "Rendering frame"
                        );
                    }
                    PipelineEvent::Eos => break,
                }
            }
            debug!("Render loop finished");
        })
        .unwrap()
}
