use std::mem;

use bytes::Bytes;
use webrtc::rtp::{self, codecs::vp8::Vp8Packet, packetizer::Depacketizer};

/// A single encoded VP8 frame reassembled from one or more RTP packets.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Bytes,
    /// RTP timestamp, 90 kHz clock.
    pub pts: u32,
    pub keyframe: bool,
}

/// First stage of the playback chain: strips VP8 payload descriptors and
/// reassembles packets into whole frames.
#[derive(Default)]
pub struct Vp8Depayloader {
    buffer: Vec<Bytes>,
    depacketizer: Vp8Packet,
}

impl Vp8Depayloader {
    pub fn depayload(
        &mut self,
        packet: &rtp::packet::Packet,
    ) -> Result<Option<EncodedFrame>, rtp::Error> {
        let chunk = self.depacketizer.depacketize(&packet.payload)?;
        if chunk.is_empty() {
            return Ok(None);
        }

        self.buffer.push(chunk);
        if !packet.header.marker {
            // the marker bit is set on the last packet of a frame
            return Ok(None);
        }

        let data: Bytes = mem::take(&mut self.buffer).concat().into();
        // lowest bit of the VP8 frame header is the inverse keyframe flag
        let keyframe = data.first().is_some_and(|byte| byte & 0x01 == 0);
        Ok(Some(EncodedFrame {
            data,
            pts: packet.header.timestamp,
            keyframe,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(payload: &[u8], marker: bool, timestamp: u32) -> rtp::packet::Packet {
        rtp::packet::Packet {
            header: rtp::header::Header {
                marker,
                timestamp,
                ..Default::default()
            },
            payload: Bytes::copy_from_slice(payload),
        }
    }

    #[test]
    fn assembles_frame_across_packets() {
        let mut depayloader = Vp8Depayloader::default();

        // 0x10 marks the start of a VP8 partition in the payload descriptor
        let first = packet(&[0x10, 0x00, 0x01, 0x02], false, 9000);
        assert!(depayloader.depayload(&first).unwrap().is_none());

        let last = packet(&[0x00, 0x03, 0x04, 0x05], true, 9000);
        let frame = depayloader.depayload(&last).unwrap().unwrap();

        assert_eq!(frame.data.as_ref(), &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(frame.pts, 9000);
        assert!(frame.keyframe);
    }

    #[test]
    fn detects_interframes() {
        let mut depayloader = Vp8Depayloader::default();

        let only = packet(&[0x10, 0x01, 0xAA, 0xBB], true, 180_000);
        let frame = depayloader.depayload(&only).unwrap().unwrap();

        assert_eq!(frame.data.as_ref(), &[0x01, 0xAA, 0xBB]);
        assert!(!frame.keyframe);
    }

    #[test]
    fn rejects_short_packets() {
        let mut depayloader = Vp8Depayloader::default();
        assert!(depayloader.depayload(&packet(&[0x10], true, 0)).is_err());
    }
}
