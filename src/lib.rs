//! WHEP playback client.
//!
//! Establishes a single WebRTC session with a remote media server by
//! exchanging an SDP offer/answer pair over plain HTTP, then feeds the
//! received video track into the playback chain.

pub mod config;
pub mod depayloader;
pub mod error;
pub mod logger;
pub mod negotiation;
pub mod peer_connection;
pub mod pipeline;
pub mod session;
pub mod signaling;
