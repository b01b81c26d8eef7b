/// Session state module
///
/// This module handles all dashboard state, including:
/// - The Play/Resume/Stop/Clear playback state machine (playback.rs)
/// - Accumulated measurement rows and per-well history (series.rs)
/// - The session context tying both together (session.rs)

pub mod playback;
pub mod series;
pub mod session;
