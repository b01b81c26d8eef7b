/// Image frame loading module
///
/// This module handles:
/// - Listing folders (experiments, wells) under the image root
/// - Enumerating a well's frame files in playback order
/// - Decoding frames to display handles off the UI thread

pub mod loader;
