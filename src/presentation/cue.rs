//! User-facing cue played when a single-shot recognition starts

use std::io::Write;

/// Plays the shutter cue. Called from the decode worker thread.
pub trait ShutterCue: Send {
    fn play(&self);
}

/// No cue at all
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl ShutterCue for SilentCue {
    fn play(&self) {}
}

/// Rings the terminal bell
#[derive(Debug, Default, Clone, Copy)]
pub struct BellCue;

impl ShutterCue for BellCue {
    fn play(&self) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}
