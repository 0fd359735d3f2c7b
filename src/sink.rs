//! Audio sink adapter (C5, §4.5): a thin polymorphic wrapper over an output
//! device. The real output device is an external collaborator (§1
//! Non-goals: "rendering speech locally") — this module defines the
//! contract plus a simulated reference implementation used by the switcher's
//! own tests and by embedders without a real audio backend wired in yet.
//!
//! Grounded in the same observable-signal shape as a teacher-adjacent
//! playback manager (command channel + atomic status flags driving a
//! dedicated thread), adapted here to `tokio::sync::watch` cells so C6 can
//! `.await` signal changes cooperatively instead of polling.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::chunk::DecodedAudio;

/// Lifecycle of the currently loaded media (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Playing,
    Paused,
    Complete,
}

/// Errors surfaced by an audio sink implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("audio buffer decode failed: {0}")]
    Decode(String),
    #[error("output device error: {0}")]
    Device(String),
    #[error("operation not supported by this sink")]
    Unsupported,
}

/// Contract for an audio output device (§4.5, §6 chunk-stream audio output).
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Load a new buffer, resuming playback if the sink was already playing.
    async fn switch_media(&self, bytes: Vec<u8>) -> Result<(), SinkError>;

    /// Optional streaming concatenation onto the currently loaded media.
    async fn append_media(&self, bytes: Vec<u8>) -> Result<(), SinkError> {
        let _ = bytes;
        Err(SinkError::Unsupported)
    }

    fn play(&self);
    fn pause(&self);
    fn set_rate(&self, rate: f32);
    fn clear_media(&self);

    /// Decode opaque audio bytes into samples for visualization. Failure is
    /// non-fatal to playback (§7 DecodeFailure).
    async fn get_audio_buffer(&self, bytes: &[u8]) -> Result<DecodedAudio, SinkError>;

    fn is_playing(&self) -> bool;
    fn current_time(&self) -> Duration;
    fn track_status(&self) -> TrackStatus;

    /// Observe `is_playing` transitions (§4.6 rising/falling edge reactions).
    fn subscribe_is_playing(&self) -> watch::Receiver<bool>;
    /// Observe `track_status` transitions (§4.6 `complete` reaction).
    fn subscribe_track_status(&self) -> watch::Receiver<TrackStatus>;
}

struct State {
    media_len: usize,
    duration: Duration,
    current_time: Duration,
    rate: f32,
}

/// Reference [`AudioSink`] with no real output device: playback time is
/// advanced manually via [`SimulatedAudioSink::advance`], matching the
/// "advance sink currentTime by 1s" framing of the end-to-end scenarios
/// (§8). Useful for tests and for hosts that have not wired in a real
/// device yet.
pub struct SimulatedAudioSink {
    state: Mutex<State>,
    is_playing_tx: watch::Sender<bool>,
    track_status_tx: watch::Sender<TrackStatus>,
}

impl SimulatedAudioSink {
    pub fn new() -> Self {
        let (is_playing_tx, _) = watch::channel(false);
        let (track_status_tx, _) = watch::channel(TrackStatus::Paused);
        Self {
            state: Mutex::new(State {
                media_len: 0,
                duration: Duration::ZERO,
                current_time: Duration::ZERO,
                rate: 1.0,
            }),
            is_playing_tx,
            track_status_tx,
        }
    }

    /// Test/sim-only: declare the duration of the most recently switched
    /// media. A real sink derives this from the decoded bytes.
    pub fn set_simulated_duration(&self, duration: Duration) {
        self.state.lock().unwrap().duration = duration;
    }

    /// Test/sim-only: advance the simulated playback clock by a wall-clock
    /// amount, scaled by the configured rate, completing the track when it
    /// reaches `duration`.
    pub fn advance(&self, wall_clock: Duration) {
        if !*self.is_playing_tx.borrow() {
            return;
        }
        let mut st = self.state.lock().unwrap();
        let scaled = Duration::from_secs_f64(wall_clock.as_secs_f64() * st.rate as f64);
        st.current_time = (st.current_time + scaled).min(st.duration);
        let reached_end = st.current_time >= st.duration && st.duration > Duration::ZERO;
        drop(st);
        if reached_end {
            let _ = self.track_status_tx.send(TrackStatus::Complete);
        }
    }
}

impl Default for SimulatedAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for SimulatedAudioSink {
    async fn switch_media(&self, bytes: Vec<u8>) -> Result<(), SinkError> {
        let was_playing = *self.is_playing_tx.borrow();
        {
            let mut st = self.state.lock().unwrap();
            st.media_len = bytes.len();
            st.current_time = Duration::ZERO;
        }
        let _ = self
            .track_status_tx
            .send(if was_playing { TrackStatus::Playing } else { TrackStatus::Paused });
        Ok(())
    }

    fn play(&self) {
        let _ = self.is_playing_tx.send(true);
        let _ = self.track_status_tx.send(TrackStatus::Playing);
    }

    fn pause(&self) {
        let _ = self.is_playing_tx.send(false);
        let _ = self.track_status_tx.send(TrackStatus::Paused);
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
    }

    fn clear_media(&self) {
        let mut st = self.state.lock().unwrap();
        st.media_len = 0;
        st.current_time = Duration::ZERO;
        st.duration = Duration::ZERO;
        drop(st);
        let _ = self.is_playing_tx.send(false);
    }

    async fn get_audio_buffer(&self, bytes: &[u8]) -> Result<DecodedAudio, SinkError> {
        if bytes.is_empty() {
            return Err(SinkError::Decode("empty buffer".to_string()));
        }
        // Simulated decode: a real sink would parse the codec; the
        // simulated sink returns silence so callers can exercise the
        // visualization path without a codec dependency.
        Ok(std::sync::Arc::from(vec![0.0f32; bytes.len()]))
    }

    fn is_playing(&self) -> bool {
        *self.is_playing_tx.borrow()
    }

    fn current_time(&self) -> Duration {
        self.state.lock().unwrap().current_time
    }

    fn track_status(&self) -> TrackStatus {
        *self.track_status_tx.borrow()
    }

    fn subscribe_is_playing(&self) -> watch::Receiver<bool> {
        self.is_playing_tx.subscribe()
    }

    fn subscribe_track_status(&self) -> watch::Receiver<TrackStatus> {
        self.track_status_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_exactly_once_when_duration_elapses() {
        let sink = SimulatedAudioSink::new();
        sink.switch_media(vec![1, 2, 3]).await.unwrap();
        sink.set_simulated_duration(Duration::from_secs(1));
        sink.play();

        assert_eq!(sink.track_status(), TrackStatus::Playing);
        sink.advance(Duration::from_millis(1100));
        assert_eq!(sink.track_status(), TrackStatus::Complete);
    }

    #[tokio::test]
    async fn switching_media_resets_track_status() {
        let sink = SimulatedAudioSink::new();
        sink.switch_media(vec![1]).await.unwrap();
        sink.set_simulated_duration(Duration::from_secs(1));
        sink.play();
        sink.advance(Duration::from_secs(2));
        assert_eq!(sink.track_status(), TrackStatus::Complete);

        sink.switch_media(vec![2]).await.unwrap();
        assert_eq!(sink.track_status(), TrackStatus::Playing);
        assert_eq!(sink.current_time(), Duration::ZERO);
    }

    #[tokio::test]
    async fn rate_scales_simulated_advance() {
        let sink = SimulatedAudioSink::new();
        sink.switch_media(vec![1]).await.unwrap();
        sink.set_simulated_duration(Duration::from_secs(5));
        sink.set_rate(2.0);
        sink.play();
        sink.advance(Duration::from_millis(2500));
        assert_eq!(sink.track_status(), TrackStatus::Complete);
    }
}
