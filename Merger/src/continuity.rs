use crate::types::TrackKind;

#[derive(Clone, Copy, Debug, Default)]
struct KindState {
    offset_us: i64,
    max_observed_us: i64,
    gap_us: i64,
}

/// Per-kind timestamp offsets that keep playback continuous across input files.
///
/// Video and audio advance independently. `Other` has no state and always reads 0.
#[derive(Clone, Debug)]
pub struct ContinuityTracker {
    video: KindState,
    audio: KindState,
}

impl ContinuityTracker {
    pub fn new(video_gap_us: i64, audio_gap_us: i64) -> Self {
        Self {
            video: KindState { gap_us: video_gap_us, ..Default::default() },
            audio: KindState { gap_us: audio_gap_us, ..Default::default() },
        }
    }

    fn state(&self, kind: TrackKind) -> Option<&KindState> {
        match kind {
            TrackKind::Video => Some(&self.video),
            TrackKind::Audio => Some(&self.audio),
            TrackKind::Other => None,
        }
    }

    fn state_mut(&mut self, kind: TrackKind) -> Option<&mut KindState> {
        match kind {
            TrackKind::Video => Some(&mut self.video),
            TrackKind::Audio => Some(&mut self.audio),
            TrackKind::Other => None,
        }
    }

    /// Offset to add to every timestamp of `kind` in the current file.
    pub fn current_offset(&self, kind: TrackKind) -> i64 {
        self.state(kind).map_or(0, |s| s.offset_us)
    }

    /// Highest post-offset timestamp written so far.
    pub fn max_observed(&self, kind: TrackKind) -> i64 {
        self.state(kind).map_or(0, |s| s.max_observed_us)
    }

    /// Records a timestamp as written to the output, offset included.
    pub fn observe(&mut self, kind: TrackKind, written_us: i64) {
        if let Some(state) = self.state_mut(kind) {
            state.max_observed_us = state.max_observed_us.max(written_us);
        }
    }

    /// Moves the offset of `kind` one gap past everything written so far.
    pub fn advance_for_next_file(&mut self, kind: TrackKind) {
        if let Some(state) = self.state_mut(kind) {
            state.offset_us = state.offset_us.max(state.max_observed_us + state.gap_us);
        }
    }
}
