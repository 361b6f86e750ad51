use crate::types::{CodecParameters, OutputTrackMap, TrackDescriptor, TrackKind};

/// The canonical output shape, taken from the first input.
///
/// At most one video and one audio track. A kind missing here is never copied from any input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackCatalog {
    pub video: Option<CodecParameters>,
    pub audio: Option<CodecParameters>,
    pub rotation_hint: Option<u32>,
}

impl TrackCatalog {
    pub fn derive_from_first_source(tracks: &[TrackDescriptor]) -> Self {
        let first = |kind: TrackKind| tracks.iter().find(|t| t.kind == kind);
        let video = first(TrackKind::Video);
        let audio = first(TrackKind::Audio);

        Self {
            video: video.map(|t| t.codec.clone()),
            audio: audio.map(|t| t.codec.clone()),
            rotation_hint: video.and_then(|t| t.rotation_hint),
        }
    }

    pub fn codec(&self, kind: TrackKind) -> Option<&CodecParameters> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Other => None,
        }
    }

    /// Output track ids in registration order: video first, then audio.
    pub fn track_map(&self) -> OutputTrackMap {
        let mut ids = 1..;
        OutputTrackMap {
            video: self.video.as_ref().and_then(|_| ids.next()),
            audio: self.audio.as_ref().and_then(|_| ids.next()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp4_box::boxes::stsd::SampleEntry;

    fn track(index: usize, kind: TrackKind, format: &[u8; 4], rotation: Option<u32>) -> TrackDescriptor {
        TrackDescriptor {
            local_index: index,
            kind,
            codec: CodecParameters {
                sample_entry: SampleEntry::from_body(*format, &[index as u8; 16]),
                timescale: 90_000,
                width: 0,
                height: 0,
                language: "und".into(),
                handler_name: String::new(),
            },
            duration_hint_us: Some(1_000_000),
            rotation_hint: rotation,
        }
    }

    #[test]
    fn first_track_of_each_kind_wins() {
        let tracks = vec![
            track(0, TrackKind::Other, b"tmcd", None),
            track(1, TrackKind::Audio, b"mp4a", None),
            track(2, TrackKind::Video, b"avc1", Some(90)),
            track(3, TrackKind::Video, b"hvc1", Some(180)),
            track(4, TrackKind::Audio, b"ac-3", None),
        ];
        let catalog = TrackCatalog::derive_from_first_source(&tracks);
        assert_eq!(&catalog.video.as_ref().unwrap().sample_entry.format, b"avc1");
        assert_eq!(&catalog.audio.as_ref().unwrap().sample_entry.format, b"mp4a");
        assert_eq!(catalog.rotation_hint, Some(90));
        assert!(catalog.codec(TrackKind::Other).is_none());
        assert_eq!(catalog.track_map(), OutputTrackMap { video: Some(1), audio: Some(2) });
    }

    #[test]
    fn derivation_is_repeatable() {
        let tracks = vec![track(0, TrackKind::Video, b"avc1", Some(270)), track(1, TrackKind::Audio, b"mp4a", None)];
        assert_eq!(
            TrackCatalog::derive_from_first_source(&tracks),
            TrackCatalog::derive_from_first_source(&tracks)
        );
    }

    #[test]
    fn missing_kinds_stay_absent() {
        let catalog = TrackCatalog::derive_from_first_source(&[track(0, TrackKind::Video, b"avc1", None)]);
        assert!(catalog.audio.is_none());
        assert_eq!(catalog.rotation_hint, None);
        assert_eq!(catalog.track_map(), OutputTrackMap { video: Some(1), audio: None });

        let audio_only = TrackCatalog::derive_from_first_source(&[track(0, TrackKind::Audio, b"mp4a", None)]);
        assert_eq!(audio_only.track_map(), OutputTrackMap { video: None, audio: Some(1) });

        let empty = TrackCatalog::derive_from_first_source(&[track(0, TrackKind::Other, b"text", None)]);
        assert!(empty.is_empty());
    }
}
