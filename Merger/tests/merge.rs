mod common;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use tokio_util::sync::CancellationToken;
use video_merge::catalog::TrackCatalog;
use video_merge::progress::{no_progress, ProgressEvent};
use video_merge::source::{default_opener, SourceOpener, SourceReader};
use video_merge::{merge_videos, MergeConfig, MergeError, MergeOrchestrator, MergeRequest, MergeResult};

const VIDEO_GAP: i64 = 33_000;
const AUDIO_GAP: i64 = 23_000;

fn run(opener: &dyn SourceOpener, config: &MergeConfig, inputs: &[String], output: &Path) -> Result<MergeResult, MergeError> {
    MergeOrchestrator::new(opener, config, no_progress(), None).run(inputs, output.to_str().unwrap())
}

fn pts(track: &OutputTrack) -> Vec<i64> {
    track.samples.iter().map(|(pts, _)| *pts).collect()
}

fn assert_non_decreasing(values: &[i64]) {
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "not monotonic: {:?}", values);
}

#[test]
fn two_video_inputs_are_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 5_000)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(4, 5_000)]);
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[a, b], &output).unwrap();
    assert_eq!(result.video_samples, 7);
    assert_eq!(result.audio_samples, 0);
    assert!(result.skipped_inputs.is_empty());

    let tracks = read_output(&output);
    assert_eq!(tracks.len(), 1);
    let video = &tracks[0];
    assert_eq!(&video.handler, b"vide");
    assert_eq!(pts(video), vec![0, 5_000, 10_000, 43_000, 48_000, 53_000, 58_000]);
    assert!(video.duration >= 25_000);
    assert!(pts(video)[3..].iter().all(|&t| t >= 10_000 + VIDEO_GAP));

    // Payloads are copied verbatim, in source order.
    let payloads: Vec<Vec<u8>> = video.samples.iter().map(|(_, p)| p.clone()).collect();
    let expected: Vec<Vec<u8>> = (0..3)
        .map(|i| payload("a.mp4", 0, i))
        .chain((0..4).map(|i| payload("b.mp4", 0, i)))
        .collect();
    assert_eq!(payloads, expected);
}

#[test]
fn video_and_audio_keep_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(5, 33_333).rotated(90), audio(8, 23_220)]);
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[a], &output).unwrap();
    assert_eq!((result.video_samples, result.audio_samples), (5, 8));

    let tracks = read_output(&output);
    assert_eq!(tracks.len(), 2);
    assert_eq!(&tracks[0].handler, b"vide");
    assert_eq!(&tracks[1].handler, b"soun");
    assert_eq!(tracks[0].rotation, Some(90));
    assert_eq!(tracks[0].timescale, TIMESCALE);
}

#[test]
fn timestamps_increase_across_every_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<String> = (0..3)
        .map(|i| write_mp4(dir.path(), &format!("{}.mp4", i), &[video(6 + i, 33_333), audio(10, 23_220)]))
        .collect();
    let output = dir.path().join("out.mp4");

    run(&default_opener(), &MergeConfig::default(), &inputs, &output).unwrap();
    let tracks = read_output(&output);

    for (track, per_file, gap) in [(&tracks[0], vec![6, 7, 8], VIDEO_GAP), (&tracks[1], vec![10, 10, 10], AUDIO_GAP)] {
        let times = pts(track);
        assert_non_decreasing(&times);
        let mut start = 0;
        for pair in per_file.windows(2) {
            let previous = &times[start..start + pair[0]];
            let next_first = times[start + pair[0]];
            let previous_max = *previous.iter().max().unwrap();
            assert!(next_first > previous_max);
            assert_eq!(next_first, previous_max + gap);
            start += pair[0];
        }
    }
}

#[test]
fn reordered_frames_keep_their_composition_offsets() {
    let dir = tempfile::tempdir().unwrap();
    // I P B B in decode order.
    let reordered = || video(8, 40_000).with_composition(vec![40_000, 120_000, 0, 0]);
    let a = write_mp4(dir.path(), "a.mp4", &[reordered()]);
    let b = write_mp4(dir.path(), "b.mp4", &[reordered()]);
    let output = dir.path().join("out.mp4");

    run(&default_opener(), &MergeConfig::default(), &[a, b], &output).unwrap();

    let moov = mp4_box::reader::read_moov(&mut std::fs::File::open(&output).unwrap()).unwrap();
    assert!(moov.traks[0].mdia.minf.stbl.ctts.is_some());

    let times = pts(&read_output(&output)[0]);
    let first = vec![40_000, 160_000, 80_000, 120_000, 200_000, 320_000, 240_000, 280_000];
    assert_eq!(times[..8], first[..]);
    // The second file starts one gap after the highest presentation time, not the last one.
    let offset = 320_000 + VIDEO_GAP;
    let second: Vec<i64> = first.iter().map(|t| t + offset).collect();
    assert_eq!(times[8..], second[..]);
    assert!(times[8..].iter().min().unwrap() > times[..8].iter().max().unwrap());
}

#[test]
fn later_inputs_are_rescaled_to_the_first_timescale() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 1001).with_timescale(30_000)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(3, 3003).with_timescale(90_000)]);
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[a, b], &output).unwrap();
    assert_eq!(result.video_samples, 6);

    let video = &read_output(&output)[0];
    assert_eq!(video.timescale, 30_000);
    // 66_733 us is the last time of the first file; the second starts at 99_733 us.
    assert_eq!(pts(video), vec![0, 1001, 2002, 2992, 3993, 4994]);
    let micros: Vec<i64> = pts(video).iter().map(|t| t * 1_000_000 / 30_000).collect();
    assert!(micros[3] >= 66_733 + VIDEO_GAP - 33);
    assert_eq!(video.samples[3].1, payload("b.mp4", 0, 0));
}

#[test]
fn duration_is_the_sum_of_the_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(30, 33_333), audio(43, 23_220)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(30, 33_333), audio(43, 23_220)]);
    let output = dir.path().join("out.mp4");

    run(&default_opener(), &MergeConfig::default(), &[a, b], &output).unwrap();
    let tracks = read_output(&output);

    let video_sum = 2 * 30 * 33_333i64;
    assert!((tracks[0].duration as i64 - video_sum).abs() <= VIDEO_GAP);
    let audio_sum = 2 * 43 * 23_220i64;
    assert!((tracks[1].duration as i64 - audio_sum).abs() <= AUDIO_GAP);
}

#[test]
fn shape_is_fixed_by_the_first_input() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 33_333)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(3, 33_333), audio(5, 23_220)]);
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[a, b], &output).unwrap();
    assert_eq!(result.audio_samples, 0);
    let tracks = read_output(&output);
    assert_eq!(tracks.len(), 1);
    assert_eq!(&tracks[0].handler, b"vide");
}

#[test]
fn audio_only_first_input_drops_video() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[audio(5, 23_220)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(3, 33_333), audio(5, 23_220)]);
    let output = dir.path().join("out.mp4");
    let (progress, events) = collecting_progress();
    let config = MergeConfig { progress_interval_ms: 0, ..Default::default() };

    let result = MergeOrchestrator::new(&default_opener(), &config, progress, None)
        .run(&[a, b], output.to_str().unwrap())
        .unwrap();
    assert_eq!((result.video_samples, result.audio_samples), (0, 10));
    let tracks = read_output(&output);
    assert_eq!(tracks.len(), 1);
    assert_eq!(&tracks[0].handler, b"soun");

    // Audio does not drive progress, only the terminal event is sent.
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].progress, 1.0);
}

#[test]
fn other_tracks_are_ignored_and_moov_may_come_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fast.mp4");
    std::fs::write(&path, build_faststart_mp4("fast", &[timecode(2), video(4, 33_333), audio(4, 23_220)])).unwrap();
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[path.to_string_lossy().into_owned()], &output).unwrap();
    assert_eq!((result.video_samples, result.audio_samples), (4, 4));

    let tracks = read_output(&output);
    assert_eq!(tracks.len(), 2);
    let payloads: Vec<Vec<u8>> = tracks[0].samples.iter().map(|(_, p)| p.clone()).collect();
    assert_eq!(payloads, (0..4).map(|i| payload("fast", 1, i)).collect::<Vec<_>>());
}

#[test]
fn catalog_derivation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[audio(2, 23_220), video(2, 33_333).rotated(270)]);
    let opener = default_opener();

    let derive = || {
        let reader = SourceReader::open(&a, &opener).unwrap();
        TrackCatalog::derive_from_first_source(reader.tracks())
    };
    let first = derive();
    assert_eq!(first, derive());
    assert_eq!(first.rotation_hint, Some(270));
    assert_eq!(first.track_map(), derive().track_map());
    assert!(first.video.is_some() && first.audio.is_some());
}

#[test]
fn empty_input_list_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp4");
    let request = MergeRequest { video_paths: vec![], output_path: output.to_string_lossy().into_owned() };

    let err = merge_videos(&request, &default_opener(), &MergeConfig::default(), no_progress(), None).unwrap_err();
    assert!(matches!(err, MergeError::InvalidArguments(_)));
    assert!(!output.exists());
}

#[test]
fn file_scheme_output_is_stripped() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(2, 33_333)]);
    let output = dir.path().join("out.mp4");
    let request = MergeRequest {
        video_paths: vec![a],
        output_path: format!("file://{}", output.display()),
    };

    let response = merge_videos(&request, &default_opener(), &MergeConfig::default(), no_progress(), None).unwrap();
    assert_eq!(response.path, output.to_string_lossy());
    assert!(output.exists());
}

#[test]
fn file_uri_inputs_are_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(2, 33_333)]);
    let output = dir.path().join("out.mp4");

    let result = run(&default_opener(), &MergeConfig::default(), &[format!("file://{}", a)], &output).unwrap();
    assert_eq!(result.video_samples, 2);

    let err = run(&default_opener(), &MergeConfig::default(), &["content://media/1".to_string()], &output).unwrap_err();
    assert!(matches!(err, MergeError::SourceOpen { ref reference, .. } if reference == "content://media/1"));
}

#[test]
fn unopenable_second_input_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 33_333)]);
    let missing = dir.path().join("missing.mp4").to_string_lossy().into_owned();
    let c = write_mp4(dir.path(), "c.mp4", &[video(3, 33_333)]);
    let output = dir.path().join("out.mp4");
    let opener = TrackingOpener::new();

    let err = run(&opener, &MergeConfig::default(), &[a.clone(), missing.clone(), c], &output).unwrap_err();
    assert!(matches!(err, MergeError::SourceOpen { ref reference, .. } if *reference == missing));
    assert!(err.to_string().contains("missing.mp4"));

    // Input 3 was never opened, nothing stays open, at most one source was open at a time.
    assert_eq!(*opener.opened.lock().unwrap(), vec![a.clone(), a]);
    assert_eq!(opener.open_now.load(Ordering::SeqCst), 0);
    assert_eq!(opener.max_open.load(Ordering::SeqCst), 1);
    assert!(!output.exists());
}

#[test]
fn partial_output_can_be_kept() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 33_333)]);
    let missing = dir.path().join("missing.mp4").to_string_lossy().into_owned();
    let output = dir.path().join("out.mp4");
    let config = MergeConfig { keep_partial_output: true, ..Default::default() };

    assert!(run(&default_opener(), &config, &[a, missing], &output).is_err());
    assert!(output.exists());
}

#[test]
fn skip_mode_leaves_out_unopenable_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 33_333)]);
    let missing = dir.path().join("missing.mp4").to_string_lossy().into_owned();
    let c = write_mp4(dir.path(), "c.mp4", &[video(4, 33_333)]);
    let output = dir.path().join("out.mp4");
    let config = MergeConfig { skip_unopenable_inputs: true, ..Default::default() };

    let result = run(&default_opener(), &config, &[a, missing, c], &output).unwrap();
    assert_eq!(result.skipped_inputs, vec![1]);
    assert_eq!(result.video_samples, 7);

    // The skipped input does not widen the gap.
    let times = pts(&read_output(&output)[0]);
    assert_eq!(times[3], 2 * 33_333 + VIDEO_GAP);
}

#[test]
fn read_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(3, 33_333)]);
    let output = dir.path().join("out.mp4");
    let opener = BrokenMdatOpener {
        reference: "broken.mp4".into(),
        bytes: build_mp4("broken", &[video(3, 33_333)]),
    };
    let config = MergeConfig { skip_unopenable_inputs: true, ..Default::default() };

    let err = run(&opener, &config, &[a, "broken.mp4".to_string()], &output).unwrap_err();
    assert!(matches!(err, MergeError::SourceRead { ref reference, .. } if reference == "broken.mp4"));
    assert!(!output.exists());
}

#[test]
fn progress_reaches_every_input_and_ends_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<String> = (0..10)
        .map(|i| write_mp4(dir.path(), &format!("{}.mp4", i), &[video(5, 10_000)]))
        .collect();
    let output = dir.path().join("out.mp4");
    let (progress, events) = collecting_progress();
    let config = MergeConfig { progress_interval_ms: 0, ..Default::default() };

    MergeOrchestrator::new(&default_opener(), &config, progress, None)
        .run(&inputs, output.to_str().unwrap())
        .unwrap();

    let events = events.lock().unwrap();
    for i in 1..=10 {
        let message = format!("Merging video {} of 10", i);
        assert!(events.iter().any(|e| e.message == message), "no event for input {}", i);
    }
    let values: Vec<f64> = events.iter().map(|e| e.progress).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(events.last(), Some(&ProgressEvent { progress: 1.0, message: "Merge complete".into() }));
}

#[test]
fn throttled_progress_still_ends_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(50, 33_333)]);
    let output = dir.path().join("out.mp4");
    let (progress, events) = collecting_progress();

    MergeOrchestrator::new(&default_opener(), &MergeConfig::default(), progress, None)
        .run(&[a], output.to_str().unwrap())
        .unwrap();

    let events = events.lock().unwrap();
    assert!(events.len() < 50);
    assert_eq!(events.last().map(|e| e.progress), Some(1.0));
}

#[test]
fn cancellation_stops_the_run_and_removes_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_mp4(dir.path(), "a.mp4", &[video(20, 33_333)]);
    let b = write_mp4(dir.path(), "b.mp4", &[video(20, 33_333)]);
    let output = dir.path().join("out.mp4");
    let token = CancellationToken::new();
    let trigger = token.clone();
    let progress = Arc::new(move |_: ProgressEvent| trigger.cancel());
    let config = MergeConfig { progress_interval_ms: 0, ..Default::default() };

    let err = MergeOrchestrator::new(&default_opener(), &config, progress, Some(token))
        .run(&[a, b], output.to_str().unwrap())
        .unwrap_err();
    assert_eq!(err, MergeError::Cancelled);
    assert!(!output.exists());
}
