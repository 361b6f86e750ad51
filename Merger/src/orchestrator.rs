//! Sequencing of one merge run: validate, derive the output shape from the first input,
//! copy every input in order, finalize.
//!
//! The run is synchronous and owns every resource it opens. On any failure the open source
//! is dropped and the output writer is abandoned before the error is returned.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::TrackCatalog;
use crate::config::MergeConfig;
use crate::continuity::ContinuityTracker;
use crate::error::MergeError;
use crate::output::OutputWriter;
use crate::progress::{overall_fraction, ProgressCallback, ProgressReporter};
use crate::source::{SourceOpener, SourceReader};
use crate::types::TrackKind;

const FILE_SCHEME_PREFIX: &str = "file://";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeState {
    Idle,
    ValidatingInput,
    BuildingCatalog,
    Copying { file_index: usize, kind: TrackKind },
    Finalized,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeResult {
    pub output_path: PathBuf,
    pub video_samples: usize,
    pub audio_samples: usize,
    /// Indices of inputs left out because they could not be opened (skip mode only).
    pub skipped_inputs: Vec<usize>,
}

/// Strips a literal `file://` prefix. Blank references are rejected.
pub fn normalize_output_reference(output: &str) -> Result<PathBuf, MergeError> {
    let path = output.strip_prefix(FILE_SCHEME_PREFIX).unwrap_or(output);
    if path.trim().is_empty() {
        return Err(MergeError::invalid_arguments("Output path is empty"));
    }
    Ok(PathBuf::from(path))
}

pub struct MergeOrchestrator<'a> {
    opener: &'a dyn SourceOpener,
    config: &'a MergeConfig,
    reporter: ProgressReporter,
    cancel: Option<CancellationToken>,
    state: MergeState,
}

impl<'a> MergeOrchestrator<'a> {
    pub fn new(
        opener: &'a dyn SourceOpener,
        config: &'a MergeConfig,
        progress: ProgressCallback,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Self {
            opener,
            config,
            reporter: ProgressReporter::new(progress, config.progress_interval()),
            cancel,
            state: MergeState::Idle,
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    fn transition(&mut self, next: MergeState) {
        debug!(from = ?self.state, to = ?next, "Merge state");
        self.state = next;
    }

    fn check_cancelled(&self) -> Result<(), MergeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(MergeError::Cancelled),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, err: &MergeError) {
        self.transition(MergeState::Failed);
        error!(error = %err, "Merge failed");
    }

    /// Concatenates `video_paths` into `output_path`. Consumes the orchestrator's single run.
    #[instrument(skip_all, fields(inputs = video_paths.len()))]
    pub fn run(&mut self, video_paths: &[String], output_path: &str) -> Result<MergeResult, MergeError> {
        if self.state != MergeState::Idle {
            return Err(MergeError::invalid_arguments("A merge orchestrator runs only once"));
        }

        self.transition(MergeState::ValidatingInput);
        let output = match self.validate(video_paths, output_path) {
            Ok(output) => output,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        info!(output = %output.display(), "Starting merge");

        let mut writer = OutputWriter::new(&output);
        match self.merge_into(&mut writer, video_paths) {
            Ok(result) => {
                info!(
                    output = %output.display(),
                    video_samples = result.video_samples,
                    audio_samples = result.audio_samples,
                    "Merge complete"
                );
                Ok(result)
            }
            Err(e) => {
                self.fail(&e);
                writer.abandon(self.config.keep_partial_output);
                Err(e)
            }
        }
    }

    fn validate(&self, video_paths: &[String], output_path: &str) -> Result<PathBuf, MergeError> {
        if video_paths.is_empty() {
            return Err(MergeError::invalid_arguments("No video paths provided"));
        }
        self.config
            .validate()
            .map_err(|e| MergeError::invalid_arguments(e.to_string()))?;
        normalize_output_reference(output_path)
    }

    fn merge_into(&mut self, writer: &mut OutputWriter, video_paths: &[String]) -> Result<MergeResult, MergeError> {
        self.transition(MergeState::BuildingCatalog);
        self.check_cancelled()?;

        // 1) Output shape from the first input, which is closed again right away
        let catalog = {
            let first = SourceReader::open(&video_paths[0], self.opener)?;
            let catalog = TrackCatalog::derive_from_first_source(first.tracks());
            first.close();
            catalog
        };
        if catalog.is_empty() {
            warn!(reference = %video_paths[0], "First input has neither video nor audio");
        }

        // 2) Register tracks and start the output
        let track_map = catalog.track_map();
        for kind in TrackKind::COPIED {
            if let (Some(codec), Some(expected)) = (catalog.codec(kind), track_map.slot(kind)) {
                let id = writer.register_track(kind, codec)?;
                if id != expected {
                    return Err(MergeError::output_write(format!("{:?} track got id {}, expected {}", kind, id, expected)));
                }
            }
        }
        if let Some(rotation) = catalog.rotation_hint {
            writer.set_orientation(rotation)?;
        }
        writer.start()?;

        // 3) Copy every input in order
        let total = video_paths.len();
        let mut tracker = ContinuityTracker::new(self.config.video_gap_us, self.config.audio_gap_us);
        let mut skipped_inputs = Vec::new();
        for (file_index, reference) in video_paths.iter().enumerate() {
            self.check_cancelled()?;

            let mut reader = match SourceReader::open(reference, self.opener) {
                Ok(reader) => reader,
                Err(e) if file_index > 0 && self.config.skip_unopenable_inputs => {
                    warn!(file = file_index, reference = %reference, error = %e, "Skipping input");
                    skipped_inputs.push(file_index);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut copied = 0;
            for kind in TrackKind::COPIED {
                if let Some(track_id) = track_map.slot(kind) {
                    copied += self.copy_track(&mut reader, writer, &mut tracker, kind, track_id, file_index, total)?;
                }
            }
            reader.close();

            for kind in TrackKind::COPIED {
                tracker.advance_for_next_file(kind);
            }
            info!(
                file = file_index,
                reference = %reference,
                samples = copied,
                video_offset_us = tracker.current_offset(TrackKind::Video),
                audio_offset_us = tracker.current_offset(TrackKind::Audio),
                "Merged input"
            );
        }

        // 4) Finalize
        self.check_cancelled()?;
        writer.finalize()?;
        self.transition(MergeState::Finalized);
        self.reporter.report(1.0, "Merge complete");

        let count = |id: Option<u32>| id.map_or(0, |id| writer.samples_written(id));
        Ok(MergeResult {
            output_path: writer.path().to_path_buf(),
            video_samples: count(track_map.video),
            audio_samples: count(track_map.audio),
            skipped_inputs,
        })
    }

    /// Streams every sample of `kind` from `reader` into output track `track_id`.
    #[allow(clippy::too_many_arguments)]
    fn copy_track(
        &mut self,
        reader: &mut SourceReader,
        writer: &mut OutputWriter,
        tracker: &mut ContinuityTracker,
        kind: TrackKind,
        track_id: u32,
        file_index: usize,
        total: usize,
    ) -> Result<usize, MergeError> {
        if !reader.select(kind) {
            debug!(file = file_index, kind = ?kind, "Input has no track of this kind");
            return Ok(0);
        }
        self.transition(MergeState::Copying { file_index, kind });

        let offset = tracker.current_offset(kind);
        let duration = reader.duration_hint(kind);
        let message = format!("Merging video {} of {}", file_index + 1, total);
        let mut copied = 0;
        loop {
            self.check_cancelled()?;
            let Some(sample) = reader.next_sample(kind)? else {
                break;
            };
            let shifted = sample.shifted(offset);
            writer.write_sample(track_id, &shifted)?;
            tracker.observe(kind, shifted.pts_us);
            if kind == TrackKind::Video {
                let fraction = overall_fraction(file_index, total, sample.pts_us, duration);
                self.reporter.report(fraction, &message);
            }
            copied += 1;
        }
        debug!(file = file_index, kind = ?kind, samples = copied, offset_us = offset, "Copied track");
        Ok(copied)
    }
}
