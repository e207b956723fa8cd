//! Per-job transcode progress documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{ResolutionTier, VideoCodec};

/// Lifecycle state of a single rendition cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    /// Queued, no encode attempted in this run yet
    Ready,
    /// Encode process launched
    Start,
    /// Encode running, fraction available
    Progress,
    /// Rendition produced; never re-entered
    Finished,
    /// Encode failed; eligible for a later pass
    Error,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Ready => "ready",
            CellStatus::Start => "start",
            CellStatus::Progress => "progress",
            CellStatus::Finished => "finished",
            CellStatus::Error => "error",
        }
    }
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one rendition cell (codec x tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub status: CellStatus,

    /// Completed share of the encode, within [0, 1]. Present while the cell
    /// is in flight; removed once it finishes.
    #[serde(rename = "progressFraction", skip_serializing_if = "Option::is_none")]
    pub progress_fraction: Option<f64>,
}

impl CellState {
    pub fn ready() -> Self {
        Self {
            status: CellStatus::Ready,
            progress_fraction: None,
        }
    }
}

/// The full rendition matrix for one job.
///
/// Maps codec -> resolution tier -> cell state and is persisted wholesale
/// after every cell transition. The document is the single authority on
/// what work remains for a job: anything not `finished` is outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressDocument {
    cells: BTreeMap<VideoCodec, BTreeMap<ResolutionTier, CellState>>,
}

impl ProgressDocument {
    /// Create an empty document with a section for every codec.
    pub fn new() -> Self {
        let mut cells = BTreeMap::new();
        for codec in VideoCodec::ALL {
            cells.insert(codec, BTreeMap::new());
        }
        Self { cells }
    }

    /// Insert `ready` cells for the given tiers, leaving existing cells
    /// untouched. Re-seeding after a restart must not reset work already
    /// finished or attempted.
    pub fn seed(&mut self, codec: VideoCodec, tiers: &[ResolutionTier]) {
        let section = self.cells.entry(codec).or_default();
        for tier in tiers {
            section.entry(*tier).or_insert_with(CellState::ready);
        }
    }

    /// Tiers still requiring work for a codec, ascending. Everything except
    /// `finished` counts: failed cells get another attempt on the next pass.
    pub fn outstanding(&self, codec: VideoCodec) -> Vec<ResolutionTier> {
        self.cells
            .get(&codec)
            .map(|section| {
                section
                    .iter()
                    .filter(|(_, cell)| cell.status != CellStatus::Finished)
                    .map(|(tier, _)| *tier)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any cell in the matrix still requires work.
    pub fn has_outstanding(&self) -> bool {
        self.cells
            .values()
            .flat_map(|section| section.values())
            .any(|cell| cell.status != CellStatus::Finished)
    }

    /// Whether the ladder has been computed for this document yet.
    pub fn is_seeded(&self) -> bool {
        self.cells.values().any(|section| !section.is_empty())
    }

    /// Look up a single cell.
    pub fn cell(&self, codec: VideoCodec, tier: ResolutionTier) -> Option<&CellState> {
        self.cells.get(&codec).and_then(|section| section.get(&tier))
    }

    /// Mark a cell as launched. Any fraction left over from a previous run
    /// stays in place until the first progress report overwrites it.
    pub fn begin_cell(&mut self, codec: VideoCodec, tier: ResolutionTier) {
        self.cell_mut(codec, tier).status = CellStatus::Start;
    }

    /// Record an in-flight progress fraction, clamped into [0, 1].
    pub fn set_progress(&mut self, codec: VideoCodec, tier: ResolutionTier, fraction: f64) {
        let cell = self.cell_mut(codec, tier);
        cell.status = CellStatus::Progress;
        cell.progress_fraction = Some(fraction.clamp(0.0, 1.0));
    }

    /// Mark a cell finished and drop its fraction.
    pub fn finish_cell(&mut self, codec: VideoCodec, tier: ResolutionTier) {
        let cell = self.cell_mut(codec, tier);
        cell.status = CellStatus::Finished;
        cell.progress_fraction = None;
    }

    /// Mark a cell failed. The last reported fraction is kept for
    /// diagnostics.
    pub fn fail_cell(&mut self, codec: VideoCodec, tier: ResolutionTier) {
        self.cell_mut(codec, tier).status = CellStatus::Error;
    }

    fn cell_mut(&mut self, codec: VideoCodec, tier: ResolutionTier) -> &mut CellState {
        self.cells
            .entry(codec)
            .or_default()
            .entry(tier)
            .or_insert_with(CellState::ready)
    }
}

impl Default for ProgressDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_all_codec_sections() {
        let doc = ProgressDocument::new();
        assert!(!doc.is_seeded());
        assert!(!doc.has_outstanding());

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"av1":{},"h265":{},"h264":{}}"#);
    }

    #[test]
    fn test_wire_format() {
        let mut doc = ProgressDocument::new();
        doc.seed(VideoCodec::Av1, &[ResolutionTier::P144]);
        doc.set_progress(VideoCodec::Av1, ResolutionTier::P144, 0.42);

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"av1":{"144p":{"status":"progress","progressFraction":0.42}},"h265":{},"h264":{}}"#
        );

        let back: ProgressDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_seed_does_not_overwrite_existing_cells() {
        let mut doc = ProgressDocument::new();
        let tiers = [ResolutionTier::P144, ResolutionTier::P240];

        doc.seed(VideoCodec::H264, &tiers);
        doc.finish_cell(VideoCodec::H264, ResolutionTier::P144);
        doc.set_progress(VideoCodec::H264, ResolutionTier::P240, 0.5);

        doc.seed(VideoCodec::H264, &tiers);

        assert_eq!(
            doc.cell(VideoCodec::H264, ResolutionTier::P144).unwrap().status,
            CellStatus::Finished
        );
        assert_eq!(
            doc.cell(VideoCodec::H264, ResolutionTier::P240).unwrap().status,
            CellStatus::Progress
        );
    }

    #[test]
    fn test_outstanding_excludes_finished_only() {
        let mut doc = ProgressDocument::new();
        doc.seed(
            VideoCodec::Av1,
            &[ResolutionTier::P144, ResolutionTier::P240, ResolutionTier::P480],
        );

        doc.finish_cell(VideoCodec::Av1, ResolutionTier::P144);
        doc.fail_cell(VideoCodec::Av1, ResolutionTier::P240);

        // Failed cells are retried on the next pass; finished ones are not.
        assert_eq!(
            doc.outstanding(VideoCodec::Av1),
            vec![ResolutionTier::P240, ResolutionTier::P480]
        );
        assert!(doc.outstanding(VideoCodec::H265).is_empty());
    }

    #[test]
    fn test_outstanding_is_ascending() {
        let mut doc = ProgressDocument::new();
        let ladder = ResolutionTier::ladder_for(3840);
        doc.seed(VideoCodec::H265, &ladder);

        assert_eq!(doc.outstanding(VideoCodec::H265), ladder);
    }

    #[test]
    fn test_progress_fraction_is_clamped() {
        let mut doc = ProgressDocument::new();

        doc.set_progress(VideoCodec::H264, ResolutionTier::P144, 1.7);
        assert_eq!(
            doc.cell(VideoCodec::H264, ResolutionTier::P144)
                .unwrap()
                .progress_fraction,
            Some(1.0)
        );

        doc.set_progress(VideoCodec::H264, ResolutionTier::P144, -0.3);
        assert_eq!(
            doc.cell(VideoCodec::H264, ResolutionTier::P144)
                .unwrap()
                .progress_fraction,
            Some(0.0)
        );
    }

    #[test]
    fn test_finish_drops_fraction_error_keeps_it() {
        let mut doc = ProgressDocument::new();

        doc.set_progress(VideoCodec::Av1, ResolutionTier::P144, 0.9);
        doc.finish_cell(VideoCodec::Av1, ResolutionTier::P144);
        let finished = doc.cell(VideoCodec::Av1, ResolutionTier::P144).unwrap();
        assert_eq!(finished.status, CellStatus::Finished);
        assert_eq!(finished.progress_fraction, None);

        doc.set_progress(VideoCodec::Av1, ResolutionTier::P240, 0.6);
        doc.fail_cell(VideoCodec::Av1, ResolutionTier::P240);
        let failed = doc.cell(VideoCodec::Av1, ResolutionTier::P240).unwrap();
        assert_eq!(failed.status, CellStatus::Error);
        assert_eq!(failed.progress_fraction, Some(0.6));
    }

    #[test]
    fn test_has_outstanding_tracks_completion() {
        let mut doc = ProgressDocument::new();
        doc.seed(VideoCodec::Av1, &[ResolutionTier::P144]);
        doc.seed(VideoCodec::H264, &[ResolutionTier::P144]);
        assert!(doc.has_outstanding());

        doc.finish_cell(VideoCodec::Av1, ResolutionTier::P144);
        assert!(doc.has_outstanding());

        doc.finish_cell(VideoCodec::H264, ResolutionTier::P144);
        assert!(!doc.has_outstanding());
        assert!(doc.is_seeded());
    }
}
