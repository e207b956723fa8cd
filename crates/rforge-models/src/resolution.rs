//! Rendition resolution tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest height a rendition may have, regardless of source aspect.
pub const MIN_RENDITION_HEIGHT: u32 = 128;

/// A fixed output resolution tier, named by its conventional vertical label.
///
/// Each tier carries a reference width which doubles as its qualification
/// threshold: a source qualifies for every tier at least as narrow as the
/// source itself. Because the thresholds are strictly ascending, the tiers
/// derived for any source form a prefix of [`ResolutionTier::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "144p")]
    P144,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
}

impl ResolutionTier {
    /// All tiers, ascending by reference width.
    pub const ALL: [ResolutionTier; 7] = [
        ResolutionTier::P144,
        ResolutionTier::P240,
        ResolutionTier::P480,
        ResolutionTier::P720,
        ResolutionTier::P1080,
        ResolutionTier::P1440,
        ResolutionTier::P2160,
    ];

    /// Human-readable label (e.g. "720p"), also used in rendition filenames.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionTier::P144 => "144p",
            ResolutionTier::P240 => "240p",
            ResolutionTier::P480 => "480p",
            ResolutionTier::P720 => "720p",
            ResolutionTier::P1080 => "1080p",
            ResolutionTier::P1440 => "1440p",
            ResolutionTier::P2160 => "2160p",
        }
    }

    /// Reference width in pixels. A source qualifies for this tier when it
    /// is at least this wide.
    pub fn width(&self) -> u32 {
        match self {
            ResolutionTier::P144 => 256,
            ResolutionTier::P240 => 426,
            ResolutionTier::P480 => 854,
            ResolutionTier::P720 => 1280,
            ResolutionTier::P1080 => 1920,
            ResolutionTier::P1440 => 2560,
            ResolutionTier::P2160 => 3840,
        }
    }

    /// Tiers a source of the given width qualifies for, ascending.
    pub fn ladder_for(source_width: u32) -> Vec<ResolutionTier> {
        Self::ALL
            .iter()
            .copied()
            .filter(|tier| tier.width() <= source_width)
            .collect()
    }

    /// Output geometry for a source aspect ratio (height divided by width).
    ///
    /// The output width is the tier's reference width; the height follows
    /// the source aspect rounded to the nearest pixel and floored at
    /// [`MIN_RENDITION_HEIGHT`].
    pub fn target_size(&self, aspect: f64) -> (u32, u32) {
        let width = self.width();
        let height = (width as f64 * aspect).round() as u32;
        (width, height.max(MIN_RENDITION_HEIGHT))
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_is_prefix_closed() {
        // Every derivable ladder must be an exact prefix of ALL.
        for width in 0..=4096 {
            let ladder = ResolutionTier::ladder_for(width);
            assert_eq!(
                ladder.as_slice(),
                &ResolutionTier::ALL[..ladder.len()],
                "ladder for width {} is not a prefix",
                width
            );
        }
    }

    #[test]
    fn test_ladder_for_common_widths() {
        assert!(ResolutionTier::ladder_for(255).is_empty());
        assert_eq!(ResolutionTier::ladder_for(256), vec![ResolutionTier::P144]);
        assert_eq!(
            ResolutionTier::ladder_for(426),
            vec![ResolutionTier::P144, ResolutionTier::P240]
        );

        // 1080p source qualifies for everything up to and including 1080p.
        let ladder = ResolutionTier::ladder_for(1920);
        assert_eq!(ladder.len(), 5);
        assert_eq!(*ladder.last().unwrap(), ResolutionTier::P1080);

        // 4K source gets the full ladder.
        assert_eq!(ResolutionTier::ladder_for(3840).len(), 7);
    }

    #[test]
    fn test_target_size_follows_aspect() {
        // 16:9 landscape
        assert_eq!(ResolutionTier::P720.target_size(0.5625), (1280, 720));
        assert_eq!(ResolutionTier::P1080.target_size(0.5625), (1920, 1080));

        // 9:16 portrait keeps the reference width and grows the height
        let (w, h) = ResolutionTier::P720.target_size(16.0 / 9.0);
        assert_eq!(w, 1280);
        assert_eq!(h, 2276); // 1280 * 16/9 = 2275.55..., rounded

        // Extreme ultrawide sources bottom out at the minimum height
        assert_eq!(ResolutionTier::P144.target_size(0.1), (256, 128));
    }

    #[test]
    fn test_tiers_ascend_by_width() {
        for pair in ResolutionTier::ALL.windows(2) {
            assert!(pair[0].width() < pair[1].width());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_label_serialization() {
        for tier in ResolutionTier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.label()));
        }
    }
}
