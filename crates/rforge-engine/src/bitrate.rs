//! Rendition bitrate policy.

use rforge_models::ResolutionTier;

/// Share of the base bitrate shed as the frame rate drops toward zero.
const FRAME_RATE_DECAY: f64 = 0.75;

/// Frame rate at which the base table applies unscaled.
const REFERENCE_FRAME_RATE: f64 = 60.0;

/// Base bits per second per tier, ascending with [`ResolutionTier::ALL`].
const DEFAULT_TABLE: [u64; 7] = [
    150_000,    // 144p
    300_000,    // 240p
    1_000_000,  // 480p
    3_000_000,  // 720p
    6_000_000,  // 1080p
    12_000_000, // 1440p
    24_000_000, // 2160p
];

/// Target bitrate selection for renditions.
///
/// Each tier has a base bitrate assuming a 60 fps source; sources with lower
/// frame rates carry less motion information, so the target scales down
/// linearly with the frame rate.
#[derive(Debug, Clone)]
pub struct BitratePolicy {
    /// Indexed by tier variant order (144p first).
    table: [u64; 7],
}

impl Default for BitratePolicy {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE,
        }
    }
}

impl BitratePolicy {
    /// Create the policy from environment variables (`BITRATE_144P` through
    /// `BITRATE_2160P`), falling back to the defaults per entry.
    pub fn from_env() -> Self {
        let mut table = DEFAULT_TABLE;
        for (slot, tier) in table.iter_mut().zip(ResolutionTier::ALL) {
            let key = format!("BITRATE_{}", tier.label().to_uppercase());
            if let Some(value) = std::env::var(&key).ok().and_then(|s| s.parse().ok()) {
                *slot = value;
            }
        }
        Self { table }
    }

    /// Base bits per second for a tier, before frame-rate scaling.
    pub fn base(&self, tier: ResolutionTier) -> u64 {
        self.table[tier as usize]
    }

    /// Effective bits per second for a tier at the given source frame rate.
    ///
    /// `scale = 1 - (1 - fps / 60) * 0.75`: exactly the base at 60 fps,
    /// shrinking toward a quarter of it as the frame rate approaches zero.
    /// The scale is deliberately not capped, so high-frame-rate sources get
    /// a raised target.
    pub fn effective(&self, tier: ResolutionTier, fps: f64) -> u64 {
        let scale = 1.0 - (1.0 - fps / REFERENCE_FRAME_RATE) * FRAME_RATE_DECAY;
        (self.base(tier) as f64 * scale).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_applies_exactly_at_reference_rate() {
        let policy = BitratePolicy::default();
        for tier in ResolutionTier::ALL {
            assert_eq!(policy.effective(tier, 60.0), policy.base(tier));
        }
    }

    #[test]
    fn test_half_rate_sheds_three_eighths() {
        let policy = BitratePolicy::default();
        // 1080p at 30 fps: 6_000_000 * (1 - 0.5 * 0.75)
        assert_eq!(policy.effective(ResolutionTier::P1080, 30.0), 3_750_000);
        assert_eq!(policy.effective(ResolutionTier::P144, 30.0), 93_750);
    }

    #[test]
    fn test_high_frame_rate_raises_target() {
        let policy = BitratePolicy::default();
        assert_eq!(policy.effective(ResolutionTier::P720, 120.0), 5_250_000);
    }

    #[test]
    fn test_effective_is_monotonic_in_frame_rate() {
        let policy = BitratePolicy::default();
        let mut last = 0;
        for fps in [0.0, 15.0, 24.0, 29.97, 30.0, 48.0, 59.94, 60.0, 90.0] {
            let rate = policy.effective(ResolutionTier::P480, fps);
            assert!(rate >= last, "bitrate decreased at {} fps", fps);
            last = rate;
        }
    }

    #[test]
    fn test_table_ascends_with_tiers() {
        let policy = BitratePolicy::default();
        for pair in ResolutionTier::ALL.windows(2) {
            assert!(policy.base(pair[0]) < policy.base(pair[1]));
        }
    }
}
