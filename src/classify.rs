//! Magnitude classification.
//!
//! Maps a magnitude to a severity tier and its marker encoding. The radius
//! floor keeps null and near-zero events visible on the map.

use serde::Serialize;

/// Minimum marker radius in pixels.
pub const MIN_RADIUS: f64 = 3.0;

/// Severity tier derived from magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// mag < 2.5, or unknown
    Light,
    /// 2.5 <= mag < 4
    Moderate,
    /// 4 <= mag < 6
    Strong,
    /// mag >= 6
    Severe,
}

impl Tier {
    /// All tiers, lightest first (legend order).
    pub const ALL: [Self; 4] = [Self::Light, Self::Moderate, Self::Strong, Self::Severe];

    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Light => "#00ff66",
            Self::Moderate => "#ffcc00",
            Self::Strong => "#ff6600",
            Self::Severe => "#ff0000",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
            Self::Severe => "Severe",
        }
    }

    /// Legend entry text.
    #[must_use]
    pub const fn legend_label(self) -> &'static str {
        match self {
            Self::Light => "Light (< 2.5)",
            Self::Moderate => "Moderate (2.5–4)",
            Self::Strong => "Strong (4–6)",
            Self::Severe => "Severe (≥ 6)",
        }
    }
}

/// Visual encoding for one marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Encoding {
    pub tier: Tier,
    pub color: &'static str,
    pub radius: f64,
}

/// Classify a magnitude. `None` and NaN fall into the lightest tier.
#[must_use]
pub fn classify(magnitude: Option<f64>) -> Encoding {
    let mag = magnitude.filter(|m| !m.is_nan());

    let tier = match mag {
        Some(m) if m >= 6.0 => Tier::Severe,
        Some(m) if m >= 4.0 => Tier::Strong,
        Some(m) if m >= 2.5 => Tier::Moderate,
        _ => Tier::Light,
    };

    Encoding {
        tier,
        color: tier.color(),
        radius: (mag.unwrap_or(0.0) * 2.0).max(MIN_RADIUS),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify(Some(6.0)).tier, Tier::Severe);
        assert_eq!(classify(Some(5.99)).tier, Tier::Strong);
        assert_eq!(classify(Some(4.0)).tier, Tier::Strong);
        assert_eq!(classify(Some(3.99)).tier, Tier::Moderate);
        assert_eq!(classify(Some(2.5)).tier, Tier::Moderate);
        assert_eq!(classify(Some(2.49)).tier, Tier::Light);
        assert_eq!(classify(None).tier, Tier::Light);
        assert_eq!(classify(Some(f64::NAN)).tier, Tier::Light);
    }

    #[test]
    fn test_strong_example() {
        let enc = classify(Some(5.2));
        assert_eq!(enc.tier, Tier::Strong);
        assert_eq!(enc.color, "#ff6600");
        assert!((enc.radius - 10.4).abs() < 1e-9);
    }

    #[test]
    fn test_radius_floor() {
        assert!((classify(None).radius - MIN_RADIUS).abs() < f64::EPSILON);
        assert!((classify(Some(-1.0)).radius - MIN_RADIUS).abs() < f64::EPSILON);
        assert!((classify(Some(1.0)).radius - MIN_RADIUS).abs() < f64::EPSILON);
        assert!((classify(Some(7.0)).radius - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_legend_order() {
        let colors: Vec<_> = Tier::ALL.iter().map(|t| t.color()).collect();
        assert_eq!(colors, ["#00ff66", "#ffcc00", "#ff6600", "#ff0000"]);
    }

    proptest! {
        #[test]
        fn prop_radius_at_least_floor(m in proptest::option::of(-10.0f64..12.0)) {
            prop_assert!(classify(m).radius >= MIN_RADIUS);
        }

        #[test]
        fn prop_small_is_light(m in -10.0f64..2.5) {
            prop_assert_eq!(classify(Some(m)).tier, Tier::Light);
        }
    }
}
