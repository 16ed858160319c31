//! Magnetometer accuracy classification.

use serde::Serialize;

/// Calibration level assumed until the magnetometer reports one.
///
/// Zero maps to [`AccuracyClass::Unreliable`]: no confidence is claimed
/// before the sensor has said anything.
pub const DEFAULT_CALIBRATION_LEVEL: u8 = 0;

/// Confidence of a compass reading, derived from the magnetometer's
/// calibration level.
///
/// Reports are tagged, never suppressed: consumers decide whether an
/// `Unreliable` heading is worth drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AccuracyClass {
    Unreliable,
    Low,
    Medium,
    High,
}

impl AccuracyClass {
    /// Map a raw calibration level (0-4) to an accuracy class.
    ///
    /// Levels above 4 are treated as `High`.
    pub fn from_calibration(level: u8) -> Self {
        match level {
            0 | 1 => AccuracyClass::Unreliable,
            2 => AccuracyClass::Low,
            3 => AccuracyClass::Medium,
            _ => AccuracyClass::High,
        }
    }

    /// Human-readable description for logging/UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyClass::Unreliable => "unreliable",
            AccuracyClass::Low => "low",
            AccuracyClass::Medium => "medium",
            AccuracyClass::High => "high",
        }
    }
}

impl std::fmt::Display for AccuracyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_mapping() {
        let mapped: Vec<_> = [4, 3, 2, 1, 0]
            .into_iter()
            .map(AccuracyClass::from_calibration)
            .collect();
        assert_eq!(
            mapped,
            vec![
                AccuracyClass::High,
                AccuracyClass::Medium,
                AccuracyClass::Low,
                AccuracyClass::Unreliable,
                AccuracyClass::Unreliable,
            ]
        );
    }

    #[test]
    fn test_mapping_is_monotonic() {
        for level in 0..u8::MAX {
            assert!(
                AccuracyClass::from_calibration(level) <= AccuracyClass::from_calibration(level + 1)
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(AccuracyClass::Medium.to_string(), "medium");
    }
}
