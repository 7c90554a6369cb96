use serde::{Deserialize, Serialize};
use std::fmt;

/// Predictive-braking safety level, ordered from most to least restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Emergency,
    Critical,
    Warning,
    Caution,
    Clear,
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyLevel::Emergency => "EMERGENCY",
            SafetyLevel::Critical => "CRITICAL",
            SafetyLevel::Warning => "WARNING",
            SafetyLevel::Caution => "CAUTION",
            SafetyLevel::Clear => "CLEAR",
        };
        f.write_str(name)
    }
}

/// Advisory state for an external indicator (LEDs, display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    #[default]
    Idle,
    Seeking,
    Avoiding,
    Arrived,
}

/// What the drive is doing on a given tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Potential-field navigation toward the active waypoint
    Navigate,
    /// Scripted reverse and pause after a bumper contact
    CollisionBackoff,
    /// Scripted reverse and turn after a progress stall
    StallEscape,
    /// Slow direct creep onto the final waypoint
    FineApproach,
    /// Holding still after reaching a waypoint
    Settle,
    /// External halt asserted
    Halted,
    /// Mission finished or aborted
    #[default]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_level_order() {
        assert!(SafetyLevel::Emergency < SafetyLevel::Critical);
        assert!(SafetyLevel::Critical < SafetyLevel::Warning);
        assert!(SafetyLevel::Warning < SafetyLevel::Caution);
        assert!(SafetyLevel::Caution < SafetyLevel::Clear);
        assert_eq!(SafetyLevel::Clear.to_string(), "CLEAR");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SafetyLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let mode: DriveMode = serde_json::from_str("\"collision_backoff\"").unwrap();
        assert_eq!(mode, DriveMode::CollisionBackoff);
    }
}
