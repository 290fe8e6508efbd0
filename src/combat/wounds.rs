//! Wound model: health-driven dice penalties and persistent wound states
//!
//! Two penalties stack. `wound_dice` follows current health during a fight;
//! `severity_penalty` follows the narrative wound a character carries
//! between fights.

use serde::{Deserialize, Serialize};

/// Persistent narrative wound state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WoundSeverity {
    Healthy,
    Light,
    Serious,
    Severe,
    Grave,
}

impl WoundSeverity {
    /// Severity a character walks away with at a given health share
    pub fn from_health(current: i32, max: i32) -> Self {
        let pct = health_percent(current, max);
        if pct >= 75.0 {
            WoundSeverity::Healthy
        } else if pct >= 50.0 {
            WoundSeverity::Light
        } else if pct >= 25.0 {
            WoundSeverity::Serious
        } else if pct >= 10.0 {
            WoundSeverity::Severe
        } else {
            WoundSeverity::Grave
        }
    }

    pub fn needs_tending(self) -> bool {
        self >= WoundSeverity::Serious
    }
}

fn health_percent(current: i32, max: i32) -> f32 {
    if max <= 0 {
        return 0.0;
    }
    current.max(0) as f32 * 100.0 / max as f32
}

/// Dice removed from a pool as health drops
pub fn wound_dice(current: i32, max: i32) -> i32 {
    let pct = health_percent(current, max);
    if pct >= 75.0 {
        0
    } else if pct >= 50.0 {
        1
    } else if pct >= 25.0 {
        2
    } else if pct >= 10.0 {
        3
    } else {
        4
    }
}

/// Dice removed for a persistent wound, independent of current health
///
/// Grave wounds keep a character out of combat entirely, so they carry
/// no dice penalty here.
pub fn severity_penalty(severity: WoundSeverity) -> i32 {
    match severity {
        WoundSeverity::Light => 1,
        WoundSeverity::Serious => 2,
        WoundSeverity::Severe => 3,
        WoundSeverity::Healthy | WoundSeverity::Grave => 0,
    }
}

/// Chance an untended wound festers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectionRisk {
    None,
    Low,
    Moderate,
    High,
}

impl InfectionRisk {
    fn step_up(self) -> Self {
        match self {
            InfectionRisk::None => InfectionRisk::Low,
            InfectionRisk::Low => InfectionRisk::Moderate,
            InfectionRisk::Moderate | InfectionRisk::High => InfectionRisk::High,
        }
    }
}

/// Post-combat wound assessment for one survivor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoundAssessment {
    pub character_id: crate::core::types::CharacterId,
    pub health_percent: f32,
    pub severity: WoundSeverity,
    pub dice_penalty: i32,
    pub infection_risk: InfectionRisk,
    pub requires_tending: bool,
}

/// Assess a survivor from their final health and bleeding state
pub fn assess_wounds(
    character_id: crate::core::types::CharacterId,
    current: i32,
    max: i32,
    still_bleeding: bool,
) -> WoundAssessment {
    let severity = WoundSeverity::from_health(current, max);
    let base_risk = match severity {
        WoundSeverity::Healthy => InfectionRisk::None,
        WoundSeverity::Light => InfectionRisk::Low,
        WoundSeverity::Serious => InfectionRisk::Moderate,
        WoundSeverity::Severe | WoundSeverity::Grave => InfectionRisk::High,
    };
    let infection_risk = if still_bleeding {
        base_risk.step_up()
    } else {
        base_risk
    };

    WoundAssessment {
        character_id,
        health_percent: health_percent(current, max),
        severity,
        dice_penalty: severity_penalty(severity),
        infection_risk,
        requires_tending: severity.needs_tending(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CharacterId;

    #[test]
    fn test_wound_dice_tiers() {
        assert_eq!(wound_dice(100, 100), 0);
        assert_eq!(wound_dice(75, 100), 0);
        assert_eq!(wound_dice(74, 100), 1);
        assert_eq!(wound_dice(50, 100), 1);
        assert_eq!(wound_dice(30, 100), 2);
        assert_eq!(wound_dice(12, 100), 3);
        assert_eq!(wound_dice(5, 100), 4);
        assert_eq!(wound_dice(0, 100), 4);
    }

    #[test]
    fn test_wound_dice_never_decreases_as_health_drops() {
        let mut last = 0;
        for hp in (0..=120).rev() {
            let dice = wound_dice(hp, 120);
            assert!(dice >= last);
            last = dice;
        }
    }

    #[test]
    fn test_severity_penalties() {
        assert_eq!(severity_penalty(WoundSeverity::Healthy), 0);
        assert_eq!(severity_penalty(WoundSeverity::Light), 1);
        assert_eq!(severity_penalty(WoundSeverity::Serious), 2);
        assert_eq!(severity_penalty(WoundSeverity::Severe), 3);
        assert_eq!(severity_penalty(WoundSeverity::Grave), 0);
    }

    #[test]
    fn test_assessment_of_battered_survivor() {
        let assessment = assess_wounds(CharacterId(9), 20, 100, true);
        assert_eq!(assessment.severity, WoundSeverity::Severe);
        assert_eq!(assessment.dice_penalty, 3);
        assert_eq!(assessment.infection_risk, InfectionRisk::High);
        assert!(assessment.requires_tending);
    }

    #[test]
    fn test_bleeding_raises_infection_risk() {
        let dry = assess_wounds(CharacterId(1), 60, 100, false);
        let wet = assess_wounds(CharacterId(1), 60, 100, true);
        assert_eq!(dry.infection_risk, InfectionRisk::Low);
        assert_eq!(wet.infection_risk, InfectionRisk::Moderate);
        assert!(!dry.requires_tending);
    }
}
