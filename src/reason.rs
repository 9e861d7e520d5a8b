// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Mapping of the device `reason` annotation to a label.
//!
//! The device firmware writes free-text causes such as `cold_shock` or
//! `strat_lowc_night_mild`. They are matched case-insensitively against an
//! exact table first, then against ordered substring rules. The first
//! matching rule wins.

use crate::label::Label;

/// Result of mapping a reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// No reason given.
    None,
    /// The device ran the pump for a routine water-quality reason
    /// (stratification, inversion, low oxygen, pressure, mild night).
    PumpHint,
    /// The reason names a label.
    Event(Label),
}

impl ReasonCode {
    pub fn label(&self) -> Option<Label> {
        match self {
            ReasonCode::Event(label) => Some(*label),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::None => "none",
            ReasonCode::PumpHint => "pump-hint",
            ReasonCode::Event(label) => label.as_str(),
        }
    }
}

/// How a rule matches the normalized reason.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Every fragment must occur.
    AllOf(&'static [&'static str]),
    /// At least one fragment must occur.
    AnyOf(&'static [&'static str]),
}

impl Pattern {
    pub fn matches(&self, reason: &str) -> bool {
        match self {
            Pattern::AllOf(parts) => parts.iter().all(|p| reason.contains(p)),
            Pattern::AnyOf(parts) => parts.iter().any(|p| reason.contains(p)),
        }
    }
}

/// A substring rule.
#[derive(Debug, Clone, Copy)]
pub struct ReasonRule {
    pub pattern: Pattern,
    pub code: ReasonCode,
}

const fn rule(pattern: Pattern, code: ReasonCode) -> ReasonRule {
    ReasonRule { pattern, code }
}

/// Exact reason strings.
pub const EXACT_REASONS: &[(&str, Label)] = &[
    ("cold_shock", Label::ColdShock),
    ("tds_spike", Label::TdsSpike),
    ("uniform_overheat", Label::UniformOverheat),
    ("cooling_hot", Label::CoolingHot),
    ("human_tap", Label::HumanTap),
    ("disturbance", Label::Disturbance),
    ("flashlight_night", Label::FlashlightNight),
    ("heater_lamp", Label::Glare),
];

/// Substring rules in priority order.
pub const REASON_RULES: &[ReasonRule] = &[
    rule(Pattern::AllOf(&["cooling_hot"]), ReasonCode::Event(Label::CoolingHot)),
    rule(
        Pattern::AllOf(&["flashlight", "night"]),
        ReasonCode::Event(Label::FlashlightNight),
    ),
    rule(Pattern::AllOf(&["heater_lamp"]), ReasonCode::Event(Label::Glare)),
    rule(Pattern::AllOf(&["cold_shock"]), ReasonCode::Event(Label::ColdShock)),
    rule(Pattern::AllOf(&["tds_spike"]), ReasonCode::Event(Label::TdsSpike)),
    rule(
        Pattern::AllOf(&["uniform_overheat"]),
        ReasonCode::Event(Label::UniformOverheat),
    ),
    rule(
        Pattern::AnyOf(&["strat", "inv", "lowc", "baro", "night_mild"]),
        ReasonCode::PumpHint,
    ),
    rule(
        Pattern::AnyOf(&["safe_hold_sensor", "abrupt_dark"]),
        ReasonCode::Event(Label::Other),
    ),
];

/// Map a raw reason annotation.
pub fn map_reason(reason: &str) -> ReasonCode {
    let r = reason.trim().to_lowercase();
    if r.is_empty() || r == "none" {
        return ReasonCode::None;
    }

    if let Some((_, label)) = EXACT_REASONS.iter().find(|(key, _)| *key == r) {
        return ReasonCode::Event(*label);
    }

    REASON_RULES
        .iter()
        .find(|rule| rule.pattern.matches(&r))
        .map(|rule| rule.code)
        .unwrap_or(ReasonCode::Event(Label::Other))
}
