// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Priority-ordered label decision.
//!
//! Override beats everything. While the pump runs, a hard cause reported by
//! the device wins over recomputed signals; a routine hint means the pump ran
//! on its own schedule. With the pump off, any mapped reason label wins,
//! then signals, then the calm/other fallback.

use crate::config::LabelerConfig;
use crate::label::Label;
use crate::reason::ReasonCode;
use crate::sample::TelemetrySample;
use crate::signals::{Indicator, SignalSet};

/// A signal rule: the label fires if any of the indicators is set.
pub type SignalRule = (&'static [Indicator], Label);

/// Signal rules applied while the pump runs, in priority order.
pub const PUMP_ON_RULES: &[SignalRule] = &[
    (&[Indicator::CoolingHot], Label::CoolingHot),
    (&[Indicator::TdsSpike], Label::TdsSpike),
    (&[Indicator::ColdShock], Label::ColdShock),
    (&[Indicator::OverheatUniform], Label::UniformOverheat),
    (&[Indicator::FlashlightNight], Label::FlashlightNight),
    (&[Indicator::Glare, Indicator::HeaterLamp], Label::Glare),
];

/// Signal rules applied while the pump is off, in priority order.
pub const PUMP_OFF_RULES: &[SignalRule] = &[
    (&[Indicator::FlashlightNight], Label::FlashlightNight),
    (&[Indicator::Glare, Indicator::HeaterLamp], Label::Glare),
    (&[Indicator::TdsSpike], Label::TdsSpike),
    (&[Indicator::ColdShock], Label::ColdShock),
    (&[Indicator::OverheatUniform], Label::UniformOverheat),
    (&[Indicator::HumanTap], Label::HumanTap),
    (&[Indicator::Disturbance], Label::Disturbance),
    (&[Indicator::CoolingHot], Label::CoolingHot),
];

fn first_match(rules: &[SignalRule], signals: &SignalSet) -> Option<Label> {
    rules
        .iter()
        .find(|(indicators, _)| signals.any(indicators))
        .map(|(_, label)| *label)
}

/// Pick the label for one sample.
pub fn decide(
    sample: &TelemetrySample,
    signals: &SignalSet,
    reason: ReasonCode,
    config: &LabelerConfig,
) -> Label {
    if sample.pump {
        if sample.manual_override {
            return Label::ManualOverride;
        }
        match reason {
            ReasonCode::Event(label) if label.is_device_cause() => label,
            ReasonCode::PumpHint => Label::PumpSelf,
            _ => first_match(PUMP_ON_RULES, signals).unwrap_or(Label::PumpSelf),
        }
    } else {
        if let ReasonCode::Event(label) = reason {
            if !matches!(label, Label::PumpSelf | Label::ManualOverride) {
                return label;
            }
        }
        first_match(PUMP_OFF_RULES, signals).unwrap_or_else(|| quiet_label(sample, signals, config))
    }
}

/// Fallback when nothing fired: calm if dim and quiet.
fn quiet_label(sample: &TelemetrySample, signals: &SignalSet, config: &LabelerConfig) -> Label {
    let dim = !sample.lux.is_finite() || sample.lux < 0.5 * config.light.glare_lux;
    if dim && signals.z_score <= config.acoustic.calm_z_max {
        Label::Calm
    } else {
        Label::Other
    }
}
