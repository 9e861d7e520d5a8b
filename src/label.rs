// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Event label vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Why the pump did or did not run for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    /// Nothing happening, dim and quiet.
    Calm,
    /// Mid temperature fell sharply over the temperature window.
    ColdShock,
    /// Pump cooling a hot tank.
    CoolingHot,
    /// Sustained surface ripple.
    Disturbance,
    /// Sudden light at night.
    FlashlightNight,
    /// Direct glare or a heat lamp.
    Glare,
    /// Short ripple, likely a tap on the glass.
    HumanTap,
    /// Pump forced on by the operator.
    ManualOverride,
    /// Something unexplained.
    Other,
    /// Pump ran for a routine automatic reason.
    PumpSelf,
    /// Sustained dissolved-solids jump.
    TdsSpike,
    /// Warm, unstratified column.
    UniformOverheat,
}

impl Label {
    /// The full vocabulary in name order.
    pub const ALL: [Label; 12] = [
        Label::Calm,
        Label::ColdShock,
        Label::CoolingHot,
        Label::Disturbance,
        Label::FlashlightNight,
        Label::Glare,
        Label::HumanTap,
        Label::ManualOverride,
        Label::Other,
        Label::PumpSelf,
        Label::TdsSpike,
        Label::UniformOverheat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Calm => "calm",
            Label::ColdShock => "cold-shock",
            Label::CoolingHot => "cooling-hot",
            Label::Disturbance => "disturbance",
            Label::FlashlightNight => "flashlight-night",
            Label::Glare => "glare",
            Label::HumanTap => "human-tap",
            Label::ManualOverride => "manual-override",
            Label::Other => "other",
            Label::PumpSelf => "pump-self",
            Label::TdsSpike => "tds-spike",
            Label::UniformOverheat => "uniform-overheat",
        }
    }

    /// Causes the device detects itself and reports in `reason`. While the
    /// pump runs these override recomputed signals.
    pub fn is_device_cause(&self) -> bool {
        matches!(
            self,
            Label::CoolingHot
                | Label::ColdShock
                | Label::TdsSpike
                | Label::UniformOverheat
                | Label::HumanTap
                | Label::Disturbance
                | Label::FlashlightNight
                | Label::Glare
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a string outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Per-label tally of a labeling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    counts: BTreeMap<Label, u64>,
}

impl LabelCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: Label) {
        *self.counts.entry(label).or_insert(0) += 1;
    }

    pub fn get(&self, label: Label) -> u64 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Labels seen at least once, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, u64)> + '_ {
        self.counts.iter().map(|(l, c)| (*l, *c))
    }
}

impl fmt::Display for LabelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (label, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': {}", label, count)?;
        }
        f.write_str("}")
    }
}
