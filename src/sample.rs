// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Telemetry samples and the ingress adapter.
//!
//! Device records arrive as loosely typed key/value pairs (CSV rows written by
//! the collector, or its NDJSON lines). The adapter never rejects a record:
//! - numeric fields that are absent, empty or unparsable become NaN
//! - boolean fields are true only for `1`, `true`, `t`, `yes`, `y`
//! - `rec_ms` becomes a non-negative whole number of milliseconds
//!
//! Downstream code treats NaN as "unknown", never as zero.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of values in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 13;

/// Column names of the training feature vector, in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "micRMS",
    "lux",
    "tMid",
    "dT_tb",
    "DOproxy",
    "tds_mV",
    "irObj",
    "irAmb",
    "airT",
    "airRH",
    "pressure_hPa",
    "pump",
    "manual_override",
];

/// One telemetry observation from the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Collector receive time (s).
    pub ts: f64,
    /// Device monotonic clock (ms).
    pub ms: f64,
    pub pump: bool,
    pub manual_override: bool,
    pub alert: bool,
    /// Device-supplied cause annotation.
    pub reason: String,
    /// Collector context annotation (e.g. `day`).
    pub context: String,
    /// Pump run time recommended by the controller (ms).
    pub rec_ms: u64,
    #[serde(rename = "tTop")]
    pub t_top: f64,
    #[serde(rename = "tMid")]
    pub t_mid: f64,
    #[serde(rename = "tBot")]
    pub t_bot: f64,
    /// Top-minus-bottom temperature gradient.
    #[serde(rename = "dT_tb")]
    pub dt_tb: f64,
    #[serde(rename = "pressure_hPa")]
    pub pressure_hpa: f64,
    pub lux: f64,
    #[serde(rename = "irObj")]
    pub ir_obj: f64,
    #[serde(rename = "irAmb")]
    pub ir_amb: f64,
    #[serde(rename = "airT")]
    pub air_t: f64,
    #[serde(rename = "airRH")]
    pub air_rh: f64,
    #[serde(rename = "tds_mV")]
    pub tds_mv: f64,
    pub tds_sat: bool,
    #[serde(rename = "micRMS")]
    pub mic_rms: f64,
    #[serde(rename = "DOproxy")]
    pub do_proxy: f64,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            ts: f64::NAN,
            ms: f64::NAN,
            pump: false,
            manual_override: false,
            alert: false,
            reason: String::new(),
            context: String::new(),
            rec_ms: 0,
            t_top: f64::NAN,
            t_mid: f64::NAN,
            t_bot: f64::NAN,
            dt_tb: f64::NAN,
            pressure_hpa: f64::NAN,
            lux: f64::NAN,
            ir_obj: f64::NAN,
            ir_amb: f64::NAN,
            air_t: f64::NAN,
            air_rh: f64::NAN,
            tds_mv: f64::NAN,
            tds_sat: false,
            mic_rms: f64::NAN,
            do_proxy: f64::NAN,
        }
    }
}

impl TelemetrySample {
    /// A sample at `ts` with every reading unknown.
    pub fn at(ts: f64) -> Self {
        Self {
            ts,
            ..Self::default()
        }
    }

    /// Training feature vector for this sample.
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.mic_rms,
            self.lux,
            self.t_mid,
            self.dt_tb,
            self.do_proxy,
            self.tds_mv,
            self.ir_obj,
            self.ir_amb,
            self.air_t,
            self.air_rh,
            self.pressure_hpa,
            flag(self.pump),
            flag(self.manual_override),
        ])
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Fixed-order numeric features, see [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Value by column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

/// Parse a numeric field; anything unusable is NaN.
pub fn parse_float(raw: Option<&str>) -> f64 {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Parse a boolean-like field.
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| {
        matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y"
        )
    })
    .unwrap_or(false)
}

/// Parse a duration in whole milliseconds, truncating fractions.
/// Unknown, negative or non-finite values are 0.
pub fn parse_millis(raw: Option<&str>) -> u64 {
    let v = parse_float(raw);
    if v.is_finite() && v > 0.0 {
        v.trunc() as u64
    } else {
        0
    }
}

/// Trait for ingress adapters.
pub trait SampleAdapter {
    /// Convert source data to a typed sample.
    fn to_sample(&self) -> TelemetrySample;
}

/// A raw device record: field name to textual value.
///
/// Example NDJSON line accepted by [`RawRecord::from_json`]:
/// ```json
/// {"ts": 1717000000.5, "pump": "1", "tMid": 24.1, "lux": "", "reason": "cold_shock"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a field.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse one JSON object. Scalars are kept as text, `null` as empty.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, Value> = serde_json::from_str(json)?;
        Ok(object
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::Null => String::new(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect())
    }

    fn float(&self, key: &str) -> f64 {
        parse_float(self.get(key))
    }

    fn flag(&self, key: &str) -> bool {
        parse_flag(self.get(key))
    }

    fn text(&self, key: &str) -> String {
        self.get(key).map(str::trim).unwrap_or_default().to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SampleAdapter for RawRecord {
    fn to_sample(&self) -> TelemetrySample {
        TelemetrySample {
            ts: self.float("ts"),
            ms: self.float("ms"),
            pump: self.flag("pump"),
            manual_override: self.flag("manual_override"),
            alert: self.flag("alert"),
            reason: self.text("reason"),
            context: self.text("context"),
            rec_ms: parse_millis(self.get("rec_ms")),
            t_top: self.float("tTop"),
            t_mid: self.float("tMid"),
            t_bot: self.float("tBot"),
            dt_tb: self.float("dT_tb"),
            pressure_hpa: self.float("pressure_hPa"),
            lux: self.float("lux"),
            ir_obj: self.float("irObj"),
            ir_amb: self.float("irAmb"),
            air_t: self.float("airT"),
            air_rh: self.float("airRH"),
            tds_mv: self.float("tds_mV"),
            tds_sat: self.flag("tds_sat"),
            mic_rms: self.float("micRMS"),
            do_proxy: self.float("DOproxy"),
        }
    }
}
