// UBi Guardian - Integration Tests
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end labeling scenarios over synthetic sample streams.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ubi_guardian::*;

// ============================================================================
// Helper Functions
// ============================================================================

/// Engine with a unit calibration, so `mic_rms` is the z-score.
fn unit_engine() -> LabelEngine {
    LabelEngine::new(LabelerConfig::default(), MicCalibration::new(0.0, 1.0)).unwrap()
}

fn quiet(ts: f64) -> TelemetrySample {
    TelemetrySample {
        lux: 10.0,
        mic_rms: 0.0,
        t_mid: 22.0,
        ..TelemetrySample::at(ts)
    }
}

/// Uniform in `[lo, hi)`, unknown one time in ten.
fn maybe(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if rng.gen_bool(0.1) {
        f64::NAN
    } else {
        rng.gen_range(lo..hi)
    }
}

fn random_sample(rng: &mut StdRng, ts: f64) -> TelemetrySample {
    let reasons = ["", "none", "cold_shock", "strat", "lowc", "demo", "human_tap"];
    TelemetrySample {
        pump: rng.gen_bool(0.3),
        manual_override: rng.gen_bool(0.05),
        reason: reasons[rng.gen_range(0..reasons.len())].to_string(),
        rec_ms: rng.gen_range(0..2) * 5000,
        t_mid: maybe(rng, 18.0, 33.0),
        dt_tb: maybe(rng, -1.5, 1.5),
        pressure_hpa: maybe(rng, 995.0, 1020.0),
        lux: maybe(rng, 0.0, 3000.0),
        ir_obj: maybe(rng, 15.0, 50.0),
        ir_amb: maybe(rng, 15.0, 30.0),
        air_t: maybe(rng, 10.0, 55.0),
        air_rh: maybe(rng, 5.0, 90.0),
        tds_mv: maybe(rng, 300.0, 900.0),
        mic_rms: maybe(rng, 0.0, 2.0),
        do_proxy: maybe(rng, 3.0, 9.0),
        ..TelemetrySample::at(ts)
    }
}

fn random_stream(seed: u64, n: usize) -> Vec<TelemetrySample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ts = 1_700_000_000.0;
    (0..n)
        .map(|_| {
            ts += rng.gen_range(0.1..8.0);
            random_sample(&mut rng, ts)
        })
        .collect()
}

// ============================================================================
// Section 1: Override and Reason Handling
// ============================================================================

#[test]
fn test_manual_override_with_empty_reason() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        pump: true,
        manual_override: true,
        reason: String::new(),
        ..quiet(0.0)
    });
    assert_eq!(out.label, Label::ManualOverride);
}

#[test]
fn test_device_reason_while_pumping() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        pump: true,
        reason: "Cold_Shock".to_string(),
        ..quiet(0.0)
    });
    assert_eq!(out.label, Label::ColdShock);
}

#[test]
fn test_routine_pump_is_pump_self() {
    let mut engine = unit_engine();
    for (i, reason) in ["strat", "inv_fix", "lowc_night", "baro", "night_mild"]
        .iter()
        .enumerate()
    {
        let out = engine.process(&TelemetrySample {
            pump: true,
            reason: reason.to_string(),
            ..quiet(i as f64)
        });
        assert_eq!(out.label, Label::PumpSelf, "reason {}", reason);
    }
}

#[test]
fn test_unknown_reason_pump_off_is_other() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        reason: "safe_hold_sensor".to_string(),
        ..quiet(0.0)
    });
    assert_eq!(out.label, Label::Other);
}

// ============================================================================
// Section 2: Thermal Scenarios
// ============================================================================

#[test]
fn test_cold_shock_after_full_window() {
    let mut engine = unit_engine();
    for i in 0..61 {
        let out = engine.process(&TelemetrySample {
            t_mid: 20.0,
            ..quiet(i as f64)
        });
        assert!(!out.signals.cold_shock);
    }
    let out = engine.process(&TelemetrySample {
        t_mid: 19.0,
        ..quiet(61.0)
    });
    assert!(out.signals.cold_shock);
    assert_eq!(out.label, Label::ColdShock);
}

#[test]
fn test_no_cold_shock_before_window_fills() {
    let mut engine = unit_engine();
    for i in 0..10 {
        engine.process(&TelemetrySample {
            t_mid: 20.0,
            ..quiet(i as f64)
        });
    }
    let out = engine.process(&TelemetrySample {
        t_mid: 15.0,
        ..quiet(10.0)
    });
    assert!(!out.signals.cold_shock);
}

#[test]
fn test_cooling_hot_while_pumping() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        pump: true,
        t_mid: 31.0,
        dt_tb: 0.1,
        ..quiet(0.0)
    });
    assert!(out.signals.overheat_un);
    assert_eq!(out.label, Label::CoolingHot);
}

#[test]
fn test_uniform_overheat_outranks_cooling_when_idle() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        t_mid: 31.0,
        dt_tb: 0.1,
        ..quiet(0.0)
    });
    assert_eq!(out.label, Label::UniformOverheat);

    let out = engine.process(&TelemetrySample {
        t_mid: 31.0,
        dt_tb: 0.8,
        ..quiet(1.0)
    });
    assert_eq!(out.label, Label::CoolingHot);
}

// ============================================================================
// Section 3: TDS Dwell
// ============================================================================

#[test]
fn test_tds_spike_after_dwell() {
    let mut engine = unit_engine();
    let first = engine.process(&TelemetrySample {
        tds_mv: 500.0,
        ..quiet(0.0)
    });
    assert!(!first.signals.tds_spike_instant);

    for i in 1..=12 {
        let out = engine.process(&TelemetrySample {
            tds_mv: 800.0,
            ..quiet(i as f64)
        });
        assert!(out.signals.tds_spike_instant, "instant at {}", i);
        assert_eq!(out.signals.tds_spike, i >= 10, "dwell at {}", i);
        if i >= 10 {
            assert_eq!(out.label, Label::TdsSpike);
        }
    }
}

#[test]
fn test_tds_dwell_breaks_and_restarts() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        tds_mv: 500.0,
        ..quiet(0.0)
    });
    for i in 1..=9 {
        engine.process(&TelemetrySample {
            tds_mv: 800.0,
            ..quiet(i as f64)
        });
    }
    let gap = engine.process(&TelemetrySample {
        tds_mv: 520.0,
        ..quiet(10.0)
    });
    assert!(!gap.signals.tds_spike);
    assert_eq!(engine.state().tds_dwell_secs(), 0.0);

    let resumed = engine.process(&TelemetrySample {
        tds_mv: 800.0,
        ..quiet(11.0)
    });
    assert!(resumed.signals.tds_spike_instant);
    assert!(!resumed.signals.tds_spike);
}

#[test]
fn test_clock_glitch_cannot_satisfy_dwell() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        tds_mv: 500.0,
        ..quiet(0.0)
    });
    engine.process(&TelemetrySample {
        tds_mv: 800.0,
        ..quiet(1.0)
    });
    // a one-hour gap is credited as a single default step
    let out = engine.process(&TelemetrySample {
        tds_mv: 800.0,
        ..quiet(3601.0)
    });
    assert_eq!(out.dt, 1.0);
    assert!(!out.signals.tds_spike);
}

// ============================================================================
// Section 4: Light Scenarios
// ============================================================================

#[test]
fn test_flashlight_at_night() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        lux: 10.0,
        ..quiet(0.0)
    });
    let out = engine.process(&TelemetrySample {
        lux: 140.0,
        ..quiet(1.0)
    });
    assert!(!out.signals.is_day);
    assert!(out.signals.flashlight_night);
    assert_eq!(out.label, Label::FlashlightNight);
}

#[test]
fn test_bright_jump_switches_to_day_first() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        lux: 10.0,
        ..quiet(0.0)
    });
    let out = engine.process(&TelemetrySample {
        lux: 200.0,
        ..quiet(1.0)
    });
    assert!(out.signals.is_day);
    assert!(!out.signals.flashlight_night);
    assert_eq!(engine.state().day_switched_at(), Some(1.0));
}

#[test]
fn test_glare_and_heater_lamp() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        lux: 2500.0,
        ir_obj: 50.0,
        ..quiet(0.0)
    });
    assert!(out.signals.heater_lamp);
    assert_eq!(out.label, Label::Glare);
}

#[test]
fn test_day_brightening_dwell() {
    let mut engine = unit_engine();
    for i in 0..4 {
        engine.process(&TelemetrySample {
            lux: 200.0,
            ..quiet(i as f64)
        });
    }
    let mut fired = Vec::new();
    for i in 4..8 {
        let out = engine.process(&TelemetrySample {
            lux: 1000.0,
            ..quiet(i as f64)
        });
        fired.push(out.signals.abrupt_dark_day);
    }
    assert_eq!(fired, vec![false, false, true, false]);
}

#[test]
fn test_bright_day_is_other() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        lux: 1500.0,
        ..quiet(0.0)
    });
    assert_eq!(out.label, Label::Other);
}

// ============================================================================
// Section 5: Acoustic Scenarios
// ============================================================================

#[test]
fn test_human_tap_window() {
    let mut engine = unit_engine();
    let labels: Vec<Label> = (0..4)
        .map(|i| {
            engine
                .process(&TelemetrySample {
                    mic_rms: 3.0,
                    ..quiet(i as f64)
                })
                .label
        })
        .collect();
    assert_eq!(
        labels,
        vec![Label::Other, Label::HumanTap, Label::HumanTap, Label::Other]
    );
}

#[test]
fn test_disturbance_after_dwell() {
    let mut engine = unit_engine();
    let mut last = None;
    for i in 0..=5 {
        last = Some(engine.process(&TelemetrySample {
            mic_rms: 3.0,
            ..quiet(i as f64)
        }));
    }
    let out = last.unwrap();
    assert!(out.signals.disturbance);
    assert_eq!(out.label, Label::Disturbance);

    let calm = engine.process(&quiet(6.0));
    assert!(!calm.signals.disturbance);
    assert_eq!(engine.state().disturbance_secs(), None);
    assert_eq!(calm.label, Label::Calm);
}

#[test]
fn test_pump_noise_is_masked() {
    let mut engine = unit_engine();
    for i in 0..8 {
        let out = engine.process(&TelemetrySample {
            pump: true,
            mic_rms: 5.0,
            ..quiet(100.0 + i as f64)
        });
        assert!(!out.signals.human_tap);
        assert!(!out.signals.disturbance);
        assert_eq!(engine.state().disturbance_secs(), None);
        assert_eq!(out.label, Label::PumpSelf);
    }

    // mask lifts 8 s after the pump-on edge
    let mut flags = Vec::new();
    for i in 8..=13 {
        let out = engine.process(&TelemetrySample {
            pump: true,
            mic_rms: 5.0,
            ..quiet(100.0 + i as f64)
        });
        flags.push(out.signals.disturbance);
        assert!(!out.signals.human_tap);
    }
    assert_eq!(flags, vec![false, false, false, false, false, true]);
}

#[test]
fn test_unknown_mic_is_quiet() {
    let mut engine = unit_engine();
    let out = engine.process(&TelemetrySample {
        mic_rms: f64::NAN,
        ..quiet(0.0)
    });
    assert_eq!(out.signals.z_score, 0.0);
    assert_eq!(out.label, Label::Calm);
}

// ============================================================================
// Section 6: Pressure
// ============================================================================

#[test]
fn test_baro_drop() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        pressure_hpa: 1010.0,
        ..quiet(0.0)
    });
    let out = engine.process(&TelemetrySample {
        pressure_hpa: 1003.5,
        ..quiet(600.0)
    });
    assert!(out.signals.baro_drop);
    // not a labeling signal on its own
    assert_eq!(out.label, Label::Calm);
}

#[test]
fn test_baro_history_expires() {
    let mut engine = unit_engine();
    engine.process(&TelemetrySample {
        pressure_hpa: 1010.0,
        ..quiet(0.0)
    });
    let out = engine.process(&TelemetrySample {
        pressure_hpa: 1000.0,
        ..quiet(4.0 * 3600.0)
    });
    assert!(!out.signals.baro_drop);
    assert_eq!(engine.state().pressure_history().len(), 1);
}

// ============================================================================
// Section 7: Properties
// ============================================================================

#[test]
fn test_every_sample_gets_one_vocabulary_label() {
    let samples = random_stream(7, 2_000);
    let dataset = label_dataset(&samples, LabelerConfig::default()).unwrap();

    assert_eq!(dataset.len(), samples.len());
    assert_eq!(dataset.counts.total(), samples.len() as u64);
    for label in dataset.labels() {
        assert!(Label::ALL.contains(&label));
        assert_eq!(label.as_str().parse::<Label>(), Ok(label));
    }
}

#[test]
fn test_calibration_is_permutation_invariant() {
    let samples = random_stream(11, 500);
    let reference = MicCalibration::from_samples(&samples).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..5 {
        let mut shuffled = samples.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(MicCalibration::from_samples(&shuffled).unwrap(), reference);
    }
    assert_eq!(MicCalibration::from_samples(&samples).unwrap(), reference);
}

#[test]
fn test_window_bounds_hold() {
    let config = LabelerConfig::default();
    let mut engine = LabelEngine::new(config.clone(), MicCalibration::new(0.0, 1.0)).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let mut ts = 0.0;
    for _ in 0..1_500 {
        ts += rng.gen_range(1.0..30.0);
        engine.process(&random_sample(&mut rng, ts));

        let state = engine.state();
        assert!(state.temperature_window().len() <= config.thermal.cold_window_samples);
        assert!(state.light_window().len() <= config.light.window_capacity());
        let history = state.pressure_history();
        if let (Some(oldest), Some(newest)) = (history.oldest(), history.newest()) {
            assert!(newest.ts - oldest.ts <= config.pressure.history_secs);
        }
    }
}

#[test]
fn test_labeling_is_deterministic() {
    let samples = random_stream(21, 800);
    let a = label_dataset(&samples, LabelerConfig::default()).unwrap();
    let b = label_dataset(&samples, LabelerConfig::default()).unwrap();
    assert!(a.labels().eq(b.labels()));
    assert_eq!(a.counts, b.counts);
}

#[test]
fn test_separate_calibration_set() {
    let history = random_stream(5, 300);
    let live = random_stream(6, 50);
    let calibration = MicCalibration::from_samples(&history).unwrap();
    let dataset = label_dataset_with(&live, LabelerConfig::default(), calibration).unwrap();
    assert_eq!(dataset.calibration, calibration);
    assert_eq!(dataset.len(), 50);
}

// ============================================================================
// Section 8: Ingestion and Configuration
// ============================================================================

#[test]
fn test_ndjson_record_to_label() {
    let line = r#"{"ts": 12.5, "pump": "1", "manual_override": 0, "tMid": 24.1,
        "lux": null, "reason": " Heater_Lamp ", "rec_ms": "1500.7", "micRMS": "x"}"#;
    let sample = RawRecord::from_json(line).unwrap().to_sample();
    assert!(sample.pump);
    assert!(!sample.manual_override);
    assert!(sample.lux.is_nan());
    assert!(sample.mic_rms.is_nan());
    assert_eq!(sample.rec_ms, 1500);
    assert_eq!(sample.reason, "Heater_Lamp");

    let mut engine = unit_engine();
    assert_eq!(engine.process(&sample).label, Label::Glare);
}

#[test]
fn test_partial_config_json() {
    let config = LabelerConfig::from_json(r#"{"tds": {"dwell_secs": 3.0}}"#).unwrap();
    assert_eq!(config.tds.dwell_secs, 3.0);
    assert_eq!(config.tds.jump_abs_mv, 200.0);
    assert_eq!(config.light, LightConfig::default());

    let mut engine = LabelEngine::new(config, MicCalibration::new(0.0, 1.0)).unwrap();
    engine.process(&TelemetrySample {
        tds_mv: 500.0,
        ..quiet(0.0)
    });
    let labels: Vec<Label> = (1..=3)
        .map(|i| {
            engine
                .process(&TelemetrySample {
                    tds_mv: 800.0,
                    ..quiet(i as f64)
                })
                .label
        })
        .collect();
    assert_eq!(labels, vec![Label::Calm, Label::Calm, Label::TdsSpike]);
}

#[test]
fn test_empty_inputs_are_fatal() {
    assert_eq!(
        label_dataset(&[], LabelerConfig::default()).unwrap_err(),
        LabelerError::EmptyStream
    );
    assert_eq!(
        MicCalibration::from_samples(&[]).unwrap_err(),
        LabelerError::EmptyCalibrationSet
    );
}

// ============================================================================
// Section 9: Alerting Helpers
// ============================================================================

#[test]
fn test_events_archive_and_notifications() {
    let samples = vec![
        quiet(0.0),
        TelemetrySample {
            rec_ms: 4000,
            reason: "strat".to_string(),
            ..quiet(10.0)
        },
        TelemetrySample {
            rec_ms: 4000,
            reason: "strat".to_string(),
            ..quiet(20.0)
        },
        TelemetrySample {
            alert: true,
            reason: "cold_shock".to_string(),
            ..quiet(30.0)
        },
    ];

    let worthy: Vec<f64> = samples
        .iter()
        .filter(|s| is_event_worthy(s))
        .map(|s| s.ts)
        .collect();
    assert_eq!(worthy, vec![10.0, 20.0, 30.0]);

    let mut gate = AlertGate::default();
    let sent: Vec<f64> = samples
        .iter()
        .filter(|s| gate.admit(s, s.ts))
        .map(|s| s.ts)
        .collect();
    assert_eq!(sent, vec![10.0, 30.0]);

    let mut log = PumpLog::default();
    samples.iter().for_each(|s| log.record(s));
    assert_eq!(log.duty_secs(30.0, 3600.0), 8.0);
    assert_eq!(DoBand::from_do_proxy(samples[0].do_proxy), DoBand::NotAvailable);
}
