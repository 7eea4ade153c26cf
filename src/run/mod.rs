/*
 * Copyright (c):
 * 2026 zephyrj
 * zephyrj@protonmail.com
 *
 * This file is part of powertrain-sim.
 *
 * powertrain-sim is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * powertrain-sim is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with powertrain-sim. If not, see <https://www.gnu.org/licenses/>.
 */

use std::fs;
use std::path::Path;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};
use powertrain::{GearingCalculator, Mechanics, PowertrainError, Telemetry, TractionModel, VehicleSpec};
use utils::numeric::round_float_to;
use utils::units::{kw_to_bhp, ms_to_kmh};
use crate::settings::{OutputFormat, SimulationSettings};

/// Rate the vehicle is driven at, matching a 60Hz render loop
pub const FRAME_DT: f64 = 1.0 / 60.0;
const BENCHMARK_SPEED_KMH: f64 = 100.0;

#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("couldn't read vehicle file. {0}")]
    Io(#[from] std::io::Error),
    #[error("couldn't parse vehicle file. {0}")]
    VehicleFormat(#[from] toml::de::Error),
    #[error("couldn't load settings. {0}")]
    Settings(#[from] config::ConfigError),
    #[error("invalid vehicle. {0}")]
    Powertrain(#[from] PowertrainError),
    #[error("couldn't encode report. {0}")]
    Report(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize)]
pub struct Sample {
    pub time: f64,
    #[serde(flatten)]
    pub telemetry: Telemetry,
}

#[derive(Clone, Debug, Serialize)]
pub struct GearRow {
    pub gear: i32,
    pub ratio: f64,
    pub max_speed_kmh: f64,
    pub wheel_force_at_peak_torque: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub vehicle: String,
    pub traction_model: TractionModel,
    pub peak_torque: f64,
    pub peak_torque_rpm: f64,
    pub top_speed_kmh: f64,
    /// Seconds to reach 100km/h, if it was reached
    pub benchmark_time: Option<f64>,
    pub samples: Vec<Sample>,
    pub gearing: Vec<GearRow>,
}

pub fn load_vehicle(path: &Path) -> Result<VehicleSpec, SimError> {
    info!("Loading vehicle from {}", path.display());
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

pub fn gearing_table(mechanics: &Mechanics) -> Vec<GearRow> {
    let engine = mechanics.engine();
    let calculator = GearingCalculator::new(engine, mechanics.chassis().tire_radius);
    let peak_rpm = engine.maximum_torque_rpm();
    (1..=calculator.gear_count() as i32).filter_map(|gear| {
        Some(GearRow {
            gear,
            ratio: engine.gearbox().ratio(gear)?,
            max_speed_kmh: calculator.max_speed_for_gear(gear)?,
            wheel_force_at_peak_torque: calculator.wheel_force_at(peak_rpm, gear)?,
        })
    }).collect()
}

/// Hold the configured pedals from a standstill for the configured duration
pub fn drag_strip(spec: &VehicleSpec, settings: &SimulationSettings) -> Result<RunReport, SimError> {
    let mut mechanics = spec.build_mechanics(settings.traction_model())?;
    mechanics.set_throttle_position(settings.throttle());
    mechanics.set_brake_pedal_position(settings.brake());
    mechanics.set_slope_angle(settings.slope());

    let total_frames = (settings.duration() / FRAME_DT).round() as u64;
    let frames_per_report = (settings.report_interval() / FRAME_DT).round().max(1.0) as u64;
    let substeps = (FRAME_DT / settings.max_step() - 1e-9).ceil().max(1.0) as u32;
    let substep_dt = FRAME_DT / substeps as f64;
    info!("Running {} for {}s ({} frames, {} substeps each) with the {} traction model",
          spec.display_name(), settings.duration(), total_frames, substeps, settings.traction_model());

    let mut samples = vec![Sample { time: 0.0, telemetry: mechanics.telemetry() }];
    let mut benchmark_time = None;
    for frame in 1..=total_frames {
        for _ in 0..substeps {
            mechanics.step(substep_dt);
        }
        let time = frame as f64 * FRAME_DT;
        if benchmark_time.is_none() && ms_to_kmh(mechanics.speed()) >= BENCHMARK_SPEED_KMH {
            info!("{} reached {}km/h in {:.2}s", spec.display_name(), BENCHMARK_SPEED_KMH, time);
            benchmark_time = Some(time);
        }
        if frame % frames_per_report == 0 {
            let telemetry = mechanics.telemetry();
            debug!("t={:.2}s {:?}", time, telemetry);
            samples.push(Sample { time, telemetry });
        }
    }

    let engine = mechanics.engine();
    let calculator = GearingCalculator::new(engine, mechanics.chassis().tire_radius);
    Ok(RunReport {
        vehicle: spec.display_name().to_string(),
        traction_model: settings.traction_model(),
        peak_torque: engine.maximum_torque() * engine.torque_curve().torque_fraction(engine.maximum_torque_rpm()),
        peak_torque_rpm: engine.maximum_torque_rpm(),
        top_speed_kmh: calculator.max_speed(),
        benchmark_time,
        gearing: gearing_table(&mechanics),
        samples,
    })
}

fn row(cells: &[String]) -> String {
    cells.iter().map(|cell| format!("{:>10}", cell)).join(" ")
}

pub fn render_table(report: &RunReport, rated_power_kw: f64) -> String {
    let mut lines = vec![
        format!("{} ({} traction)", report.vehicle, report.traction_model),
        format!("{}Nm @ {}rpm, {}kW ({}bhp), top speed {}km/h",
                round_float_to(report.peak_torque, 1),
                round_float_to(report.peak_torque_rpm, 0),
                round_float_to(rated_power_kw, 1),
                round_float_to(kw_to_bhp(rated_power_kw), 0),
                round_float_to(report.top_speed_kmh, 1)),
        match report.benchmark_time {
            Some(time) => format!("0-{}km/h: {}s", BENCHMARK_SPEED_KMH, round_float_to(time, 2)),
            None => format!("0-{}km/h: not reached", BENCHMARK_SPEED_KMH),
        },
        String::new(),
        row(&["gear", "ratio", "max km/h", "force N"].map(String::from)),
    ];
    lines.extend(report.gearing.iter().map(|gear| row(&[
        gear.gear.to_string(),
        round_float_to(gear.ratio, 3).to_string(),
        round_float_to(gear.max_speed_kmh, 1).to_string(),
        round_float_to(gear.wheel_force_at_peak_torque, 0).to_string(),
    ])));
    lines.push(String::new());
    lines.push(row(&["time s", "km/h", "m/s^2", "rpm", "gear", "slip", "drive N", "drag N"].map(String::from)));
    lines.extend(report.samples.iter().map(|sample| {
        let t = &sample.telemetry;
        row(&[
            round_float_to(sample.time, 2).to_string(),
            round_float_to(ms_to_kmh(t.speed), 1).to_string(),
            round_float_to(t.acceleration, 2).to_string(),
            round_float_to(t.rpm, 0).to_string(),
            t.gear.to_string(),
            round_float_to(t.slip_ratio, 3).to_string(),
            round_float_to(t.drive_force, 0).to_string(),
            round_float_to(t.air_friction, 0).to_string(),
        ])
    }));
    lines.join("\n")
}

pub fn render(report: &RunReport, spec: &VehicleSpec, format: OutputFormat) -> Result<String, SimError> {
    match format {
        OutputFormat::Table => Ok(render_table(report, spec.engine_maximum_power_kw)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}
