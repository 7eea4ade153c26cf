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
use std::path::PathBuf;
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use powertrain::TractionModel;

/// How samples are printed at the end of a run
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    vehicle_path: String,
    /// s
    duration: f64,
    /// Largest physics step a frame is split into, s
    max_step: f64,
    /// Time between printed samples, s
    report_interval: f64,
    traction_model: TractionModel,
    throttle: f64,
    brake: f64,
    /// rad
    slope: f64,
    output_format: OutputFormat,
}

impl SimulationSettings {
    const VEHICLE_PATH: &'static str = "vehicle_path";
    const DURATION: &'static str = "duration";
    const MAX_STEP: &'static str = "max_step";
    const REPORT_INTERVAL: &'static str = "report_interval";
    const TRACTION_MODEL: &'static str = "traction_model";
    const THROTTLE: &'static str = "throttle";
    const BRAKE: &'static str = "brake";
    const SLOPE: &'static str = "slope";
    const OUTPUT_FORMAT: &'static str = "output_format";
    const CONFIG_FILENAME: &'static str = "powertrain-sim-conf";
    const ENV_PREFIX: &'static str = "SIM";

    pub fn default() -> Self {
        SimulationSettings {
            vehicle_path: "vehicles/sedan.toml".to_string(),
            duration: 20.0,
            max_step: powertrain::MAX_PHYSICS_STEP,
            report_interval: 1.0,
            traction_model: TractionModel::Pacejka,
            throttle: 1.0,
            brake: 0.0,
            slope: 0.0,
            output_format: OutputFormat::Table,
        }
    }

    fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = SimulationSettings::default();
        Config::builder()
            .set_default(SimulationSettings::VEHICLE_PATH, defaults.vehicle_path)?
            .set_default(SimulationSettings::DURATION, defaults.duration)?
            .set_default(SimulationSettings::MAX_STEP, defaults.max_step)?
            .set_default(SimulationSettings::REPORT_INTERVAL, defaults.report_interval)?
            .set_default(SimulationSettings::TRACTION_MODEL, defaults.traction_model.as_str())?
            .set_default(SimulationSettings::THROTTLE, defaults.throttle)?
            .set_default(SimulationSettings::BRAKE, defaults.brake)?
            .set_default(SimulationSettings::SLOPE, defaults.slope)?
            .set_default(SimulationSettings::OUTPUT_FORMAT, "table")
    }

    pub fn load() -> Result<Self, ConfigError> {
        return match SimulationSettings::defaults_builder()?
            .add_source(config::File::with_name(SimulationSettings::CONFIG_FILENAME).required(false))
            .add_source(config::Environment::with_prefix(SimulationSettings::ENV_PREFIX))
            .build() {
            Ok(settings) => {
                settings.try_deserialize()
            }
            Err(e) => {
                warn!("Failed to load settings. {}", e.to_string());
                let settings = SimulationSettings::defaults_builder()?.build()?;
                let ret: SimulationSettings = settings.try_deserialize()?;
                ret.write().unwrap_or_else(|e| { error!("Failed to write settings. {}", e.to_string())});
                Ok(ret)
            }
        }
    }

    pub fn vehicle_path(&self) -> PathBuf {
        PathBuf::from(&self.vehicle_path)
    }

    pub fn duration(&self) -> f64 {
        self.duration.max(0.0)
    }

    pub fn max_step(&self) -> f64 {
        match self.max_step > 0.0 && self.max_step <= powertrain::MAX_PHYSICS_STEP {
            true => self.max_step,
            false => {
                warn!("max_step {} outside (0, {}]. Using {}",
                      self.max_step, powertrain::MAX_PHYSICS_STEP, powertrain::MAX_PHYSICS_STEP);
                powertrain::MAX_PHYSICS_STEP
            }
        }
    }

    pub fn report_interval(&self) -> f64 {
        self.report_interval
    }

    pub fn traction_model(&self) -> TractionModel {
        self.traction_model
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn brake(&self) -> f64 {
        self.brake
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn write(&self) -> std::io::Result<()> {
        fs::write(format!("{}.toml", SimulationSettings::CONFIG_FILENAME), toml::to_string(&self).map_err(|_e|{
            std::io::Error::new(std::io::ErrorKind::Other, "Failed to encode settings to toml")
        })?)
    }
}
