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

use serde::{Deserialize, Serialize};
use tracing::info;
use crate::engine::{DEFAULT_ENGINE_FRICTION, Engine, Gearbox, TorqueRating};
use crate::error::{ensure_unit_fraction, Result};
use crate::layout::{DrivenWheels, EngineLocation, PowerBand};
use crate::mechanics::{AutomaticShifting, Chassis, Mechanics, TractionModel};
use crate::torque_curve::{CurveSynthesis, TorqueCurve};

fn default_wheel_count() -> u32 { 4 }
fn default_tire_friction() -> f64 { 1.0 }
fn default_rolling_resistance() -> f64 { 0.003 }
fn default_transmission_efficiency() -> f64 { 0.85 }
fn default_idle_rpm() -> f64 { 1000.0 }
fn default_engine_friction() -> f64 { DEFAULT_ENGINE_FRICTION }

/// The numeric description of a vehicle the simulation is built from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    #[serde(default)]
    pub name: String,
    /// kg
    pub mass: f64,
    /// m
    pub tire_radius: f64,
    #[serde(default = "default_wheel_count")]
    pub wheel_count: u32,
    /// m
    pub wheelbase: f64,
    /// m
    pub center_of_gravity_height: f64,
    /// Fraction of the weight on the rear axle. Derived from the
    /// engine location when absent
    #[serde(default)]
    pub weight_distribution: Option<f64>,
    pub aerodynamic_coefficient: f64,
    #[serde(default = "default_tire_friction")]
    pub tire_friction: f64,
    #[serde(default = "default_rolling_resistance")]
    pub rolling_resistance: f64,

    pub gear_ratios: Vec<f64>,
    pub differential_ratio: f64,
    pub reverse_gear_ratio: f64,
    #[serde(default = "default_transmission_efficiency")]
    pub transmission_efficiency: f64,

    #[serde(default = "default_idle_rpm")]
    pub engine_idle_rpm: f64,
    pub engine_maximum_rpm: f64,
    pub engine_maximum_power_kw: f64,
    /// Defaults to the redline
    #[serde(default)]
    pub engine_maximum_power_rpm: Option<f64>,
    #[serde(default)]
    pub engine_power_band: PowerBand,
    #[serde(default)]
    pub engine_peak_torque_rpm: Option<f64>,
    /// Sample the power band's quadratic fit rather than using two straight lines
    #[serde(default)]
    pub quadratic_torque_curve: bool,
    #[serde(default = "default_engine_friction")]
    pub engine_friction: f64,

    pub driven_wheels: DrivenWheels,
    pub engine_location: EngineLocation,
    #[serde(default)]
    pub automatic_shifting: AutomaticShifting,
}

impl VehicleSpec {
    pub fn weight_distribution(&self) -> f64 {
        self.weight_distribution.unwrap_or_else(|| self.engine_location.default_weight_distribution())
    }

    pub fn curve_synthesis(&self) -> CurveSynthesis {
        match self.quadratic_torque_curve {
            true => CurveSynthesis::Quadratic,
            false => CurveSynthesis::DualLinear { peak_torque_rpm: self.engine_peak_torque_rpm }
        }
    }

    pub fn build_torque_curve(&self) -> Result<TorqueCurve> {
        TorqueCurve::create_from_shape(self.engine_maximum_rpm, self.engine_power_band, self.curve_synthesis())
    }

    pub fn build_engine(&self) -> Result<Engine> {
        let gearbox = Gearbox::new(self.gear_ratios.clone(), self.differential_ratio, self.reverse_gear_ratio)?;
        let rating = TorqueRating::Power {
            watts: self.engine_maximum_power_kw * 1000.0,
            rpm: self.engine_maximum_power_rpm.unwrap_or(self.engine_maximum_rpm),
        };
        let engine = Engine::new(self.build_torque_curve()?,
                                 gearbox,
                                 self.engine_idle_rpm,
                                 rating,
                                 self.transmission_efficiency)?;
        Ok(engine.with_friction_coefficient(self.engine_friction))
    }

    pub fn chassis(&self) -> Result<Chassis> {
        let weight_distribution = self.weight_distribution();
        ensure_unit_fraction("weight_distribution", weight_distribution)?;
        let chassis = Chassis {
            mass: self.mass,
            tire_radius: self.tire_radius,
            wheel_count: self.wheel_count,
            center_of_gravity_height: self.center_of_gravity_height,
            wheelbase: self.wheelbase,
            weight_distribution,
            tire_friction: self.tire_friction,
            rolling_resistance: self.rolling_resistance,
            aerodynamic_coefficient: self.aerodynamic_coefficient,
            driven_wheels: self.driven_wheels,
            engine_location: self.engine_location,
        };
        chassis.validate()?;
        Ok(chassis)
    }

    pub fn build_mechanics(&self, traction_model: TractionModel) -> Result<Mechanics> {
        info!("Building {} ({}, {} engine, {} gears) with the {} traction model",
              self.display_name(), self.driven_wheels, self.engine_location,
              self.gear_ratios.len(), traction_model);
        Mechanics::new(self.build_engine()?, self.chassis()?, self.automatic_shifting, traction_model)
    }

    pub fn display_name(&self) -> &str {
        match self.name.is_empty() {
            true => "unnamed vehicle",
            false => &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use utils::numeric::approx_eq;
    use crate::layout::{DrivenWheels, EngineLocation, PowerBand};
    use crate::mechanics::TractionModel;
    use crate::spec::VehicleSpec;

    const HATCH: &str = r#"
        name = "Hatch"
        mass = 1100.0
        tire_radius = 0.31
        wheelbase = 2.5
        center_of_gravity_height = 0.48
        aerodynamic_coefficient = 0.75
        gear_ratios = [3.4, 2.1, 1.4, 1.05, 0.85]
        differential_ratio = 4.1
        reverse_gear_ratio = 3.3
        engine_maximum_rpm = 6800.0
        engine_maximum_power_kw = 96.0
        engine_maximum_power_rpm = 6200.0
        engine_power_band = "semi_torquey"
        driven_wheels = "FWD"
        engine_location = "FRONT"

        [automatic_shifting]
        upshift_threshold = 0.85
    "#;

    fn hatch() -> VehicleSpec {
        toml::from_str(HATCH).unwrap()
    }

    #[test]
    fn parse_with_defaults() {
        let spec = hatch();
        assert_eq!(spec.display_name(), "Hatch");
        assert_eq!(spec.wheel_count, 4);
        assert_eq!(spec.engine_power_band, PowerBand::SemiTorquey);
        assert_eq!(spec.driven_wheels, DrivenWheels::Front);
        assert_eq!(spec.engine_location, EngineLocation::Front);
        assert_eq!(spec.weight_distribution(), 0.45);
        assert_eq!(spec.transmission_efficiency, 0.85);
        assert!(spec.automatic_shifting.enabled);
        assert_eq!(spec.automatic_shifting.upshift_threshold, 0.85);
        assert_eq!(spec.automatic_shifting.downshift_threshold, 0.5);
    }

    #[test]
    fn build_calibrates_rated_power() -> Result<(), String> {
        let spec = hatch();
        let mut mechanics = spec.build_mechanics(TractionModel::Simplified).map_err(|e| e.to_string())?;
        let engine = mechanics.engine();
        let torque_at_power_rpm = engine.maximum_torque() * engine.torque_curve().torque_fraction(6200.0);
        let power_kw = utils::units::calculate_power_kw(6200.0, torque_at_power_rpm);
        assert!(approx_eq(power_kw, 96.0, 1e-6));

        mechanics.set_throttle_position(1.0);
        mechanics.step(1.0);
        assert!(mechanics.speed() > 0.0);
        Ok(())
    }

    #[test]
    fn rejects_unknown_names() {
        let broken = HATCH.replace("\"FWD\"", "\"6WD\"");
        assert!(toml::from_str::<VehicleSpec>(&broken).is_err());
        let broken = HATCH.replace("\"semi_torquey\"", "\"flat\"");
        assert!(toml::from_str::<VehicleSpec>(&broken).is_err());
    }

    #[test]
    fn rejects_invalid_numbers() {
        let mut spec = hatch();
        spec.weight_distribution = Some(1.5);
        assert!(spec.build_mechanics(TractionModel::Pacejka).is_err());

        let mut spec = hatch();
        spec.engine_maximum_rpm = 900.0;
        assert!(spec.build_engine().is_err());

        let mut spec = hatch();
        spec.engine_maximum_power_rpm = Some(0.0);
        assert!(spec.build_engine().is_err());

        let mut spec = hatch();
        spec.wheelbase = 0.0;
        assert!(spec.chassis().is_err());
    }
}
