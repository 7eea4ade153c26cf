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

use utils::units::{ms_to_kmh, RAD_TO_RPM};
use crate::engine::Engine;

/// Speed and tractive effort tables for each gear of an engine
pub struct GearingCalculator<'a> {
    engine: &'a Engine,
    drive_wheel_radius: f64,
}

impl<'a> GearingCalculator<'a> {
    pub fn new(engine: &'a Engine, drive_wheel_radius: f64) -> GearingCalculator<'a> {
        GearingCalculator { engine, drive_wheel_radius }
    }

    pub fn min_rpm(&self) -> f64 {
        self.engine.min_rpm()
    }

    pub fn max_rpm(&self) -> f64 {
        self.engine.max_rpm()
    }

    pub fn gear_count(&self) -> usize {
        self.engine.gear_count()
    }

    fn overall_ratio(&self, gear: i32) -> Option<f64> {
        self.engine.gearbox().overall_ratio(gear).filter(|ratio| *ratio != 0.0)
    }

    /// Vehicle speed (m/s) at `engine_rpm` in `gear` with no wheel slip
    pub fn engine_rpm_to_wheel_speed(&self, engine_rpm: f64, gear: i32) -> Option<f64> {
        self.overall_ratio(gear).map(|ratio| {
            (engine_rpm / (ratio * RAD_TO_RPM)) * self.drive_wheel_radius
        })
    }

    /// Get the max possible speed (KM/H) the provided gear could reach
    pub fn max_speed_for_gear(&self, gear: i32) -> Option<f64> {
        self.engine_rpm_to_wheel_speed(self.max_rpm(), gear).map(ms_to_kmh)
    }

    pub fn max_speed(&self) -> f64 {
        (1..=self.gear_count() as i32)
            .filter_map(|gear| self.max_speed_for_gear(gear))
            .fold(0.0, f64::max)
    }

    /// Torque at the driven wheels at full throttle
    pub fn wheel_torque_at(&self, rpm: f64, gear: i32) -> Option<f64> {
        let engine_torque = self.engine.maximum_torque() * self.engine.torque_curve().torque_fraction(rpm);
        self.overall_ratio(gear).map(|ratio| {
            engine_torque * ratio * self.engine.transmission_efficiency()
        })
    }

    pub fn wheel_force_at(&self, rpm: f64, gear: i32) -> Option<f64> {
        self.wheel_torque_at(rpm, gear).map(|torque| torque / self.drive_wheel_radius)
    }

    /// `(km/h, rpm)` pairs from idle to the redline
    pub fn calculate_speed_plot_for_gear(&self, gear: i32, rpm_increments: Option<f64>) -> Vec<(f64, f64)> {
        let mut plot_data: Vec<(f64, f64)> = Vec::new();
        let increment = rpm_increments.filter(|inc| *inc > 0.0).unwrap_or(100.0);
        let mut engine_rpm = self.min_rpm();
        while engine_rpm <= self.max_rpm() {
            match self.engine_rpm_to_wheel_speed(engine_rpm, gear) {
                Some(speed) => plot_data.push((ms_to_kmh(speed), engine_rpm)),
                None => break
            }
            engine_rpm += increment;
        }
        plot_data
    }

    pub fn calculate_speed_plot(&self, rpm_increments: Option<f64>) -> Vec<Vec<(f64, f64)>> {
        (1..=self.gear_count() as i32)
            .map(|gear| self.calculate_speed_plot_for_gear(gear, rpm_increments))
            .collect()
    }
}
