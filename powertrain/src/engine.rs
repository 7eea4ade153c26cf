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

use tracing::{info, warn};
use utils::numeric::clamp_unit;
use utils::units::{RAD_TO_RPM, RPM_TO_RAD};
use crate::error::{ensure_positive, PowertrainError, Result};
use crate::torque_curve::TorqueCurve;

pub const NEUTRAL: i32 = 0;
pub const REVERSE: i32 = -1;
/// How far past the redline the rpm is allowed to wander before being clamped
pub const RPM_OVERSHOOT_ALLOWANCE: f64 = 100.0;
/// Rate at which an engaged engine's rpm is pulled toward the rpm implied by the wheels
pub const SYNCHRONIZATION_FACTOR: f64 = 50.0;
pub const DEFAULT_ENGINE_FRICTION: f64 = 1.0;


#[derive(Clone, Debug, PartialEq)]
pub struct Gearbox {
    gear_ratios: Vec<f64>,
    differential_ratio: f64,
    reverse_ratio: f64,
}

impl Gearbox {
    pub fn new(gear_ratios: Vec<f64>, differential_ratio: f64, reverse_ratio: f64) -> Result<Gearbox> {
        if gear_ratios.is_empty() {
            return Err(PowertrainError::InvalidParameter(
                "gear_ratios".to_string(), "at least one forward gear is required".to_string()
            ));
        }
        for (idx, ratio) in gear_ratios.iter().enumerate() {
            ensure_positive(&format!("gear_ratios[{}]", idx), *ratio)?;
        }
        ensure_positive("differential_ratio", differential_ratio)?;
        ensure_positive("reverse_ratio", reverse_ratio)?;
        Ok(Gearbox { gear_ratios, differential_ratio, reverse_ratio })
    }

    pub fn gear_count(&self) -> usize {
        self.gear_ratios.len()
    }

    pub fn gear_ratios(&self) -> &[f64] {
        &self.gear_ratios
    }

    pub fn differential_ratio(&self) -> f64 {
        self.differential_ratio
    }

    pub fn reverse_ratio(&self) -> f64 {
        self.reverse_ratio
    }

    pub fn is_valid_gear(&self, gear: i32) -> bool {
        gear == REVERSE || (gear >= NEUTRAL && gear as usize <= self.gear_count())
    }

    /// Ratio of the given gear. Reverse is negative and neutral is 0
    pub fn ratio(&self, gear: i32) -> Option<f64> {
        match gear {
            REVERSE => Some(-self.reverse_ratio),
            NEUTRAL => Some(0.0),
            g if g > 0 => self.gear_ratios.get(g as usize - 1).copied(),
            _ => None
        }
    }

    /// Combined gear and differential reduction between crankshaft and wheels
    pub fn overall_ratio(&self, gear: i32) -> Option<f64> {
        self.ratio(gear).map(|ratio| ratio * self.differential_ratio)
    }
}

/// How the torque curve fraction is scaled up into newton-metres
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TorqueRating {
    /// Use the value directly as the curve's scaling factor
    MaximumTorque(f64),
    /// The engine makes exactly this torque at the curve's peak
    PeakTorque(f64),
    /// The engine makes `watts` at `rpm`
    Power { watts: f64, rpm: f64 },
}

#[derive(Clone, Debug)]
pub struct Engine {
    torque_curve: TorqueCurve,
    gearbox: Gearbox,
    rpm: f64,
    min_rpm: f64,
    max_rpm: f64,
    gear: i32,
    throttle_position: f64,
    transmission_efficiency: f64,
    maximum_torque: f64,
    maximum_torque_rpm: f64,
    friction_coefficient: f64,
}

impl Engine {
    pub fn new(torque_curve: TorqueCurve,
               gearbox: Gearbox,
               min_rpm: f64,
               rating: TorqueRating,
               transmission_efficiency: f64) -> Result<Engine> {
        let max_rpm = torque_curve.redline_rpm();
        ensure_positive("min_rpm", min_rpm)?;
        if min_rpm >= max_rpm {
            return Err(PowertrainError::InvalidParameter(
                "min_rpm".to_string(), format!("must be below the redline {}, got {}", max_rpm, min_rpm)
            ));
        }
        ensure_positive("transmission_efficiency", transmission_efficiency)?;
        if transmission_efficiency > 1.0 {
            return Err(PowertrainError::InvalidParameter(
                "transmission_efficiency".to_string(), format!("must be at most 1, got {}", transmission_efficiency)
            ));
        }

        let maximum_torque_rpm = torque_curve.rpm_of_peak_torque();
        let maximum_torque = match rating {
            TorqueRating::MaximumTorque(torque) => {
                ensure_positive("maximum_torque", torque)?;
                torque
            }
            TorqueRating::PeakTorque(torque) => {
                ensure_positive("peak_torque", torque)?;
                torque / curve_fraction_at(&torque_curve, maximum_torque_rpm)?
            }
            TorqueRating::Power { watts, rpm } => {
                ensure_positive("maximum_power", watts)?;
                ensure_positive("maximum_power_rpm", rpm)?;
                let torque_at_power_rpm = watts / (rpm * RPM_TO_RAD);
                torque_at_power_rpm / curve_fraction_at(&torque_curve, rpm)?
            }
        };
        info!("Engine calibrated to {:.1}Nm maximum torque at {}rpm. Idle {}rpm, redline {}rpm, {} gears",
              maximum_torque, maximum_torque_rpm, min_rpm, max_rpm, gearbox.gear_count());

        Ok(Engine {
            torque_curve,
            gearbox,
            rpm: min_rpm,
            min_rpm,
            max_rpm,
            gear: 1,
            throttle_position: 0.0,
            transmission_efficiency,
            maximum_torque,
            maximum_torque_rpm,
            friction_coefficient: DEFAULT_ENGINE_FRICTION,
        })
    }

    pub fn with_friction_coefficient(mut self, friction_coefficient: f64) -> Engine {
        self.friction_coefficient = friction_coefficient.max(0.0);
        self
    }

    pub fn torque_curve(&self) -> &TorqueCurve {
        &self.torque_curve
    }

    pub fn gearbox(&self) -> &Gearbox {
        &self.gearbox
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn min_rpm(&self) -> f64 {
        self.min_rpm
    }

    pub fn max_rpm(&self) -> f64 {
        self.max_rpm
    }

    pub fn gear(&self) -> i32 {
        self.gear
    }

    pub fn gear_count(&self) -> usize {
        self.gearbox.gear_count()
    }

    pub fn throttle_position(&self) -> f64 {
        self.throttle_position
    }

    pub fn set_throttle_position(&mut self, throttle_position: f64) {
        if !utils::numeric::is_unit_fraction(throttle_position) {
            warn!("Throttle position {} clamped to [0, 1]", throttle_position);
        }
        self.throttle_position = clamp_unit(throttle_position);
    }

    pub fn transmission_efficiency(&self) -> f64 {
        self.transmission_efficiency
    }

    pub fn maximum_torque(&self) -> f64 {
        self.maximum_torque
    }

    pub fn maximum_torque_rpm(&self) -> f64 {
        self.maximum_torque_rpm
    }

    pub(crate) fn set_gear(&mut self, gear: i32) -> Result<()> {
        if !self.gearbox.is_valid_gear(gear) {
            return Err(PowertrainError::InvalidGear(gear, self.gear_count()));
        }
        self.gear = gear;
        Ok(())
    }

    pub(crate) fn set_rpm(&mut self, rpm: f64) {
        self.rpm = rpm;
        self.clamp_rpm();
    }

    /// Crankshaft torque (Nm) at the current rpm and throttle.
    ///
    /// Past the redline the engine loses power in proportion to how far over it is.
    pub fn current_torque(&self) -> f64 {
        let fraction = if self.rpm > self.max_rpm {
            -self.rpm / self.max_rpm
        } else {
            self.torque_curve.torque_fraction(self.rpm)
        };
        self.throttle_position * self.maximum_torque * fraction
    }

    /// Crankshaft power in watts
    pub fn current_power(&self) -> f64 {
        self.current_torque() * self.rpm * RPM_TO_RAD
    }

    /// Torque delivered toward the driven wheels through the gearbox
    /// and differential
    pub fn drive_torque(&self) -> f64 {
        if self.gear == NEUTRAL {
            return 0.0;
        }
        self.current_torque() * self.engaged_ratio() * self.transmission_efficiency
    }

    /// Rpm the engine would run at with the given wheel speed in the current gear
    pub fn rpm_for_wheel_speed(&self, wheel_angular_speed: f64) -> f64 {
        wheel_angular_speed * self.engaged_ratio() * RAD_TO_RPM
    }

    pub fn update(&mut self, dt: f64, wheel_angular_speed: f64) {
        if self.gear == NEUTRAL {
            let rpm_ratio = self.rpm / self.max_rpm;
            let engine_braking = (1.0 - self.throttle_position) * rpm_ratio * rpm_ratio
                * self.maximum_torque * self.friction_coefficient;
            self.rpm += dt * (self.current_torque() * RAD_TO_RPM - engine_braking);
            self.clamp_rpm();
        } else {
            self.synchronize(dt, wheel_angular_speed);
        }
    }

    /// Pull the rpm toward the rpm implied by the wheels. A step large enough
    /// to pass the target lands on it instead
    pub(crate) fn synchronize(&mut self, dt: f64, wheel_angular_speed: f64) {
        let target_rpm = self.rpm_for_wheel_speed(wheel_angular_speed);
        let blend = (dt * SYNCHRONIZATION_FACTOR).min(1.0);
        self.rpm += blend * (target_rpm - self.rpm);
        self.clamp_rpm();
    }

    pub fn reset(&mut self) {
        self.rpm = self.min_rpm;
        self.gear = 1;
    }

    fn engaged_ratio(&self) -> f64 {
        self.gearbox.overall_ratio(self.gear).unwrap_or(0.0)
    }

    fn clamp_rpm(&mut self) {
        if self.rpm.is_nan() {
            warn!("Engine rpm became NaN. Resetting to idle");
            self.rpm = self.min_rpm;
        }
        self.rpm = self.rpm.clamp(self.min_rpm, self.max_rpm + RPM_OVERSHOOT_ALLOWANCE);
    }
}

fn curve_fraction_at(torque_curve: &TorqueCurve, rpm: f64) -> Result<f64> {
    let fraction = torque_curve.torque_fraction(rpm);
    if fraction <= 0.0 {
        return Err(PowertrainError::InvalidParameter(
            "torque_curve".to_string(), format!("no torque available at {}rpm to calibrate against", rpm)
        ));
    }
    Ok(fraction)
}
