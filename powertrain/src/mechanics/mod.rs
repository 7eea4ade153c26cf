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

pub mod pacejka;

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utils::numeric::{clamp_unit, is_unit_fraction, sign};
use crate::engine::{Engine, NEUTRAL};
use crate::error::{ensure_positive, ensure_unit_fraction, PowertrainError, Result};
use crate::layout::{DrivenWheels, EngineLocation};
use pacejka::SlipRatioState;

pub const GRAVITY: f64 = 9.81; // m/s^2
/// Largest step the integrator is stable with. [Mechanics::step] splits frames to fit
pub const MAX_PHYSICS_STEP: f64 = 0.01;
const AIR_DRAG_TUNING: f64 = 0.8;
/// Automatic shifts are held off while the driven wheels are slipping more than this
const AUTO_SHIFT_SLIP_LIMIT: f64 = 0.1;
/// Synchromesh step applied when the driver changes gear
const SHIFT_SYNCHRONIZATION_DT: f64 = 0.01;


#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TractionModel {
    /// No wheel slip. Drive force is capped by the available grip
    Simplified,
    /// Slip-ratio tire model, see [pacejka]
    Pacejka,
}

impl TractionModel {
    pub const SIMPLIFIED_VALUE: &'static str = "SIMPLIFIED";
    pub const PACEJKA_VALUE: &'static str = "PACEJKA";

    pub fn as_str(&self) -> &'static str {
        match self {
            TractionModel::Simplified => { TractionModel::SIMPLIFIED_VALUE }
            TractionModel::Pacejka => { TractionModel::PACEJKA_VALUE }
        }
    }
}

impl FromStr for TractionModel {
    type Err = PowertrainError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            TractionModel::SIMPLIFIED_VALUE => Ok(TractionModel::Simplified),
            TractionModel::PACEJKA_VALUE | "SLIP_RATIO" => Ok(TractionModel::Pacejka),
            _ => Err(PowertrainError::InvalidName("traction model".to_string(), s.to_string()))
        }
    }
}

impl Display for TractionModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for TractionModel {
    type Error = PowertrainError;
    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        TractionModel::from_str(&value)
    }
}

impl From<TractionModel> for String {
    fn from(value: TractionModel) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum TractionScheme {
    Simplified,
    Pacejka(SlipRatioState),
}

impl TractionScheme {
    fn new(model: TractionModel) -> TractionScheme {
        match model {
            TractionModel::Simplified => TractionScheme::Simplified,
            TractionModel::Pacejka => TractionScheme::Pacejka(SlipRatioState::default()),
        }
    }

    fn model(&self) -> TractionModel {
        match self {
            TractionScheme::Simplified => TractionModel::Simplified,
            TractionScheme::Pacejka(_) => TractionModel::Pacejka,
        }
    }
}

/// Static body and tire parameters of a vehicle
#[derive(Clone, Debug, PartialEq)]
pub struct Chassis {
    /// kg
    pub mass: f64,
    /// m
    pub tire_radius: f64,
    pub wheel_count: u32,
    /// m
    pub center_of_gravity_height: f64,
    /// m
    pub wheelbase: f64,
    /// Fraction of the static weight on the rear axle
    pub weight_distribution: f64,
    pub tire_friction: f64,
    /// Per wheel
    pub rolling_resistance: f64,
    /// Aggregate of drag coefficient, frontal area and air density
    pub aerodynamic_coefficient: f64,
    pub driven_wheels: DrivenWheels,
    pub engine_location: EngineLocation,
}

impl Chassis {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("mass", self.mass)?;
        ensure_positive("tire_radius", self.tire_radius)?;
        ensure_positive("wheelbase", self.wheelbase)?;
        if self.wheel_count == 0 {
            return Err(PowertrainError::InvalidParameter(
                "wheel_count".to_string(), "must be greater than 0".to_string()
            ));
        }
        ensure_unit_fraction("weight_distribution", self.weight_distribution)?;
        for (name, value) in [
            ("center_of_gravity_height", self.center_of_gravity_height),
            ("tire_friction", self.tire_friction),
            ("rolling_resistance", self.rolling_resistance),
            ("aerodynamic_coefficient", self.aerodynamic_coefficient),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PowertrainError::InvalidParameter(
                    name.to_string(), format!("must not be negative, got {}", value)
                ));
            }
        }
        Ok(())
    }

    /// Number of wheels receiving drive torque
    pub fn driven_wheel_count(&self) -> u32 {
        match self.driven_wheels {
            DrivenWheels::All => self.wheel_count,
            DrivenWheels::Front | DrivenWheels::Rear => self.wheel_count / 2,
        }
    }

    pub fn weight(&self) -> f64 {
        self.mass * GRAVITY
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomaticShifting {
    pub enabled: bool,
    /// Fraction of the redline to upshift above
    pub upshift_threshold: f64,
    /// Fraction of the redline to downshift below
    pub downshift_threshold: f64,
}

impl Default for AutomaticShifting {
    fn default() -> Self {
        AutomaticShifting { enabled: true, upshift_threshold: 0.9, downshift_threshold: 0.5 }
    }
}

impl AutomaticShifting {
    pub fn validate(&self) -> Result<()> {
        ensure_unit_fraction("upshift_threshold", self.upshift_threshold)?;
        ensure_unit_fraction("downshift_threshold", self.downshift_threshold)?;
        if self.downshift_threshold >= self.upshift_threshold {
            return Err(PowertrainError::InvalidParameter(
                "downshift_threshold".to_string(),
                format!("must be below the upshift threshold {}, got {}", self.upshift_threshold, self.downshift_threshold)
            ));
        }
        Ok(())
    }
}

/// Snapshot of the per-tick outputs
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub speed: f64,
    pub acceleration: f64,
    pub rpm: f64,
    pub gear: i32,
    pub wheel_angular_speed: f64,
    pub slip_ratio: f64,
    pub drive_force: f64,
    pub braking_friction: f64,
    pub rolling_friction: f64,
    pub air_friction: f64,
    pub slope_pull: f64,
}

/// Longitudinal vehicle dynamics integrator
#[derive(Clone, Debug)]
pub struct Mechanics {
    engine: Engine,
    chassis: Chassis,
    automatic_shifting: AutomaticShifting,
    traction: TractionScheme,

    brake_pedal_position: f64,
    slope_angle: f64,
    arbitrary_force_factor: f64,

    speed: f64,
    acceleration: f64,
    wheel_angular_speed: f64,
    drive_force: f64,
    braking_friction: f64,
    rolling_friction: f64,
    air_friction: f64,
    slope_pull: f64,
}

impl Mechanics {
    pub fn new(engine: Engine,
               chassis: Chassis,
               automatic_shifting: AutomaticShifting,
               traction_model: TractionModel) -> Result<Mechanics> {
        chassis.validate()?;
        automatic_shifting.validate()?;
        Ok(Mechanics {
            engine,
            chassis,
            automatic_shifting,
            traction: TractionScheme::new(traction_model),
            brake_pedal_position: 0.0,
            slope_angle: 0.0,
            arbitrary_force_factor: 1.0,
            speed: 0.0,
            acceleration: 0.0,
            wheel_angular_speed: 0.0,
            drive_force: 0.0,
            braking_friction: 0.0,
            rolling_friction: 0.0,
            air_friction: 0.0,
            slope_pull: 0.0,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn chassis(&self) -> &Chassis {
        &self.chassis
    }

    pub fn automatic_shifting(&self) -> &AutomaticShifting {
        &self.automatic_shifting
    }

    pub fn set_automatic_shifting_enabled(&mut self, enabled: bool) {
        self.automatic_shifting.enabled = enabled;
    }

    pub fn traction_model(&self) -> TractionModel {
        self.traction.model()
    }

    /// Swap the tire model. The dynamic state is reset since the two models
    /// don't share wheel state
    pub fn switch_traction_model(&mut self, traction_model: TractionModel) {
        self.traction = TractionScheme::new(traction_model);
        self.reset();
    }

    pub fn set_throttle_position(&mut self, throttle_position: f64) {
        self.engine.set_throttle_position(throttle_position);
    }

    pub fn brake_pedal_position(&self) -> f64 {
        self.brake_pedal_position
    }

    pub fn set_brake_pedal_position(&mut self, brake_pedal_position: f64) {
        if !is_unit_fraction(brake_pedal_position) {
            warn!("Brake pedal position {} clamped to [0, 1]", brake_pedal_position);
        }
        self.brake_pedal_position = clamp_unit(brake_pedal_position);
    }

    pub fn slope_angle(&self) -> f64 {
        self.slope_angle
    }

    /// Road inclination in radians. Positive is uphill
    pub fn set_slope_angle(&mut self, slope_angle: f64) {
        self.slope_angle = if slope_angle.is_finite() { slope_angle } else { 0.0 };
    }

    pub fn arbitrary_force_factor(&self) -> f64 {
        self.arbitrary_force_factor
    }

    /// Multiplier on the drive force, e.g. to model power lost while cornering
    pub fn set_arbitrary_force_factor(&mut self, factor: f64) {
        if !(factor >= 0.0) {
            warn!("Force factor {} clamped to 0", factor);
            self.arbitrary_force_factor = 0.0;
            return;
        }
        self.arbitrary_force_factor = factor;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Override the speed, e.g. to apply a collision impulse between ticks
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn wheel_angular_speed(&self) -> f64 {
        self.wheel_angular_speed
    }

    pub fn slip_ratio(&self) -> f64 {
        match &self.traction {
            TractionScheme::Simplified => 0.0,
            TractionScheme::Pacejka(state) => state.slip_ratio(),
        }
    }

    pub fn drive_force(&self) -> f64 {
        self.drive_force
    }

    pub fn braking_friction(&self) -> f64 {
        self.braking_friction
    }

    pub fn rolling_friction(&self) -> f64 {
        self.rolling_friction
    }

    pub fn air_friction(&self) -> f64 {
        self.air_friction
    }

    pub fn slope_pull(&self) -> f64 {
        self.slope_pull
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            speed: self.speed,
            acceleration: self.acceleration,
            rpm: self.engine.rpm(),
            gear: self.engine.gear(),
            wheel_angular_speed: self.wheel_angular_speed,
            slip_ratio: self.slip_ratio(),
            drive_force: self.drive_force,
            braking_friction: self.braking_friction,
            rolling_friction: self.rolling_friction,
            air_friction: self.air_friction,
            slope_pull: self.slope_pull,
        }
    }

    /// Change gear. `-1` is reverse, `0` neutral and `1..=gear_count` the forward gears.
    ///
    /// Engaging a gear nudges the rpm toward the speed the wheels imply for it.
    pub fn request_shift(&mut self, gear: i32) -> Result<()> {
        let previous = self.engine.gear();
        self.engine.set_gear(gear).map_err(|e| {
            warn!("Rejected shift request. {}", e);
            e
        })?;
        if gear != previous {
            debug!("Shifted from {} to {} at {:.0}rpm", previous, gear, self.engine.rpm());
            if gear != NEUTRAL {
                self.engine.synchronize(SHIFT_SYNCHRONIZATION_DT, self.wheel_angular_speed);
            }
        }
        Ok(())
    }

    /// Portion of the vehicle's weight (N) borne by the driven wheels,
    /// including longitudinal load transfer.
    ///
    /// All-wheel drive always reports the full static weight; load transfer
    /// between the axles is not modelled for it.
    pub fn driven_wheels_weight_load(&self) -> f64 {
        let transferred_load = self.chassis.mass * self.acceleration
            * (self.chassis.center_of_gravity_height / self.chassis.wheelbase);
        let static_load = self.chassis.weight();
        let load = match self.chassis.driven_wheels {
            DrivenWheels::All => static_load,
            DrivenWheels::Rear => self.chassis.weight_distribution * static_load + transferred_load,
            DrivenWheels::Front => (1.0 - self.chassis.weight_distribution) * static_load - transferred_load,
        };
        load.max(0.0)
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// There is no sub-stepping here, `dt` should not exceed [MAX_PHYSICS_STEP].
    /// Use [Mechanics::step] for frame-sized deltas.
    pub fn update_powertrain(&mut self, dt: f64) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.shift_automatically();
        self.drive_force = match self.traction.model() {
            TractionModel::Simplified => self.update_by_simplified_scheme(dt),
            TractionModel::Pacejka => self.update_by_pacejka_scheme(dt),
        };
        self.update_opposing_forces();

        self.acceleration = (self.arbitrary_force_factor * self.drive_force
            - self.slope_pull
            - self.braking_friction
            - self.rolling_friction
            - self.air_friction) / self.chassis.mass;
        self.speed += dt * self.acceleration;
    }

    /// Advance by a whole frame, split into equal steps no longer than [MAX_PHYSICS_STEP]
    pub fn step(&mut self, frame_dt: f64) {
        if !(frame_dt > 0.0) || !frame_dt.is_finite() {
            return;
        }
        // tolerate representation error so 0.07s is 7 steps, not 8
        let step_count = (frame_dt / MAX_PHYSICS_STEP - 1e-9).ceil().max(1.0) as usize;
        let dt = frame_dt / step_count as f64;
        for _ in 0..step_count {
            self.update_powertrain(dt);
        }
    }

    /// Zero the dynamic state, keeping the vehicle's configuration
    pub fn reset(&mut self) {
        self.engine.reset();
        self.traction = TractionScheme::new(self.traction.model());
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.wheel_angular_speed = 0.0;
        self.drive_force = 0.0;
        self.braking_friction = 0.0;
        self.rolling_friction = 0.0;
        self.air_friction = 0.0;
        self.slope_pull = 0.0;
    }

    fn shift_automatically(&mut self) {
        if !self.automatic_shifting.enabled || self.slip_ratio() >= AUTO_SHIFT_SLIP_LIMIT {
            return;
        }
        let gear = self.engine.gear();
        if gear < 1 {
            return;
        }
        let rpm = self.engine.rpm();
        let max_rpm = self.engine.max_rpm();
        let next_gear = if (gear as usize) < self.engine.gear_count()
            && rpm > self.automatic_shifting.upshift_threshold * max_rpm {
            gear + 1
        } else if gear > 1 && rpm < self.automatic_shifting.downshift_threshold * max_rpm {
            gear - 1
        } else {
            return;
        };
        match self.engine.set_gear(next_gear) {
            Ok(_) => debug!("Automatic shift from {} to {} at {:.0}rpm", gear, next_gear, rpm),
            Err(e) => warn!("Automatic shift failed. {}", e)
        }
    }

    fn update_by_simplified_scheme(&mut self, dt: f64) -> f64 {
        self.wheel_angular_speed = self.speed / self.chassis.tire_radius;
        self.engine.update(dt, self.wheel_angular_speed);
        let torque_limited = self.engine.drive_torque() / self.chassis.tire_radius;
        let traction_limited = self.driven_wheels_weight_load() * self.chassis.tire_friction;
        torque_limited.min(traction_limited)
    }

    fn update_by_pacejka_scheme(&mut self, dt: f64) -> f64 {
        let slip_ratio = match &mut self.traction {
            TractionScheme::Pacejka(state) => {
                state.update(dt, self.wheel_angular_speed, self.chassis.tire_radius, self.speed);
                state.slip_ratio()
            }
            TractionScheme::Simplified => 0.0,
        };

        let tire_radius = self.chassis.tire_radius;
        let inertia = pacejka::driven_wheels_inertia(self.chassis.driven_wheel_count(), tire_radius);
        let traction_force = pacejka::normalized_traction_force(slip_ratio)
            * self.chassis.tire_friction
            * self.driven_wheels_weight_load();
        let traction_torque = traction_force * tire_radius;
        // TODO: brake torque on the driven wheels once a brake model exists. Braking
        //  is applied to the body only via braking_friction
        let braking_torque = 0.0;
        let total_torque = self.engine.drive_torque() - traction_torque - braking_torque;

        if inertia > 0.0 {
            let wheel_angular_acceleration = pacejka::WHEEL_ACCELERATION_SCALE * total_torque / inertia;
            self.wheel_angular_speed += dt * wheel_angular_acceleration;
        }
        self.engine.update(dt, self.wheel_angular_speed);
        traction_force
    }

    fn update_opposing_forces(&mut self) {
        let weight = self.chassis.weight();
        let direction = sign(self.speed);
        self.braking_friction = direction * self.brake_pedal_position * self.chassis.tire_friction * weight;
        self.rolling_friction = direction * self.chassis.wheel_count as f64 * self.chassis.rolling_resistance * weight;
        self.slope_pull = weight * self.slope_angle.sin();
        self.air_friction = 0.5 * self.chassis.aerodynamic_coefficient * self.speed * self.speed * AIR_DRAG_TUNING;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use utils::numeric::approx_eq;
    use crate::engine::tests::test_engine;
    use crate::engine::{NEUTRAL, RPM_OVERSHOOT_ALLOWANCE};
    use crate::layout::{DrivenWheels, EngineLocation};
    use crate::mechanics::{AutomaticShifting, Chassis, GRAVITY, Mechanics, TractionModel};
    use crate::mechanics::pacejka::{driven_wheels_inertia, normalized_traction_force};

    pub(crate) fn test_chassis(driven_wheels: DrivenWheels) -> Chassis {
        Chassis {
            mass: 1250.0,
            tire_radius: 0.339,
            wheel_count: 4,
            center_of_gravity_height: 0.5,
            wheelbase: 2.6,
            weight_distribution: 0.55,
            tire_friction: 1.0,
            rolling_resistance: 0.003,
            aerodynamic_coefficient: 0.8,
            driven_wheels,
            engine_location: EngineLocation::Front,
        }
    }

    fn manual() -> AutomaticShifting {
        AutomaticShifting { enabled: false, ..AutomaticShifting::default() }
    }

    fn test_mechanics(driven_wheels: DrivenWheels, model: TractionModel) -> Mechanics {
        Mechanics::new(test_engine(), test_chassis(driven_wheels), manual(), model).unwrap()
    }

    #[test]
    fn simplified_launch() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.set_throttle_position(1.0);
        let min_rpm = mechanics.engine().min_rpm();
        let max_rpm = mechanics.engine().max_rpm();
        assert_eq!(mechanics.engine().rpm(), min_rpm);

        let mut last_speed = mechanics.speed();
        for _ in 0..100 {
            mechanics.update_powertrain(0.01);
            assert!(mechanics.speed() > last_speed, "speed rises every tick");
            assert!(mechanics.engine().rpm() <= max_rpm + RPM_OVERSHOOT_ALLOWANCE);
            last_speed = mechanics.speed();
        }
        assert!(mechanics.engine().rpm() > min_rpm);
        assert!(mechanics.engine().rpm() < mechanics.engine().maximum_torque_rpm());
        assert_eq!(mechanics.slip_ratio(), 0.0);
        assert!(approx_eq(mechanics.wheel_angular_speed() * 0.339, mechanics.speed(), 0.1));
    }

    #[test]
    fn simplified_drive_force_is_grip_limited() {
        let mut mechanics = test_mechanics(DrivenWheels::Front, TractionModel::Simplified);
        mechanics.chassis.tire_friction = 0.2;
        mechanics.set_throttle_position(1.0);
        mechanics.update_powertrain(0.01);
        let grip = 0.45 * 1250.0 * GRAVITY * 0.2;
        assert!(approx_eq(mechanics.drive_force(), grip, 1e-6));
    }

    #[test]
    fn pacejka_launch() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Pacejka);
        mechanics.set_throttle_position(1.0);
        let mut halfway_speed = 0.0;
        for tick in 0..100 {
            mechanics.update_powertrain(0.01);
            assert!(mechanics.speed().is_finite());
            assert!(mechanics.engine().rpm() <= mechanics.engine().max_rpm() + RPM_OVERSHOOT_ALLOWANCE);
            if tick == 49 {
                halfway_speed = mechanics.speed();
            }
        }
        assert!(mechanics.speed() > halfway_speed);
        assert!(mechanics.speed() > 0.5);
        assert!(mechanics.slip_ratio() > 0.0);
        assert!(mechanics.wheel_angular_speed() * 0.339 > mechanics.speed());
    }

    #[test]
    fn pacejka_wheel_spin_up() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Pacejka);
        mechanics.set_throttle_position(1.0);
        mechanics.set_speed(2.0);
        let drive_torque = mechanics.engine().drive_torque();
        let load = mechanics.driven_wheels_weight_load();
        let dt = 0.01;
        mechanics.update_powertrain(dt);

        let slip = mechanics.slip_ratio();
        assert!(slip < 0.0, "wheels slower than the body");
        let traction_force = normalized_traction_force(slip) * 1.0 * load;
        assert!(approx_eq(mechanics.drive_force(), traction_force, 1e-9));
        let expected = dt * 0.001 * (drive_torque - traction_force * 0.339) / driven_wheels_inertia(2, 0.339);
        assert!(approx_eq(mechanics.wheel_angular_speed(), expected, 1e-9));
    }

    #[test]
    fn rear_load_grows_under_acceleration() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        let baseline = 0.55 * 1250.0 * GRAVITY;
        assert!(approx_eq(mechanics.driven_wheels_weight_load(), baseline, 1e-9));
        mechanics.set_throttle_position(1.0);
        mechanics.update_powertrain(0.01);
        assert!(mechanics.acceleration() > 0.0);
        assert!(mechanics.driven_wheels_weight_load() > baseline);
    }

    #[test]
    fn front_load_shrinks_under_acceleration() {
        let mut mechanics = test_mechanics(DrivenWheels::Front, TractionModel::Simplified);
        let baseline = 0.45 * 1250.0 * GRAVITY;
        mechanics.set_throttle_position(1.0);
        mechanics.update_powertrain(0.01);
        assert!(mechanics.driven_wheels_weight_load() < baseline);
    }

    #[test]
    fn all_wheel_drive_ignores_load_transfer() {
        let mut mechanics = test_mechanics(DrivenWheels::All, TractionModel::Simplified);
        mechanics.set_throttle_position(1.0);
        mechanics.update_powertrain(0.01);
        assert!(mechanics.acceleration() > 0.0);
        assert_eq!(mechanics.driven_wheels_weight_load(), 1250.0 * GRAVITY);
    }

    #[test]
    fn opposing_forces() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.request_shift(NEUTRAL).unwrap();
        mechanics.set_speed(20.0);
        mechanics.set_brake_pedal_position(0.5);
        mechanics.set_slope_angle(0.1);
        mechanics.update_powertrain(0.01);

        let weight = 1250.0 * GRAVITY;
        assert_eq!(mechanics.drive_force(), 0.0);
        assert!(approx_eq(mechanics.braking_friction(), 0.5 * weight, 1e-9));
        assert!(approx_eq(mechanics.rolling_friction(), 4.0 * 0.003 * weight, 1e-9));
        assert!(approx_eq(mechanics.slope_pull(), weight * 0.1f64.sin(), 1e-9));
        assert!(approx_eq(mechanics.air_friction(), 0.5 * 0.8 * 400.0 * 0.8, 1e-9));
        let expected = -(mechanics.braking_friction() + mechanics.rolling_friction()
            + mechanics.slope_pull() + mechanics.air_friction()) / 1250.0;
        assert!(approx_eq(mechanics.acceleration(), expected, 1e-9));
        assert!(approx_eq(mechanics.speed(), 20.0 + 0.01 * expected, 1e-9));
    }

    #[test]
    fn opposing_forces_when_reversing() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.request_shift(NEUTRAL).unwrap();
        mechanics.set_speed(-20.0);
        mechanics.set_brake_pedal_position(0.5);
        mechanics.update_powertrain(0.01);

        let weight = 1250.0 * GRAVITY;
        assert!(approx_eq(mechanics.braking_friction(), -0.5 * weight, 1e-9));
        assert!(approx_eq(mechanics.rolling_friction(), -4.0 * 0.003 * weight, 1e-9));
        assert_eq!(mechanics.slope_pull(), 0.0);
        assert!(approx_eq(mechanics.air_friction(), 0.5 * 0.8 * 400.0 * 0.8, 1e-9));
        let expected = -(mechanics.braking_friction() + mechanics.rolling_friction()
            + mechanics.air_friction()) / 1250.0;
        assert!(approx_eq(mechanics.acceleration(), expected, 1e-9));
    }

    #[test]
    fn resting_vehicle_stays_put() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.set_brake_pedal_position(1.0);
        for _ in 0..50 {
            mechanics.update_powertrain(0.01);
        }
        assert_eq!(mechanics.speed(), 0.0);
        assert_eq!(mechanics.rolling_friction(), 0.0);
        assert_eq!(mechanics.braking_friction(), 0.0);
    }

    #[test]
    fn force_factor_scales_drive() {
        let mut full = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        let mut half = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        full.set_throttle_position(1.0);
        half.set_throttle_position(1.0);
        half.set_arbitrary_force_factor(0.5);
        full.update_powertrain(0.01);
        half.update_powertrain(0.01);
        assert!(approx_eq(half.acceleration(), full.acceleration() / 2.0, 1e-9));
        half.set_arbitrary_force_factor(-1.0);
        assert_eq!(half.arbitrary_force_factor(), 0.0);
    }

    #[test]
    fn no_automatic_shift_while_slipping() {
        let mut chassis = test_chassis(DrivenWheels::Rear);
        chassis.tire_friction = 0.3;
        let mut mechanics = Mechanics::new(
            test_engine(), chassis, AutomaticShifting::default(), TractionModel::Pacejka
        ).unwrap();
        mechanics.set_throttle_position(1.0);
        let upshift_rpm = 0.9 * mechanics.engine().max_rpm();

        let mut held_ticks = 0;
        for _ in 0..2000 {
            let slipping = mechanics.slip_ratio() >= 0.1;
            let over_threshold = mechanics.engine().rpm() > upshift_rpm;
            let gear = mechanics.engine().gear();
            mechanics.update_powertrain(0.01);
            if slipping && over_threshold {
                held_ticks += 1;
                assert_eq!(mechanics.engine().gear(), gear, "shifted with slip above the limit");
            }
        }
        assert!(held_ticks > 0);
    }

    #[test]
    fn automatic_upshifts() {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.set_automatic_shifting_enabled(true);
        mechanics.set_throttle_position(1.0);
        let mut last_gear = mechanics.engine().gear();
        for _ in 0..2000 {
            mechanics.update_powertrain(0.01);
            let gear = mechanics.engine().gear();
            assert!(gear == last_gear || gear == last_gear + 1, "at most one upshift per tick");
            last_gear = gear;
        }
        assert!(last_gear > 1);
    }

    #[test]
    fn automatic_downshift() -> Result<(), String> {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.set_speed(5.0);
        mechanics.request_shift(3).map_err(|e| e.to_string())?;
        mechanics.set_automatic_shifting_enabled(true);
        mechanics.update_powertrain(0.01);
        assert_eq!(mechanics.engine().gear(), 2);
        mechanics.update_powertrain(0.01);
        assert_eq!(mechanics.engine().gear(), 1);
        mechanics.update_powertrain(0.01);
        assert_eq!(mechanics.engine().gear(), 1);
        Ok(())
    }

    #[test]
    fn no_automatic_shift_from_neutral() -> Result<(), String> {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        mechanics.request_shift(NEUTRAL).map_err(|e| e.to_string())?;
        mechanics.set_automatic_shifting_enabled(true);
        mechanics.set_throttle_position(1.0);
        for _ in 0..300 {
            mechanics.update_powertrain(0.01);
        }
        assert_eq!(mechanics.engine().gear(), NEUTRAL);
        assert_eq!(mechanics.speed(), 0.0);
        Ok(())
    }

    #[test]
    fn shift_requests() -> Result<(), String> {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Simplified);
        assert!(mechanics.request_shift(6).is_err());
        assert!(mechanics.request_shift(-2).is_err());
        assert_eq!(mechanics.engine().gear(), 1);

        // cruise in second at 4000rpm then drop into first
        mechanics.request_shift(2).map_err(|e| e.to_string())?;
        let wheel_speed = 4000.0 / (2.0 * 4.0 * utils::units::RAD_TO_RPM);
        mechanics.set_speed(wheel_speed * 0.339);
        for _ in 0..100 {
            mechanics.update_powertrain(0.01);
        }
        let cruise_rpm = mechanics.engine().rpm();
        assert!(approx_eq(cruise_rpm, 4000.0, 100.0));

        mechanics.request_shift(1).map_err(|e| e.to_string())?;
        let first_gear_target = mechanics.wheel_angular_speed() * 12.0 * utils::units::RAD_TO_RPM;
        let expected = cruise_rpm + 0.5 * (first_gear_target - cruise_rpm);
        assert!(approx_eq(mechanics.engine().rpm(), expected, 1e-6), "rpm nudged halfway");
        Ok(())
    }

    #[test]
    fn step_splits_frames() {
        let mut stepped = test_mechanics(DrivenWheels::Rear, TractionModel::Pacejka);
        let mut manual = test_mechanics(DrivenWheels::Rear, TractionModel::Pacejka);
        stepped.set_throttle_position(1.0);
        manual.set_throttle_position(1.0);
        for _ in 0..20 {
            stepped.step(0.05);
            for _ in 0..5 {
                manual.update_powertrain(0.01);
            }
        }
        assert!(approx_eq(stepped.speed(), manual.speed(), 1e-9));
        assert!(approx_eq(stepped.engine().rpm(), manual.engine().rpm(), 1e-6));

        let before = stepped.speed();
        stepped.step(0.0);
        stepped.step(-1.0);
        stepped.step(f64::NAN);
        assert_eq!(stepped.speed(), before);
    }

    #[test]
    fn reset_keeps_configuration() -> Result<(), String> {
        let mut mechanics = test_mechanics(DrivenWheels::Rear, TractionModel::Pacejka);
        mechanics.set_throttle_position(1.0);
        mechanics.request_shift(2).map_err(|e| e.to_string())?;
        mechanics.step(1.0);
        assert!(mechanics.speed() > 0.0);

        mechanics.reset();
        assert_eq!(mechanics.speed(), 0.0);
        assert_eq!(mechanics.acceleration(), 0.0);
        assert_eq!(mechanics.wheel_angular_speed(), 0.0);
        assert_eq!(mechanics.slip_ratio(), 0.0);
        assert_eq!(mechanics.engine().gear(), 1);
        assert_eq!(mechanics.engine().rpm(), mechanics.engine().min_rpm());
        assert_eq!(mechanics.traction_model(), TractionModel::Pacejka);
        assert_eq!(mechanics.chassis().mass, 1250.0);

        mechanics.step(0.5);
        mechanics.switch_traction_model(TractionModel::Simplified);
        assert_eq!(mechanics.speed(), 0.0);
        assert_eq!(mechanics.traction_model(), TractionModel::Simplified);
        Ok(())
    }

    #[test]
    fn invalid_chassis() {
        let invalid = [
            Chassis { mass: 0.0, ..test_chassis(DrivenWheels::Rear) },
            Chassis { tire_radius: -0.3, ..test_chassis(DrivenWheels::Rear) },
            Chassis { wheelbase: 0.0, ..test_chassis(DrivenWheels::Rear) },
            Chassis { wheel_count: 0, ..test_chassis(DrivenWheels::Rear) },
            Chassis { weight_distribution: 1.2, ..test_chassis(DrivenWheels::Rear) },
            Chassis { rolling_resistance: -0.1, ..test_chassis(DrivenWheels::Rear) },
        ];
        for chassis in invalid {
            assert!(Mechanics::new(test_engine(), chassis, manual(), TractionModel::Simplified).is_err());
        }
        let backwards = AutomaticShifting { enabled: true, upshift_threshold: 0.4, downshift_threshold: 0.6 };
        assert!(Mechanics::new(test_engine(), test_chassis(DrivenWheels::Rear), backwards, TractionModel::Simplified).is_err());
    }

    #[test]
    fn single_driven_wheel_has_no_inertia() {
        let chassis = Chassis { wheel_count: 1, ..test_chassis(DrivenWheels::Rear) };
        let mut mechanics = Mechanics::new(test_engine(), chassis, manual(), TractionModel::Pacejka).unwrap();
        mechanics.set_throttle_position(1.0);
        mechanics.step(0.5);
        assert_eq!(mechanics.wheel_angular_speed(), 0.0);
        assert!(mechanics.speed().is_finite());
    }
}
