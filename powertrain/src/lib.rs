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

//! Longitudinal powertrain and tire dynamics for a single vehicle.
//!
//! A [TorqueCurve] describes the engine's power band, the [Engine] turns
//! throttle and rpm into drive torque through its [Gearbox], and [Mechanics]
//! integrates the vehicle's speed each physics step with one of two traction
//! models.

pub mod error;
pub mod layout;
pub mod torque_curve;
pub mod engine;
pub mod mechanics;
pub mod gearing;
pub mod spec;

pub use error::{PowertrainError, Result};
pub use layout::{DrivenWheels, EngineLocation, PowerBand};
pub use torque_curve::{CurveSynthesis, TorqueCurve};
pub use engine::{Engine, Gearbox, TorqueRating};
pub use mechanics::{AutomaticShifting, Chassis, Mechanics, Telemetry, TractionModel, MAX_PHYSICS_STEP};
pub use gearing::GearingCalculator;
pub use spec::VehicleSpec;
