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

use std::f64::consts::PI;

/// Multiply an angular speed in rad/s by this to get revolutions per minute
pub const RAD_TO_RPM: f64 = 60.0 / (2.0 * PI);
pub const RPM_TO_RAD: f64 = (2.0 * PI) / 60.0;

pub fn kw_to_bhp(power_kw: f64) -> f64 {
    power_kw * 1.341
}

pub fn calculate_power_kw(rpm: f64, torque: f64) -> f64 {
    (torque * rpm * 2.0 * PI) / (60.0 * 1000.0)
}

pub fn rad_per_sec_to_rpm(angular_speed: f64) -> f64 {
    angular_speed * RAD_TO_RPM
}

pub fn rpm_to_rad_per_sec(rpm: f64) -> f64 {
    rpm * RPM_TO_RAD
}

pub fn ms_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}
