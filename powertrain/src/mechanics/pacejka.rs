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

//! Slip-ratio tire model.
//!
//! The slip ratio is integrated as a differential equation (Bernard & Clover)
//! rather than computed as `(wr - v) / |v|`, which is singular at rest. The
//! equation is still stiff at low speed so the reported value carries an extra
//! damping term below [LOW_SPEED_THRESHOLD].

/// Relaxation length constant of the slip ratio equation
pub const RELAXATION_LENGTH: f64 = 0.91;
/// Damping applied to the reported slip ratio at low speed. Matched to the
/// oscillation period seen at 100Hz physics steps
pub const LOW_SPEED_DAMPING: f64 = 0.02;
/// m/s
pub const LOW_SPEED_THRESHOLD: f64 = 5.0;
/// Assumed wheel mass per square metre of tire radius
pub const WHEEL_DENSITY: f64 = 75.0 / (3.3 * 3.3);
/// Scales the net wheel torque into angular acceleration
pub const WHEEL_ACCELERATION_SCALE: f64 = 0.001;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SlipRatioState {
    slip_ratio: f64,
    differential_slip_ratio: f64,
}

impl SlipRatioState {
    pub fn slip_ratio(&self) -> f64 {
        self.slip_ratio
    }

    pub fn differential_slip_ratio(&self) -> f64 {
        self.differential_slip_ratio
    }

    pub fn update(&mut self, dt: f64, wheel_angular_speed: f64, tire_radius: f64, speed: f64) {
        let delta_ratio = (wheel_angular_speed * tire_radius - speed)
            - speed.abs() * self.differential_slip_ratio;
        self.differential_slip_ratio += delta_ratio * (dt / RELAXATION_LENGTH);

        self.slip_ratio = if speed.abs() < LOW_SPEED_THRESHOLD {
            self.differential_slip_ratio + LOW_SPEED_DAMPING * delta_ratio
        } else {
            self.differential_slip_ratio
        };
    }
}

/// Traction as a fraction of the available grip for a given slip ratio.
///
/// A piecewise approximation of a simplified magic formula curve: grip peaks
/// at 120% around 6% slip and settles at 70% once the wheel is spinning freely.
pub fn normalized_traction_force(slip_ratio: f64) -> f64 {
    if slip_ratio < 0.06 {
        20.0 * slip_ratio
    } else if slip_ratio < 0.20 {
        (9.0 - 10.0 * slip_ratio) / 7.0
    } else if slip_ratio < 1.00 {
        1.075 - 0.375 * slip_ratio
    } else {
        0.7
    }
}

pub fn wheel_mass(tire_radius: f64) -> f64 {
    WHEEL_DENSITY * tire_radius * tire_radius
}

/// Rotational inertia of the driven wheels, treating each as a solid disc
pub fn driven_wheels_inertia(driven_wheel_count: u32, tire_radius: f64) -> f64 {
    driven_wheel_count as f64 * wheel_mass(tire_radius) * tire_radius * tire_radius * 0.5
}

#[cfg(test)]
mod tests {
    use utils::numeric::approx_eq;
    use crate::mechanics::pacejka::{driven_wheels_inertia, LOW_SPEED_DAMPING, normalized_traction_force, RELAXATION_LENGTH, SlipRatioState};

    #[test]
    fn traction_curve_breakpoints() {
        assert!(approx_eq(normalized_traction_force(0.0), 0.0, 1e-12));
        assert!(approx_eq(normalized_traction_force(0.03), 0.6, 1e-12));
        let just_below = normalized_traction_force(0.06 - 1e-6);
        assert!(just_below < 1.2 && approx_eq(just_below, 1.2, 1e-4));
        assert!(approx_eq(normalized_traction_force(0.06), 1.2, 1e-12));
        assert!(approx_eq(normalized_traction_force(0.2 - 1e-9), 1.0, 1e-6));
        assert!(approx_eq(normalized_traction_force(0.2), 1.0, 1e-12));
        assert!(approx_eq(normalized_traction_force(0.5), 0.8875, 1e-12));
        assert!(approx_eq(normalized_traction_force(1.0 - 1e-9), 0.7, 1e-6));
        assert_eq!(normalized_traction_force(1.0), 0.7);
        assert_eq!(normalized_traction_force(1.5), 0.7);
        assert_eq!(normalized_traction_force(40.0), 0.7);
    }

    #[test]
    fn negative_slip_brakes() {
        assert!(normalized_traction_force(-0.02) < 0.0);
    }

    #[test]
    fn low_speed_slip_is_damped() {
        let mut state = SlipRatioState::default();
        // wheel surface 1m/s faster than the car
        state.update(0.01, 3.0 / 0.3, 0.3, 2.0);
        let expected_differential = 1.0 * 0.01 / RELAXATION_LENGTH;
        assert!(approx_eq(state.differential_slip_ratio(), expected_differential, 1e-12));
        assert!(approx_eq(state.slip_ratio(), expected_differential + LOW_SPEED_DAMPING * 1.0, 1e-12));
    }

    #[test]
    fn high_speed_slip_is_undamped() {
        let mut state = SlipRatioState::default();
        state.update(0.01, 11.0 / 0.3, 0.3, 10.0);
        assert!(state.slip_ratio() > 0.0);
        assert_eq!(state.slip_ratio(), state.differential_slip_ratio());
    }

    #[test]
    fn settles_on_true_slip_ratio() {
        // at constant speeds the equation relaxes to (wr - v) / v
        let mut state = SlipRatioState::default();
        for _ in 0..5000 {
            state.update(0.01, 22.0 / 0.3, 0.3, 20.0);
        }
        assert!(approx_eq(state.slip_ratio(), 0.1, 1e-6));
    }

    #[test]
    fn inertia_scales_with_wheels() {
        let two = driven_wheels_inertia(2, 0.339);
        let four = driven_wheels_inertia(4, 0.339);
        assert!(two > 0.0);
        assert!(approx_eq(four, 2.0 * two, 1e-12));
        assert_eq!(driven_wheels_inertia(0, 0.339), 0.0);
    }
}
