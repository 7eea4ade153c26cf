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

pub type Result<T> = std::result::Result<T, PowertrainError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PowertrainError {
    #[error("invalid parameter `{0}`. `{1}`")]
    InvalidParameter(String, String),
    #[error("gear `{0}` is out of range for a gearbox with `{1}` forward gears")]
    InvalidGear(i32, usize),
    #[error("unknown {0} `{1}`")]
    InvalidName(String, String),
}

impl PowertrainError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> PowertrainError {
        PowertrainError::InvalidParameter(name.to_string(), reason.into())
    }
}

/// Fail with [PowertrainError::InvalidParameter] unless `value` is finite and above zero
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PowertrainError::invalid_parameter(name, format!("must be greater than 0, got {}", value)));
    }
    Ok(())
}

pub(crate) fn ensure_unit_fraction(name: &str, value: f64) -> Result<()> {
    if !utils::numeric::is_unit_fraction(value) {
        return Err(PowertrainError::invalid_parameter(name, format!("must be within [0, 1], got {}", value)));
    }
    Ok(())
}
