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

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::PowertrainError;


/// Named calibration of where an engine makes its torque
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PowerBand {
    Typical,
    Peaky,
    Torquey,
    SemiTorquey,
    Wide
}

impl PowerBand {
    pub const TYPICAL_VALUE: &'static str = "TYPICAL";
    pub const PEAKY_VALUE: &'static str = "PEAKY";
    pub const TORQUEY_VALUE: &'static str = "TORQUEY";
    pub const SEMI_TORQUEY_VALUE: &'static str = "SEMI_TORQUEY";
    pub const WIDE_VALUE: &'static str = "WIDE";

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerBand::Typical => { PowerBand::TYPICAL_VALUE }
            PowerBand::Peaky => { PowerBand::PEAKY_VALUE }
            PowerBand::Torquey => { PowerBand::TORQUEY_VALUE }
            PowerBand::SemiTorquey => { PowerBand::SEMI_TORQUEY_VALUE }
            PowerBand::Wide => { PowerBand::WIDE_VALUE }
        }
    }

    /// Torque fractions `(l, u)` available at 1000rpm and at the redline
    pub fn calibration(&self) -> (f64, f64) {
        match self {
            PowerBand::Typical => { (0.60, 0.80) }
            PowerBand::Peaky => { (0.30, 0.75) }
            PowerBand::Torquey => { (0.90, 0.60) }
            PowerBand::SemiTorquey => { (0.80, 0.70) }
            PowerBand::Wide => { (0.75, 0.90) }
        }
    }
}

impl Default for PowerBand {
    fn default() -> Self {
        PowerBand::Typical
    }
}

impl FromStr for PowerBand {
    type Err = PowertrainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            PowerBand::TYPICAL_VALUE => Ok(PowerBand::Typical),
            PowerBand::PEAKY_VALUE => Ok(PowerBand::Peaky),
            PowerBand::TORQUEY_VALUE => Ok(PowerBand::Torquey),
            PowerBand::SEMI_TORQUEY_VALUE => Ok(PowerBand::SemiTorquey),
            PowerBand::WIDE_VALUE => Ok(PowerBand::Wide),
            _ => Err(PowertrainError::InvalidName("power band".to_string(), s.to_string()))
        }
    }
}

impl Display for PowerBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for PowerBand {
    type Error = PowertrainError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        PowerBand::from_str(&value)
    }
}

impl From<PowerBand> for String {
    fn from(value: PowerBand) -> Self {
        value.as_str().to_string()
    }
}


/// Which axle receives drive torque
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DrivenWheels {
    Front,
    Rear,
    All
}

impl DrivenWheels {
    pub const FWD_VALUE: &'static str = "FWD";
    pub const RWD_VALUE: &'static str = "RWD";
    pub const AWD_VALUE: &'static str = "AWD";

    pub fn as_str(&self) -> &'static str {
        match self {
            DrivenWheels::Front => { DrivenWheels::FWD_VALUE }
            DrivenWheels::Rear => { DrivenWheels::RWD_VALUE }
            DrivenWheels::All => { DrivenWheels::AWD_VALUE }
        }
    }

    pub fn is_all_wheel_drive(&self) -> bool {
        matches!(self, DrivenWheels::All)
    }
}

impl FromStr for DrivenWheels {
    type Err = PowertrainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            DrivenWheels::FWD_VALUE | "FRONT" => Ok(DrivenWheels::Front),
            DrivenWheels::RWD_VALUE | "REAR" => Ok(DrivenWheels::Rear),
            DrivenWheels::AWD_VALUE | "ALL" => Ok(DrivenWheels::All),
            _ => Err(PowertrainError::InvalidName("driven wheels layout".to_string(), s.to_string()))
        }
    }
}

impl Display for DrivenWheels {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for DrivenWheels {
    type Error = PowertrainError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        DrivenWheels::from_str(&value)
    }
}

impl From<DrivenWheels> for String {
    fn from(value: DrivenWheels) -> Self {
        value.as_str().to_string()
    }
}


#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineLocation {
    Front,
    Mid,
    Rear
}

impl EngineLocation {
    pub const FRONT_VALUE: &'static str = "FRONT";
    pub const MID_VALUE: &'static str = "MID";
    pub const REAR_VALUE: &'static str = "REAR";

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineLocation::Front => { EngineLocation::FRONT_VALUE }
            EngineLocation::Mid => { EngineLocation::MID_VALUE }
            EngineLocation::Rear => { EngineLocation::REAR_VALUE }
        }
    }

    /// Fraction of the static weight carried by the rear axle for a typical
    /// car with the engine in this location
    pub fn default_weight_distribution(&self) -> f64 {
        match self {
            EngineLocation::Front => { 0.45 }
            EngineLocation::Mid => { 0.55 }
            EngineLocation::Rear => { 0.60 }
        }
    }
}

impl FromStr for EngineLocation {
    type Err = PowertrainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            EngineLocation::FRONT_VALUE => Ok(EngineLocation::Front),
            EngineLocation::MID_VALUE | "MIDDLE" => Ok(EngineLocation::Mid),
            EngineLocation::REAR_VALUE => Ok(EngineLocation::Rear),
            _ => Err(PowertrainError::InvalidName("engine location".to_string(), s.to_string()))
        }
    }
}

impl Display for EngineLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for EngineLocation {
    type Error = PowertrainError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        EngineLocation::from_str(&value)
    }
}

impl From<EngineLocation> for String {
    fn from(value: EngineLocation) -> Self {
        value.as_str().to_string()
    }
}
