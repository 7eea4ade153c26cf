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

use itertools::Itertools;
use tracing::{info, warn};
use crate::error::{ensure_positive, PowertrainError, Result};
use crate::layout::PowerBand;

/// Every synthesised curve rises linearly from nothing at 1rpm to the
/// power band's low calibration value here
pub const WARM_UP_RPM: f64 = 1000.0;
pub const SAMPLE_STEP_RPM: f64 = 100.0;
/// Returned by [TorqueCurve::torque_fraction] for rpm values below 1
pub const BELOW_MINIMUM_RPM: f64 = -1.0;

const MINIMUM_EVALUATED_RPM: f64 = 1.0;


/// A line `slope * rpm + intercept` valid up to `rpm_upper_bound`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurveSegment {
    pub rpm_upper_bound: f64,
    pub slope: f64,
    pub intercept: f64,
}

impl CurveSegment {
    fn through(start: (f64, f64), end: (f64, f64)) -> CurveSegment {
        let slope = (end.1 - start.1) / (end.0 - start.0);
        CurveSegment {
            rpm_upper_bound: end.0,
            slope,
            intercept: start.1 - slope * start.0,
        }
    }

    pub fn value_at(&self, rpm: f64) -> f64 {
        self.slope * rpm + self.intercept
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CurveSynthesis {
    /// Rise to full torque at the peak rpm then fall away to the redline.
    /// Without a peak rpm the vertex of the quadratic fit is used
    DualLinear { peak_torque_rpm: Option<f64> },
    /// Piecewise-linear sampling of the quadratic fit every [SAMPLE_STEP_RPM]
    Quadratic,
}

impl Default for CurveSynthesis {
    fn default() -> Self {
        CurveSynthesis::DualLinear { peak_torque_rpm: None }
    }
}

/// Fraction of an engine's maximum torque available at a given rpm
#[derive(Clone, Debug)]
pub struct TorqueCurve {
    segments: Vec<CurveSegment>,
    redline_rpm: f64,
}

impl TorqueCurve {
    pub fn create_from_shape(redline_rpm: f64,
                             shape: PowerBand,
                             synthesis: CurveSynthesis) -> Result<TorqueCurve> {
        ensure_positive("redline_rpm", redline_rpm)?;
        if redline_rpm <= WARM_UP_RPM {
            return Err(PowertrainError::InvalidParameter(
                "redline_rpm".to_string(),
                format!("must be above {}rpm, got {}", WARM_UP_RPM, redline_rpm)
            ));
        }

        let (low, high) = shape.calibration();
        let curve = match synthesis {
            CurveSynthesis::DualLinear { peak_torque_rpm } => {
                let fitted_peak = quadratic_peak_rpm(redline_rpm, low, high);
                let peak_rpm = match peak_torque_rpm {
                    Some(rpm) if rpm > WARM_UP_RPM && rpm < redline_rpm => rpm,
                    Some(rpm) => {
                        warn!("Peak torque rpm {} is outside (1000, {}). Using {} from the {} power band fit",
                              rpm, redline_rpm, fitted_peak, shape);
                        fitted_peak
                    }
                    None => fitted_peak
                };
                TorqueCurve::dual_linear(redline_rpm, low, high, peak_rpm)
            }
            CurveSynthesis::Quadratic => TorqueCurve::sampled_quadratic(redline_rpm, low, high)
        };
        info!("Created {} torque curve with {} segments. Redline {}rpm, peak torque at {}rpm",
              shape, curve.segments.len(), redline_rpm, curve.rpm_of_peak_torque());
        Ok(curve)
    }

    fn dual_linear(redline_rpm: f64, low: f64, high: f64, peak_rpm: f64) -> TorqueCurve {
        let points = [
            (MINIMUM_EVALUATED_RPM, 0.0),
            (WARM_UP_RPM, low),
            (peak_rpm, 1.0),
            (redline_rpm, high),
        ];
        TorqueCurve::from_points(redline_rpm, &points)
    }

    fn sampled_quadratic(redline_rpm: f64, low: f64, high: f64) -> TorqueCurve {
        let (a, b, c) = quadratic_coefficients(low, high);
        let span = redline_rpm - WARM_UP_RPM;
        let mut points = vec![(MINIMUM_EVALUATED_RPM, 0.0)];
        points.extend(
            (0..).map(|step| WARM_UP_RPM + step as f64 * SAMPLE_STEP_RPM)
                .take_while(|rpm| *rpm < redline_rpm)
                .chain(std::iter::once(redline_rpm))
                .map(|rpm| {
                    let x = (rpm - WARM_UP_RPM) / span;
                    (rpm, a * x * x + b * x + c)
                })
        );
        TorqueCurve::from_points(redline_rpm, &points)
    }

    /// Join consecutive points with line segments. Points that don't advance
    /// the rpm are dropped so no segment has zero width
    fn from_points(redline_rpm: f64, points: &[(f64, f64)]) -> TorqueCurve {
        let segments = points.iter()
            .copied()
            .coalesce(|prev, next| {
                if next.0 <= prev.0 { Ok(prev) } else { Err((prev, next)) }
            })
            .tuple_windows()
            .map(|(start, end)| CurveSegment::through(start, end))
            .collect();
        TorqueCurve { segments, redline_rpm }
    }

    pub fn redline_rpm(&self) -> f64 {
        self.redline_rpm
    }

    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    /// Available torque as a fraction of maximum at `rpm`.
    ///
    /// Returns [BELOW_MINIMUM_RPM] when `rpm < 1`. Past the last segment the final
    /// line is extrapolated since the engine may briefly overshoot its redline
    pub fn torque_fraction(&self, rpm: f64) -> f64 {
        if rpm < MINIMUM_EVALUATED_RPM {
            return BELOW_MINIMUM_RPM;
        }
        self.segments.iter()
            .find(|segment| segment.rpm_upper_bound > rpm)
            .or_else(|| self.segments.last())
            .map_or(BELOW_MINIMUM_RPM, |segment| segment.value_at(rpm))
    }

    pub fn rpm_of_peak_torque(&self) -> f64 {
        let mut peak = (self.redline_rpm, f64::MIN);
        for segment in &self.segments {
            let value = segment.value_at(segment.rpm_upper_bound);
            if value > peak.1 {
                peak = (segment.rpm_upper_bound, value);
            }
        }
        peak.0
    }
}

/// Coefficients of `a*x^2 + b*x + c` over `x` in [0, 1] (1000rpm to redline)
/// which starts at `low`, ends at `high` and peaks at exactly 1
fn quadratic_coefficients(low: f64, high: f64) -> (f64, f64, f64) {
    let root = ((low - 1.0) * (high - 1.0)).sqrt();
    let a = (low + high - 2.0) - 2.0 * root;
    let b = (2.0 - 2.0 * low) + 2.0 * root;
    (a, b, low)
}

fn quadratic_peak_rpm(redline_rpm: f64, low: f64, high: f64) -> f64 {
    let (a, b, _) = quadratic_coefficients(low, high);
    if !(a < 0.0) {
        return redline_rpm;
    }
    let x = (-b / (2.0 * a)).clamp(0.0, 1.0);
    WARM_UP_RPM + x * (redline_rpm - WARM_UP_RPM)
}
