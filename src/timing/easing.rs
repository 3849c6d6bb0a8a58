//! Easing curves
//!
//! Stateless functions remapping a linear proportion in `[0, 1]` onto an eased
//! proportion. The formulas are the standard Penner curves. Every curve maps
//! 0 to 0 and 1 to 1, is monotonic non-decreasing, and the `Out` variant is the
//! point reflection of `In`: `ease(p, f, Out) == 1 - ease(1 - p, f, In)`.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Curve family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EasingFunction {
    #[default]
    Linear,
    Quadratic,
    Cubic,
    Quartic,
    Quintic,
    Sinusoidal,
    Exponential,
}

impl EasingFunction {
    /// Every family, in declaration order
    pub const ALL: [Self; 7] = [
        Self::Linear,
        Self::Quadratic,
        Self::Cubic,
        Self::Quartic,
        Self::Quintic,
        Self::Sinusoidal,
        Self::Exponential,
    ];

    /// Polynomial degree for power families
    const fn degree(self) -> Option<i32> {
        match self {
            Self::Quadratic => Some(2),
            Self::Cubic => Some(3),
            Self::Quartic => Some(4),
            Self::Quintic => Some(5),
            _ => None,
        }
    }
}

/// Which end of the curve accelerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EasingDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl EasingDirection {
    /// Every direction
    pub const ALL: [Self; 3] = [Self::In, Self::Out, Self::InOut];
}

/// A curve family paired with a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Easing {
    pub function: EasingFunction,
    pub direction: EasingDirection,
}

impl Easing {
    /// Straight-line easing
    pub const LINEAR: Self = Self::new(EasingFunction::Linear, EasingDirection::In);

    /// Pair a family with a direction
    #[must_use]
    pub const fn new(function: EasingFunction, direction: EasingDirection) -> Self {
        Self {
            function,
            direction,
        }
    }

    /// Apply this curve to a proportion
    #[must_use]
    pub fn apply(&self, proportion: f32) -> f32 {
        ease(proportion, self.function, self.direction)
    }
}

/// Map `proportion` (clamped to `[0, 1]`) through the given curve
#[must_use]
pub fn ease(proportion: f32, function: EasingFunction, direction: EasingDirection) -> f32 {
    let p = if proportion.is_nan() {
        0.0
    } else {
        proportion.clamp(0.0, 1.0)
    };

    match function {
        EasingFunction::Linear => p,
        EasingFunction::Sinusoidal => sinusoidal(p, direction),
        EasingFunction::Exponential => exponential(p, direction),
        power => {
            let degree = power.degree().unwrap_or(1);
            polynomial(p, degree, direction)
        }
    }
}

fn polynomial(p: f32, degree: i32, direction: EasingDirection) -> f32 {
    match direction {
        EasingDirection::In => p.powi(degree),
        EasingDirection::Out => 1.0 - (1.0 - p).powi(degree),
        EasingDirection::InOut => {
            // 2^(degree-1) keeps both halves meeting at (0.5, 0.5)
            let scale = 2f32.powi(degree - 1);
            if p < 0.5 {
                scale * p.powi(degree)
            } else {
                1.0 - (-2.0 * p + 2.0).powi(degree) / 2.0
            }
        }
    }
}

fn sinusoidal(p: f32, direction: EasingDirection) -> f32 {
    match direction {
        EasingDirection::In => 1.0 - (p * PI / 2.0).cos(),
        EasingDirection::Out => (p * PI / 2.0).sin(),
        EasingDirection::InOut => -((PI * p).cos() - 1.0) / 2.0,
    }
}

fn exponential(p: f32, direction: EasingDirection) -> f32 {
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return 1.0;
    }
    match direction {
        EasingDirection::In => 2f32.powf(10.0 * p - 10.0),
        EasingDirection::Out => 1.0 - 2f32.powf(-10.0 * p),
        EasingDirection::InOut => {
            if p < 0.5 {
                2f32.powf(20.0 * p - 10.0) / 2.0
            } else {
                (2.0 - 2f32.powf(-20.0 * p + 10.0)) / 2.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_boundaries_for_every_curve() {
        for function in EasingFunction::ALL {
            for direction in EasingDirection::ALL {
                let start = ease(0.0, function, direction);
                let end = ease(1.0, function, direction);
                assert!(start.abs() < EPSILON, "{function:?} {direction:?} at 0 = {start}");
                assert!((end - 1.0).abs() < EPSILON, "{function:?} {direction:?} at 1 = {end}");
            }
        }
    }

    #[test]
    fn test_monotonic_for_every_curve() {
        for function in EasingFunction::ALL {
            for direction in EasingDirection::ALL {
                let mut previous = ease(0.0, function, direction);
                for step in 1..=200 {
                    let value = ease(step as f32 / 200.0, function, direction);
                    assert!(
                        value + EPSILON >= previous,
                        "{function:?} {direction:?} decreases at step {step}"
                    );
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn test_out_mirrors_in_for_power_families() {
        let families = [
            EasingFunction::Quadratic,
            EasingFunction::Cubic,
            EasingFunction::Quartic,
            EasingFunction::Quintic,
            EasingFunction::Sinusoidal,
        ];
        for function in families {
            for step in 0..=20 {
                let p = step as f32 / 20.0;
                let out = ease(p, function, EasingDirection::Out);
                let mirrored = 1.0 - ease(1.0 - p, function, EasingDirection::In);
                assert!((out - mirrored).abs() < 1e-4, "{function:?} at {p}");
            }
        }
    }

    #[test]
    fn test_in_out_midpoint() {
        for function in EasingFunction::ALL {
            let mid = ease(0.5, function, EasingDirection::InOut);
            assert!((mid - 0.5).abs() < 1e-4, "{function:?} midpoint = {mid}");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        let easing = Easing::new(EasingFunction::Cubic, EasingDirection::In);
        assert_eq!(easing.apply(-1.0), 0.0);
        assert_eq!(easing.apply(2.0), 1.0);
        assert_eq!(easing.apply(f32::NAN), 0.0);
    }

    #[test]
    fn test_known_values() {
        assert!((ease(0.5, EasingFunction::Quadratic, EasingDirection::In) - 0.25).abs() < EPSILON);
        assert!((ease(0.5, EasingFunction::Cubic, EasingDirection::Out) - 0.875).abs() < EPSILON);
        assert!(
            (ease(0.5, EasingFunction::Exponential, EasingDirection::In) - 2f32.powf(-5.0)).abs()
                < EPSILON
        );
    }
}
