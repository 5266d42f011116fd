//! Easing curves
//!
//! Pure functions of normalized progress, addressable by the identifiers used in
//! configuration files (`"outQuad"`, `"inOutBack"`, ...).

use serde::Deserialize;
use std::f64::consts::PI;

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;
const BOUNCE_N1: f64 = 7.5625;
const BOUNCE_D1: f64 = 2.75;

/// A named easing curve
///
/// Maps normalized progress in `[0, 1]` to eased progress. Back and elastic
/// easings leave `[0, 1]` transiently; the result is never clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutSine,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInBounce,
    EaseOutBounce,
    EaseOutElastic,
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Look up an easing by its identifier (`"linear"`, `"inOutQuad"`, `"outBounce"`, ...)
    ///
    /// Unknown identifiers fall back to [`Easing::Linear`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "linear" => Easing::Linear,
            "inQuad" => Easing::EaseInQuad,
            "outQuad" => Easing::EaseOutQuad,
            "inOutQuad" => Easing::EaseInOutQuad,
            "inCubic" => Easing::EaseInCubic,
            "outCubic" => Easing::EaseOutCubic,
            "inOutCubic" => Easing::EaseInOutCubic,
            "inQuart" => Easing::EaseInQuart,
            "outQuart" => Easing::EaseOutQuart,
            "inOutQuart" => Easing::EaseInOutQuart,
            "inExpo" => Easing::EaseInExpo,
            "outExpo" => Easing::EaseOutExpo,
            "inOutSine" => Easing::EaseInOutSine,
            "inCirc" => Easing::EaseInCirc,
            "outCirc" => Easing::EaseOutCirc,
            "inOutCirc" => Easing::EaseInOutCirc,
            "inBack" => Easing::EaseInBack,
            "outBack" => Easing::EaseOutBack,
            "inOutBack" => Easing::EaseInOutBack,
            "inBounce" => Easing::EaseInBounce,
            "outBounce" => Easing::EaseOutBounce,
            "outElastic" => Easing::EaseOutElastic,
            other => {
                tracing::debug!("unknown easing {:?}, falling back to linear", other);
                Easing::Linear
            }
        }
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Easing::EaseOutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Easing::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Easing::EaseInBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Easing::EaseOutBack => {
                1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2)
            }
            Easing::EaseInOutBack => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Easing::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::EaseOutElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => UnitBezier::new(*x1, *y1, *x2, *y2).solve(t),
        }
    }
}

impl From<String> for Easing {
    fn from(name: String) -> Self {
        Easing::from_name(&name)
    }
}

impl From<&str> for Easing {
    fn from(name: &str) -> Self {
        Easing::from_name(name)
    }
}

fn bounce_out(t: f64) -> f64 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

/// Unit cubic bezier with fixed endpoints at (0, 0) and (1, 1)
///
/// Each axis is kept in power form, `((a * s + b) * s + c) * s`, so sampling
/// and its derivative are a couple of multiply-adds.
struct UnitBezier {
    ax: f64,
    bx: f64,
    cx: f64,
    ay: f64,
    by: f64,
    cy: f64,
}

impl UnitBezier {
    const EPSILON: f64 = 1e-7;

    fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn x_at(&self, s: f64) -> f64 {
        ((self.ax * s + self.bx) * s + self.cx) * s
    }

    fn y_at(&self, s: f64) -> f64 {
        ((self.ay * s + self.by) * s + self.cy) * s
    }

    fn dx_at(&self, s: f64) -> f64 {
        (3.0 * self.ax * s + 2.0 * self.bx) * s + self.cx
    }

    /// Find the curve parameter whose x coordinate is `x`
    fn param_for_x(&self, x: f64) -> f64 {
        let mut s = x;
        for _ in 0..8 {
            let dx = self.x_at(s) - x;
            if dx.abs() < Self::EPSILON {
                return s;
            }
            let slope = self.dx_at(s);
            if slope.abs() < Self::EPSILON {
                break;
            }
            s -= dx / slope;
            if !(0.0..=1.0).contains(&s) {
                break;
            }
        }

        // Newton stalled or left the unit interval; x(s) is monotonic on [0, 1]
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        s = x;
        while hi - lo > Self::EPSILON {
            let sampled = self.x_at(s);
            if (sampled - x).abs() < Self::EPSILON {
                break;
            }
            if sampled < x {
                lo = s;
            } else {
                hi = s;
            }
            s = lo + (hi - lo) / 2.0;
        }
        s
    }

    fn solve(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        self.y_at(self.param_for_x(x))
    }
}
