use std::f64::consts::PI;

/// Easing functions in Penner form: elapsed time `t`, base value `b`,
/// total change `c`, duration `d`.
///
/// Transitions select one by name; unknown names fall back to linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
}

impl Easing {
    /// Every registered easing name.
    pub const NAMES: &'static [&'static str] = &[
        "linear",
        "in_quad",
        "out_quad",
        "in_out_quad",
        "in_cubic",
        "out_cubic",
        "in_out_cubic",
        "in_sine",
        "out_sine",
        "in_out_sine",
        "in_expo",
        "out_expo",
        "in_out_expo",
    ];

    /// Look up an easing by name. Unknown names resolve to linear rather
    /// than erroring.
    pub fn from_name(name: &str) -> Self {
        match name {
            "linear" => Easing::Linear,
            "in_quad" => Easing::InQuad,
            "out_quad" => Easing::OutQuad,
            "in_out_quad" => Easing::InOutQuad,
            "in_cubic" => Easing::InCubic,
            "out_cubic" => Easing::OutCubic,
            "in_out_cubic" => Easing::InOutCubic,
            "in_sine" => Easing::InSine,
            "out_sine" => Easing::OutSine,
            "in_out_sine" => Easing::InOutSine,
            "in_expo" => Easing::InExpo,
            "out_expo" => Easing::OutExpo,
            "in_out_expo" => Easing::InOutExpo,
            _ => Easing::Linear,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::InQuad => "in_quad",
            Easing::OutQuad => "out_quad",
            Easing::InOutQuad => "in_out_quad",
            Easing::InCubic => "in_cubic",
            Easing::OutCubic => "out_cubic",
            Easing::InOutCubic => "in_out_cubic",
            Easing::InSine => "in_sine",
            Easing::OutSine => "out_sine",
            Easing::InOutSine => "in_out_sine",
            Easing::InExpo => "in_expo",
            Easing::OutExpo => "out_expo",
            Easing::InOutExpo => "in_out_expo",
        }
    }

    /// Shape the interpolation progress. Total over its whole input
    /// range; a non-positive duration yields the final value.
    pub fn apply(self, t: f64, b: f64, c: f64, d: f64) -> f64 {
        if d <= 0.0 {
            return b + c;
        }
        match self {
            Easing::Linear => c * t / d + b,
            Easing::InQuad => {
                let t = t / d;
                c * t * t + b
            }
            Easing::OutQuad => {
                let t = t / d;
                -c * t * (t - 2.0) + b
            }
            Easing::InOutQuad => {
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * t * t + b
                } else {
                    let t = t - 1.0;
                    -c / 2.0 * (t * (t - 2.0) - 1.0) + b
                }
            }
            Easing::InCubic => {
                let t = t / d;
                c * t * t * t + b
            }
            Easing::OutCubic => {
                let t = t / d - 1.0;
                c * (t * t * t + 1.0) + b
            }
            Easing::InOutCubic => {
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * t * t * t + b
                } else {
                    let t = t - 2.0;
                    c / 2.0 * (t * t * t + 2.0) + b
                }
            }
            Easing::InSine => -c * (t / d * (PI / 2.0)).cos() + c + b,
            Easing::OutSine => c * (t / d * (PI / 2.0)).sin() + b,
            Easing::InOutSine => -c / 2.0 * ((PI * t / d).cos() - 1.0) + b,
            Easing::InExpo => {
                if t == 0.0 {
                    b
                } else {
                    c * 2.0_f64.powf(10.0 * (t / d - 1.0)) + b
                }
            }
            Easing::OutExpo => {
                if t >= d {
                    b + c
                } else {
                    c * (1.0 - 2.0_f64.powf(-10.0 * t / d)) + b
                }
            }
            Easing::InOutExpo => {
                if t <= 0.0 {
                    return b;
                }
                if t >= d {
                    return b + c;
                }
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * 2.0_f64.powf(10.0 * (t - 1.0)) + b
                } else {
                    c / 2.0 * (2.0 - 2.0_f64.powf(-10.0 * (t - 1.0))) + b
                }
            }
        }
    }
}
