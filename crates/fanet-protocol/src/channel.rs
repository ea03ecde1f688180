//! Distance-dependent channel success model.
//!
//! Three regimes:
//!
//! - `NoError`: every in-range transmission succeeds.
//! - `Uniform`: fixed success probability, independent of distance.
//! - `Gaussian`: distance is quantized into buckets of width
//!   `0.5 × comm_range`; each bucket's success probability comes from a
//!   zero-mean normal with sigma `1.15 × comm_range`, truncated to
//!   `[0, comm_range)` and normalised so the bucket probabilities sum to 1
//!   over that interval, then scaled by a tunable constant.
//!
//! Bucket probabilities are precomputed once per agent at construction, not
//! per call.

use fanet_core::{ChannelErrorMode, ProtocolConfig, RoutingRng};

/// Fraction of the communication range covered by one Gaussian bucket.
const BUCKET_WIDTH_FRACTION: f32 = 0.5;

/// Sigma of the truncated normal, as a multiple of the communication range.
const SIGMA_FRACTION: f64 = 1.15;

// ── ChannelModel ─────────────────────────────────────────────────────────────

/// Per-agent channel model.  Cheap to query; all distribution math happens
/// in `new`.
#[derive(Clone, Debug)]
pub struct ChannelModel {
    mode: ChannelErrorMode,
    comm_range: f32,
    uniform_success: f64,
    gaussian_scale: f64,
    bucket_width: f32,
    /// Success probability per distance bucket, index = floor(d / width).
    buckets: Vec<f64>,
}

impl ChannelModel {
    pub fn new(cfg: &ProtocolConfig, comm_range: f32) -> Self {
        let bucket_width = (comm_range * BUCKET_WIDTH_FRACTION).floor().max(1.0);
        let buckets = match cfg.channel_mode {
            ChannelErrorMode::Gaussian => gaussian_buckets(comm_range, bucket_width),
            _ => Vec::new(),
        };
        Self {
            mode: cfg.channel_mode,
            comm_range,
            uniform_success: cfg.uniform_success_prob,
            gaussian_scale: cfg.gaussian_scale,
            bucket_width,
            buckets,
        }
    }

    /// Does a transmission over `distance` metres go through?
    ///
    /// Precondition: the two parties are close enough to communicate
    /// (`distance <= comm_range`).  Violating it is a caller bug.
    pub fn success(&self, distance: f32, rng: &mut RoutingRng) -> bool {
        assert!(
            distance <= self.comm_range,
            "channel queried for out-of-range distance {distance} > {}",
            self.comm_range
        );

        match self.mode {
            ChannelErrorMode::NoError => true,
            ChannelErrorMode::Uniform => rng.draw() <= self.uniform_success,
            ChannelErrorMode::Gaussian => rng.draw() <= self.bucket_probability(distance),
        }
    }

    /// The scaled success probability of the bucket `distance` falls in.
    pub fn bucket_probability(&self, distance: f32) -> f64 {
        // distance == comm_range lands one past the last bucket; clamp.
        let idx = ((distance / self.bucket_width) as usize).min(self.buckets.len() - 1);
        self.buckets[idx] * self.gaussian_scale
    }

    /// The precomputed (unscaled) bucket probabilities.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }
}

// ── Truncated-normal bucket precomputation ───────────────────────────────────

fn gaussian_buckets(comm_range: f32, bucket_width: f32) -> Vec<f64> {
    let sigma = comm_range as f64 * SIGMA_FRACTION;

    let mut masses = Vec::new();
    let mut start = 0.0f32;
    while start < comm_range {
        let lo = normal_cdf(start as f64, sigma);
        let hi = normal_cdf((start + bucket_width) as f64, sigma);
        masses.push(hi - lo);
        start += bucket_width;
    }

    // Normalise by the truncated mass over [0, range) so the buckets sum to 1.
    let total: f64 = masses.iter().sum();
    masses.iter().map(|m| m / total).collect()
}

/// CDF of a zero-mean normal with standard deviation `sigma`.
fn normal_cdf(x: f64, sigma: f64) -> f64 {
    0.5 * (1.0 + erf(x / (sigma * std::f64::consts::SQRT_2)))
}

/// Abramowitz–Stegun 7.1.26 rational approximation, max error ~1.5e-7 —
/// far below anything a channel draw can resolve.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));

    sign * (1.0 - poly * (-x * x).exp())
}
