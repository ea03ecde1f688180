//! Protocol and learning configuration.
//!
//! Typically constructed in the application crate (or from a TOML/JSON file
//! with the `serde` feature) and passed by reference into every routing call.
//! All intervals are expressed in steps; all distances in metres.

use crate::error::{CoreError, CoreResult};

// ── Channel error regimes ─────────────────────────────────────────────────────

/// How the channel model decides whether a transmission at a given distance
/// goes through.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelErrorMode {
    /// Every in-range transmission succeeds.
    #[default]
    NoError,
    /// Fixed success probability, independent of distance.
    Uniform,
    /// Distance-bucketed success probability from a truncated normal.
    Gaussian,
}

// ── ProtocolConfig ────────────────────────────────────────────────────────────

/// Tunables of the routing protocol state machine and channel model.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolConfig {
    /// Broadcast a hello every N steps.
    pub hello_interval: u64,

    /// A hello older than this many steps no longer qualifies its sender as
    /// a relay candidate.
    pub stale_hello_age: u64,

    /// Attempt relay transmission only on steps that are a multiple of this.
    pub retransmission_interval: u64,

    /// Medium delay for ordinary traffic, in steps.
    pub packet_delay: u64,

    /// Medium delay for discovery traffic.  Larger than `packet_delay` to
    /// model the relative cost of discovery floods.
    pub discovery_delay: u64,

    /// Radius around the depot within which an agent hands its whole buffer
    /// over directly.
    pub depot_comm_range: f32,

    /// Success probability under [`ChannelErrorMode::Uniform`].
    pub uniform_success_prob: f64,

    /// Extra scale applied to Gaussian bucket probabilities.
    pub gaussian_scale: f64,

    /// Active channel error regime.
    pub channel_mode: ChannelErrorMode,

    /// Total agent population (depot included).  Fixed for the run; sizes
    /// the Q-table of every learning strategy instance.
    pub n_agents: usize,

    /// Master RNG seed.  The same seed always produces identical runs.
    pub seed: u64,

    /// Steps past an event's deadline after which an un-fed-back
    /// taken-action record is swept, bounding memory growth.
    pub action_expiry_grace: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            hello_interval:          5,
            stale_hello_age:         50,
            retransmission_interval: 10,
            packet_delay:            1,
            discovery_delay:         3,
            depot_comm_range:        200.0,
            uniform_success_prob:    0.9,
            gaussian_scale:          0.9,
            channel_mode:            ChannelErrorMode::NoError,
            n_agents:                0,
            seed:                    0,
            action_expiry_grace:     50,
        }
    }
}

impl ProtocolConfig {
    /// Check internal consistency.  Call once at startup; the routing hot
    /// path assumes a validated config.
    pub fn validate(&self) -> CoreResult<()> {
        if self.n_agents == 0 {
            return Err(CoreError::Config("n_agents must be > 0".into()));
        }
        if self.hello_interval == 0 || self.retransmission_interval == 0 {
            return Err(CoreError::Config(
                "hello_interval and retransmission_interval must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.uniform_success_prob) {
            return Err(CoreError::Config(format!(
                "uniform_success_prob {} outside [0, 1]",
                self.uniform_success_prob
            )));
        }
        if self.depot_comm_range <= 0.0 {
            return Err(CoreError::Config("depot_comm_range must be positive".into()));
        }
        Ok(())
    }
}

// ── LearningConfig ────────────────────────────────────────────────────────────

/// Constants of the Q-learning relay-selection strategy.
///
/// Defaults reproduce the reference tuning for a mid-size swarm; they are
/// deliberately not adaptive — the strategy learns, the constants don't.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningConfig {
    /// One-step Q-update learning rate (alpha).
    pub learning_rate: f64,

    /// Bootstrap discount factor (gamma).
    pub discount_factor: f64,

    /// Probability of an exploration step instead of a greedy pick.
    pub exploration_prob: f64,

    /// Smoothing constant of the WMEWMA link-quality estimator.
    pub link_quality_alpha: f64,

    /// Balance inside link stability between smoothed delivery quality
    /// (weight) and the speed-divergence term (complement).
    pub quality_weight: f64,

    /// Balance inside the reward between the hop-count term (weight) and
    /// link stability (complement).
    pub hop_weight: f64,

    /// Reward ceiling.
    pub max_reward: f64,

    /// Reward floor (penalty).
    pub min_reward: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate:      0.77,
            discount_factor:    0.85,
            exploration_prob:   0.4,
            link_quality_alpha: 0.7,
            quality_weight:     1.0,
            hop_weight:         0.5,
            max_reward:         1.0,
            min_reward:         -1.0,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> CoreResult<()> {
        for (name, v) in [
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
            ("exploration_prob", self.exploration_prob),
            ("link_quality_alpha", self.link_quality_alpha),
            ("quality_weight", self.quality_weight),
            ("hop_weight", self.hop_weight),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CoreError::Config(format!("{name} {v} outside [0, 1]")));
            }
        }
        if self.min_reward >= self.max_reward {
            return Err(CoreError::Config(
                "min_reward must be strictly below max_reward".into(),
            ));
        }
        Ok(())
    }
}
