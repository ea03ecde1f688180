//! Unit tests for fanet-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, EventId, PacketId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(AgentId(0) < AgentId(1));
        assert!(EventId(100) > EventId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(EventId::INVALID.0, u32::MAX);
        assert_eq!(PacketId::INVALID.0, u64::MAX);
    }

    #[test]
    fn packet_id_compose() {
        let id = PacketId::compose(AgentId(7), 12);
        assert_eq!(id.origin(), AgentId(7));
        assert_eq!(id.0 & 0xffff_ffff, 12);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
    }
}

#[cfg(test)]
mod point {
    use crate::Point;

    #[test]
    fn zero_distance() {
        let p = Point::new(120.0, 48.5);
        assert_eq!(p.distance(p), 0.0);
    }

    #[test]
    fn pythagorean_triple() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn box_check() {
        let center = Point::new(100.0, 100.0);
        assert!(Point::new(105.0, 95.0).within_box(center, 10.0));
        assert!(!Point::new(120.0, 100.0).within_box(center, 10.0));
    }
}

#[cfg(test)]
mod time {
    use crate::{Step, StepClock};

    #[test]
    fn step_arithmetic() {
        let s = Step(10);
        assert_eq!(s + 5, Step(15));
        assert_eq!(s.offset(3), Step(13));
        assert_eq!(Step(15) - Step(10), 5u64);
        assert_eq!(Step(15).since(Step(10)), 5);
    }

    #[test]
    fn interval_check() {
        assert!(Step(0).on_interval(5));
        assert!(Step(10).on_interval(5));
        assert!(!Step(11).on_interval(5));
        // interval 0 = disabled, never fires
        assert!(!Step(0).on_interval(0));
    }

    #[test]
    fn clock_advances() {
        let mut clock = StepClock::new();
        assert_eq!(clock.current, Step::ZERO);
        clock.advance();
        clock.advance();
        assert_eq!(clock.current, Step(2));
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, RoutingRng, SimRng};

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = RoutingRng::new(12345, AgentId(0));
        let mut r2 = RoutingRng::new(12345, AgentId(0));
        for _ in 0..100 {
            assert_eq!(r1.draw(), r2.draw());
        }
    }

    #[test]
    fn different_agents_differ() {
        let mut r0 = RoutingRng::new(1, AgentId(0));
        let mut r1 = RoutingRng::new(1, AgentId(1));
        assert_ne!(r0.draw(), r1.draw(), "seeds for adjacent agents should diverge");
    }

    #[test]
    fn draw_in_unit_interval() {
        let mut rng = RoutingRng::new(0, AgentId(0));
        for _ in 0..1000 {
            let v = rng.draw();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = RoutingRng::new(0, AgentId(0));
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
    }

    #[test]
    fn sim_rng_children_diverge() {
        let mut root = SimRng::new(7);
        let mut a = root.child(0);
        let mut b = root.child(1);
        assert_ne!(a.draw(), b.draw());
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = RoutingRng::new(0, AgentId(0));
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }
}

#[cfg(test)]
mod config {
    use crate::{LearningConfig, ProtocolConfig};

    #[test]
    fn default_protocol_needs_population() {
        let cfg = ProtocolConfig::default();
        assert!(cfg.validate().is_err());
        let cfg = ProtocolConfig { n_agents: 4, ..cfg };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_probability_rejected() {
        let cfg = ProtocolConfig {
            n_agents: 4,
            uniform_success_prob: 1.5,
            ..ProtocolConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_learning_valid() {
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_rewards_rejected() {
        let cfg = LearningConfig {
            min_reward: 2.0,
            ..LearningConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
