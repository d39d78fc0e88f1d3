use crowdprice_config::WeightConfig;
use crowdprice_primitives::{Direction, VoteIntent, VoteKind};
use crowdprice_reputation::UserReputation;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::{VoteWeight, normalize};

/// Decimal places kept from the float multiplier.
const MULTIPLIER_DP: u32 = 4;

/// Reputation-scaled vote weighting.
#[derive(Debug, Clone)]
pub struct WeightCalculator {
    config: WeightConfig,
    max_single_step_delta: Decimal,
}

impl WeightCalculator {
    pub fn new(config: WeightConfig, max_single_step_delta: Decimal) -> Self {
        Self {
            config,
            max_single_step_delta,
        }
    }

    /// Weight of `intent` cast by a user with `reputation`.
    ///
    /// UP and DOWN scale a unit step by the reputation multiplier. SET names a
    /// target that the price approaches by at most the single-step limit,
    /// whatever the voter's reputation. NONE has no effect.
    pub fn compute(&self, intent: &VoteIntent, reputation: &UserReputation) -> VoteWeight {
        match intent.kind {
            VoteKind::Up => VoteWeight::Step {
                direction: Direction::Up,
                magnitude: self.multiplier(reputation),
            },
            VoteKind::Down => VoteWeight::Step {
                direction: Direction::Down,
                magnitude: self.multiplier(reputation),
            },
            VoteKind::Set(price) => VoteWeight::Target {
                price,
                max_step: self.max_single_step_delta,
            },
            VoteKind::None => VoteWeight::NEUTRAL,
        }
    }

    /// `clamp(base + factor * normalized, min, max)`, or the fixed dampening
    /// for flagged users.
    pub fn multiplier(&self, reputation: &UserReputation) -> Decimal {
        let config = &self.config;

        let multiplier = if reputation.status.is_flagged() {
            config.flagged_dampening.min(config.max_multiplier)
        } else {
            let normalized = self.normalized_score(reputation);
            (config.base_multiplier + config.reputation_factor * normalized)
                .clamp(config.min_multiplier, config.max_multiplier)
        };

        Decimal::from_f64(multiplier)
            .unwrap_or(Decimal::ONE)
            .round_dp(MULTIPLIER_DP)
    }

    /// Blend of the saturated lifetime and session scores, in `[-1, 1]`.
    pub fn normalized_score(&self, reputation: &UserReputation) -> f64 {
        let curve = &self.config.saturation;
        let share = self.config.lifetime_share;
        share * normalize(curve, reputation.lifetime_score)
            + (1.0 - share) * normalize(curve, reputation.session_score)
    }
}

#[cfg(test)]
mod tests {
    use crowdprice_config::SaturationCurve;
    use crowdprice_primitives::{Timestamp, UserId};
    use crowdprice_reputation::ReputationStatus;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    fn calculator() -> WeightCalculator {
        WeightCalculator::new(
            WeightConfig {
                base_multiplier: 1.0,
                reputation_factor: 0.5,
                min_multiplier: 0.1,
                max_multiplier: 2.0,
                flagged_dampening: 0.5,
                lifetime_share: 0.5,
                saturation: SaturationCurve::Linear { full_at: 100.0 },
            },
            dec!(20),
        )
    }

    fn reputation(lifetime: f64, session: f64, status: ReputationStatus) -> UserReputation {
        UserReputation {
            lifetime_score: lifetime,
            session_score: session,
            status,
            ..UserReputation::new(UserId::from("voter"))
        }
    }

    fn up() -> VoteIntent {
        VoteIntent::up("voter", Timestamp::ZERO)
    }

    #[test]
    fn test_zero_reputation_gives_base_multiplier() {
        let weight = calculator().compute(&up(), &reputation(0.0, 0.0, ReputationStatus::Neutral));
        assert_eq!(
            weight,
            VoteWeight::Step {
                direction: Direction::Up,
                magnitude: dec!(1)
            }
        );
    }

    #[test]
    fn test_reputation_scales_multiplier() {
        let calc = calculator();
        // normalized = 0.5 * 1.0 + 0.5 * 0.5 = 0.75
        let rep = reputation(200.0, 50.0, ReputationStatus::Trusted);
        assert_eq!(calc.multiplier(&rep), dec!(1.375));

        let rep = reputation(-100.0, -100.0, ReputationStatus::Neutral);
        assert_eq!(calc.multiplier(&rep), dec!(0.5));
    }

    #[test]
    fn test_flagged_users_are_dampened() {
        let rep = reputation(500.0, 500.0, ReputationStatus::Flagged);
        let weight = calculator().compute(&VoteIntent::down("voter", Timestamp::ZERO), &rep);
        assert_eq!(
            weight,
            VoteWeight::Step {
                direction: Direction::Down,
                magnitude: dec!(0.5)
            }
        );
    }

    #[test]
    fn test_set_ignores_reputation() {
        let intent = VoteIntent::set("voter", dec!(200), Timestamp::ZERO);
        let low = calculator().compute(&intent, &reputation(-100.0, -100.0, ReputationStatus::Flagged));
        let high = calculator().compute(&intent, &reputation(100.0, 100.0, ReputationStatus::Trusted));

        assert_eq!(low, high);
        assert_eq!(
            low,
            VoteWeight::Target {
                price: dec!(200),
                max_step: dec!(20)
            }
        );
    }

    #[test]
    fn test_none_is_neutral() {
        let intent = VoteIntent::new("voter", VoteKind::None, Timestamp::ZERO);
        let weight = calculator().compute(&intent, &reputation(10.0, 10.0, ReputationStatus::Neutral));
        assert_eq!(weight, VoteWeight::NEUTRAL);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let calc = calculator();
        let rep = reputation(33.3, 12.1, ReputationStatus::Neutral);
        assert_eq!(calc.compute(&up(), &rep), calc.compute(&up(), &rep));
    }

    fn curves() -> impl Strategy<Value = SaturationCurve> {
        prop_oneof![
            (0.1f64..1_000.0).prop_map(|half_point| SaturationCurve::Rational { half_point }),
            (0.1f64..1_000.0).prop_map(|scale| SaturationCurve::Tanh { scale }),
            (0.1f64..1_000.0).prop_map(|full_at| SaturationCurve::Linear { full_at }),
        ]
    }

    proptest! {
        #[test]
        fn proptest_up_weight_non_decreasing_in_reputation(
            curve in curves(),
            factor in 0.0f64..3.0,
            share in 0.0f64..=1.0,
            lifetime in -1_000.0f64..10_000.0,
            session in -1_000.0f64..10_000.0,
            lifetime_gain in 0.0f64..5_000.0,
            session_gain in 0.0f64..5_000.0,
        ) {
            let calc = WeightCalculator::new(
                WeightConfig {
                    reputation_factor: factor,
                    lifetime_share: share,
                    saturation: curve,
                    ..WeightConfig::default()
                },
                dec!(100),
            );

            let lower = reputation(lifetime, session, ReputationStatus::Neutral);
            let higher = reputation(lifetime + lifetime_gain, session + session_gain, ReputationStatus::Neutral);

            let low = calc.compute(&up(), &lower).magnitude().unwrap();
            let high = calc.compute(&up(), &higher).magnitude().unwrap();
            prop_assert!(low <= high, "{low} > {high}");

            let config = WeightConfig::default();
            prop_assert!(low >= Decimal::from_f64(config.min_multiplier).unwrap().round_dp(MULTIPLIER_DP));
            prop_assert!(high <= Decimal::from_f64(config.max_multiplier).unwrap());
        }
    }
}
