use std::sync::Arc;
use std::time::Duration;

use crowdprice_config::EngineConfig;
use crowdprice_engine::VoteEngine;
use crowdprice_primitives::{Clock, ManualClock, Timestamp, VoteIntent, VoteKind};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn engine() -> (VoteEngine, Arc<ManualClock>) {
    let mut config = EngineConfig::default();
    config.price.initial_price = dec!(100);
    config.price.min_price = dec!(50);
    config.price.max_price = dec!(150);
    config.price.step_size = dec!(5);
    config.price.max_single_step_delta = dec!(20);
    config.rate_limit.per_user_capacity = 3.0;
    config.rate_limit.global_capacity = 10.0;
    config.rate_limit.global_refill_rate = 2.0;

    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000)));
    let engine = VoteEngine::new(config).unwrap().with_clock(clock.clone());
    (engine, clock)
}

fn kind() -> impl Strategy<Value = VoteKind> {
    prop_oneof![
        Just(VoteKind::Up),
        Just(VoteKind::Down),
        Just(VoteKind::None),
        (0u32..400).prop_map(|value| VoteKind::Set(Decimal::from(value))),
    ]
}

proptest! {
    #[test]
    fn any_vote_stream_keeps_state_consistent(
        votes in prop::collection::vec((0usize..5, kind(), 0u64..1_500), 1..200)
    ) {
        let (engine, clock) = engine();

        for (user, kind, pause_ms) in votes {
            clock.advance(Duration::from_millis(pause_ms));
            let intent = VoteIntent::new(format!("user{user}"), kind, clock.now());
            let _ = engine.submit(&intent);

            let price = engine.current_price();
            prop_assert!(price >= dec!(50) && price <= dec!(150));
        }

        let snapshot = engine.price_snapshot();
        let mut price = dec!(100);
        for entry in &snapshot.history {
            prop_assert_eq!(entry.previous_price(), price);
            prop_assert!(entry.applied_delta.abs() <= dec!(20));
            price = entry.resulting_price;
        }
        prop_assert_eq!(price, snapshot.current);

        let stats = engine.stats();
        prop_assert_eq!(stats.accepted, snapshot.history.len() as u64);
        let session_votes: u64 = engine
            .processor()
            .reputation()
            .snapshot()
            .iter()
            .map(|reputation| reputation.session_votes)
            .sum();
        prop_assert_eq!(session_votes, stats.accepted);
    }
}
