use std::sync::Arc;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use crowdprice_config::EngineConfig;
use crowdprice_engine::{EngineEvent, InvalidInput, VoteEngine, VoteOutcome, VoteRejection};
use crowdprice_primitives::{Clock, Direction, ManualClock, Timestamp, UserId, VoteIntent, VoteKind};
use crowdprice_ratelimiter::RateLimitDenied;
use rust_decimal_macros::dec;

/// Price 100 in [50, 150], step 5, three votes per user, flat weighting.
fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.price.initial_price = dec!(100);
    config.price.min_price = dec!(50);
    config.price.max_price = dec!(150);
    config.price.step_size = dec!(5);
    config.price.max_single_step_delta = dec!(20);
    config.rate_limit.per_user_capacity = 3.0;
    config.rate_limit.per_user_refill_rate = 1.0;
    config.weight.reputation_factor = 0.0;
    config
}

fn engine_with(config: EngineConfig) -> (VoteEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000)));
    let engine = VoteEngine::new(config).unwrap().with_clock(clock.clone());
    (engine, clock)
}

#[test]
fn three_up_votes_then_denied() {
    let (engine, clock) = engine_with(config());
    let now = clock.now();
    let alice = UserId::from("alice");

    let prices: Vec<_> = (0..3)
        .map(|_| {
            let outcome = engine.submit(&VoteIntent::up("alice", now)).unwrap();
            outcome.receipt().unwrap().entry.resulting_price
        })
        .collect();
    assert_eq!(prices, vec![dec!(105), dec!(110), dec!(115)]);

    assert_matches!(
        engine.submit(&VoteIntent::up("alice", now)),
        Err(VoteRejection::RateLimited(RateLimitDenied::UserLimited { retry_after }))
            if retry_after == Duration::from_secs(1)
    );

    let snapshot = engine.price_snapshot();
    assert_eq!(snapshot.current, dec!(115));
    assert_eq!(snapshot.history.len(), 3);
    assert!(snapshot.history.iter().all(|entry| entry.voter == alice));

    let reputation = engine.reputation(&alice).unwrap();
    assert_eq!(reputation.session_score, 3.0);
    assert_eq!(reputation.session_votes, 3);
}

#[test]
fn default_weighting_rewards_repeat_voters() {
    let mut config = EngineConfig::default();
    config.price.initial_price = dec!(100);
    config.price.min_price = dec!(50);
    config.price.max_price = dec!(150);
    config.price.step_size = dec!(5);
    let (engine, clock) = engine_with(config);

    let prices: Vec<_> = (0..3)
        .map(|_| {
            let outcome = engine.submit(&VoteIntent::up("alice", clock.now())).unwrap();
            let receipt = outcome.receipt().unwrap();
            (receipt.entry.applied_delta, receipt.entry.resulting_price)
        })
        .collect();
    assert_eq!(
        prices,
        vec![
            (dec!(5), dec!(105)),
            (dec!(5.096), dec!(110.096)),
            (dec!(5.185), dec!(115.281)),
        ]
    );
}

#[test]
fn tokens_refill_over_time() {
    let (engine, clock) = engine_with(config());

    for _ in 0..3 {
        engine.submit(&VoteIntent::down("bob", clock.now())).unwrap();
    }
    engine.submit(&VoteIntent::down("bob", clock.now())).unwrap_err();

    clock.advance(Duration::from_secs(1));
    let outcome = engine.submit(&VoteIntent::down("bob", clock.now())).unwrap();
    assert_eq!(outcome.receipt().unwrap().entry.resulting_price, dec!(80));
}

#[test]
fn set_vote_is_limited_to_single_step() {
    let (engine, clock) = engine_with(config());

    let outcome = engine
        .submit(&VoteIntent::set("carol", dec!(200), clock.now()))
        .unwrap();
    let entry = &outcome.receipt().unwrap().entry;
    assert_eq!(entry.resulting_price, dec!(120));
    assert_eq!(entry.applied_delta, dec!(20));
    assert_eq!(entry.direction(), Direction::Up);
}

#[test]
fn price_never_leaves_bounds() {
    let mut config = config();
    config.rate_limit.per_user_capacity = 100.0;
    config.rate_limit.global_capacity = 1_000.0;
    let (engine, clock) = engine_with(config);

    for _ in 0..20 {
        engine.submit(&VoteIntent::up("dave", clock.now())).unwrap();
    }
    assert_eq!(engine.current_price(), dec!(150));

    let last = engine.price_snapshot().history.pop().unwrap();
    assert!(last.was_clamped());
    assert_eq!(last.applied_delta, dec!(0));

    for _ in 0..30 {
        engine.submit(&VoteIntent::set("dave", dec!(0), clock.now())).unwrap();
    }
    assert_eq!(engine.current_price(), dec!(50));
}

#[test]
fn rejected_votes_leave_no_trace() {
    let (engine, clock) = engine_with(config());
    let now = clock.now();
    let mut events = engine.subscribe();

    for _ in 0..3 {
        engine.submit(&VoteIntent::up("erin", now)).unwrap();
    }
    while events.try_recv().is_ok() {}

    let price_before = engine.price_snapshot();
    let reputation_before = engine.processor().reputation().snapshot();

    let rejected = [
        VoteIntent::up("erin", now),
        VoteIntent::up("", now),
        VoteIntent::up("x".repeat(51), now),
        VoteIntent::set("frank", dec!(-5), now),
        VoteIntent::up("frank", now.saturating_add(Duration::from_secs(120))),
        VoteIntent::up("frank", now).with_confidence(f64::INFINITY),
    ];
    for intent in &rejected {
        engine.submit(intent).unwrap_err();
    }

    assert_eq!(engine.price_snapshot(), price_before);
    assert_eq!(engine.processor().reputation().snapshot(), reputation_before);
    assert!(engine.reputation(&UserId::from("frank")).is_none());

    // Only the rate-limit notice reaches subscribers.
    assert_matches!(events.try_recv(), Ok(EngineEvent::VoteDenied { .. }));
    assert!(events.try_recv().is_err());
    assert_eq!(engine.stats().rejected, rejected.len() as u64);
}

#[test]
fn invalid_input_reasons() {
    let (engine, clock) = engine_with(config());
    let now = clock.now();

    assert_eq!(
        engine.submit(&VoteIntent::down("   ", now)),
        Err(VoteRejection::InvalidInput(InvalidInput::EmptyUserId))
    );
    assert_matches!(
        engine.submit(&VoteIntent::up("gina", now.saturating_add(Duration::from_secs(61)))),
        Err(VoteRejection::InvalidInput(InvalidInput::TimestampInFuture { .. }))
    );
    assert_eq!(
        engine.submit(&VoteIntent::new("gina", VoteKind::None, now)),
        Ok(VoteOutcome::Ignored)
    );
}

#[test]
fn global_limit_protects_against_floods() {
    let mut config = config();
    config.rate_limit.global_capacity = 5.0;
    config.rate_limit.global_refill_rate = 0.5;
    let (engine, clock) = engine_with(config);
    let now = clock.now();

    for i in 0..5 {
        engine.submit(&VoteIntent::up(format!("user{i}"), now)).unwrap();
    }

    let denied = engine.submit(&VoteIntent::up("late", now)).unwrap_err();
    assert_matches!(
        denied,
        VoteRejection::RateLimited(RateLimitDenied::GlobalLimited { retry_after })
            if retry_after == Duration::from_secs(2)
    );
    // The user's own token was handed back.
    assert_eq!(engine.remaining_votes(&UserId::from("late")), 3.0);
}

#[test]
fn concurrent_votes_are_serialised() {
    let mut config = config();
    config.price.min_price = dec!(0);
    config.price.max_price = dec!(100000);
    config.price.initial_price = dec!(10000);
    config.rate_limit.per_user_capacity = 1_000.0;
    config.rate_limit.global_capacity = 10_000.0;
    let (engine, clock) = engine_with(config);
    let engine = Arc::new(engine);
    let now = clock.now();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let user = format!("worker{worker}");
                for i in 0..100 {
                    let intent = if (worker + i) % 3 == 0 {
                        VoteIntent::down(user.as_str(), now)
                    } else {
                        VoteIntent::up(user.as_str(), now)
                    };
                    engine.submit(&intent).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = engine.price_snapshot();
    assert_eq!(snapshot.history.len(), 800);

    // Every entry continues from its predecessor and the fold gives the price.
    let mut price = dec!(10000);
    for (expected_seq, entry) in (1..).zip(&snapshot.history) {
        assert_eq!(entry.seq, expected_seq);
        assert_eq!(entry.previous_price(), price);
        price = entry.resulting_price;
    }
    assert_eq!(price, snapshot.current);

    let total_votes: u64 = engine
        .processor()
        .reputation()
        .snapshot()
        .iter()
        .map(|reputation| reputation.session_votes)
        .sum();
    assert_eq!(total_votes, 800);
}

#[tokio::test]
async fn events_follow_history_order() {
    let (engine, clock) = engine_with(config());
    let mut events = engine.subscribe();

    engine.submit(&VoteIntent::up("hank", clock.now())).unwrap();
    engine.submit(&VoteIntent::down("ivy", clock.now())).unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_matches!(
        first,
        EngineEvent::VoteApplied { seq: 1, previous_price, resulting_price, .. }
            if previous_price == dec!(100) && resulting_price == dec!(105)
    );
    assert_matches!(
        second,
        EngineEvent::VoteApplied { seq: 2, resulting_price, kind: VoteKind::Down, .. }
            if resulting_price == dec!(100)
    );
}

#[test]
fn session_reset_keeps_lifetime_reputation() {
    let (engine, clock) = engine_with(config());
    let mut events = engine.subscribe();
    let jack = UserId::from("jack");

    for _ in 0..3 {
        engine.submit(&VoteIntent::up("jack", clock.now())).unwrap();
    }
    engine.submit(&VoteIntent::up("jack", clock.now())).unwrap_err();

    engine.reset_session();

    let snapshot = engine.price_snapshot();
    assert_eq!(snapshot.current, dec!(100));
    assert!(snapshot.history.is_empty());

    let reputation = engine.reputation(&jack).unwrap();
    assert_eq!(reputation.session_score, 0.0);
    assert_eq!(reputation.session_votes, 0);
    assert_eq!(reputation.lifetime_score, 3.0);
    assert_eq!(reputation.vote_count, 3);

    // Fresh buckets, and sequence numbers carry on.
    let outcome = engine.submit(&VoteIntent::up("jack", clock.now())).unwrap();
    assert_eq!(outcome.receipt().unwrap().entry.seq, 4);

    let mut saw_reset = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::SessionReset { price, .. } = event {
            assert_eq!(price, dec!(100));
            saw_reset = true;
        }
    }
    assert!(saw_reset);
}

#[test]
fn leaderboards() {
    let (engine, clock) = engine_with(config());

    engine.submit(&VoteIntent::up("kim", clock.now())).unwrap();
    clock.advance(Duration::from_secs(1));
    for _ in 0..2 {
        engine.submit(&VoteIntent::up("lee", clock.now())).unwrap();
    }
    clock.advance(Duration::from_secs(1));
    engine.submit(&VoteIntent::up("kim", clock.now())).unwrap();
    engine.submit(&VoteIntent::up("kim", clock.now())).unwrap();

    let top: Vec<_> = engine.top_voters(2).into_iter().map(|r| r.user).collect();
    assert_eq!(top, vec![UserId::from("kim"), UserId::from("lee")]);

    let recent = engine.recently_active(1);
    assert_eq!(recent[0].user, UserId::from("kim"));
}
