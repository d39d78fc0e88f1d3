//! Per-user and global admission control.

use std::collections::HashMap;
use std::sync::Arc;

use crowdprice_config::RateLimitConfig;
use crowdprice_primitives::{Timestamp, UserId};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::bucket::{BucketParams, TokenBucket};
use crate::error::RateLimitDenied;

type BucketMap = HashMap<UserId, Arc<Mutex<TokenBucket>>>;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(RateLimitDenied),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Token bucket rate limiter.
///
/// Each user owns an `Arc<Mutex<TokenBucket>>`: the map lock is only held long
/// enough to fetch it, so checks for different users run in parallel. The
/// global bucket has its own lock, always taken after the user's.
#[derive(Debug)]
pub struct RateLimiter {
    user_params: BucketParams,
    global_params: BucketParams,
    users: RwLock<BucketMap>,
    global: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let user_params = BucketParams::new(config.per_user_capacity, config.per_user_refill_rate);
        let global_params = BucketParams::new(config.global_capacity, config.global_refill_rate);
        Self {
            user_params,
            global_params,
            users: RwLock::new(HashMap::new()),
            global: Mutex::new(TokenBucket::full(&global_params, Timestamp::ZERO)),
        }
    }

    /// Admit or deny one vote from `user` at `now`.
    ///
    /// Both buckets are refilled on every call. A token is taken from both
    /// buckets or from neither: when the global bucket denies, the user's
    /// token is handed back.
    pub fn check(&self, user: &UserId, now: Timestamp) -> Admission {
        let bucket = self.bucket(user, now);
        let mut user_bucket = bucket.lock();

        if let Err(retry_after) = user_bucket.try_consume(&self.user_params, now) {
            trace!(%user, ?retry_after, "user bucket empty");
            return Admission::Denied(RateLimitDenied::UserLimited { retry_after });
        }

        let mut global = self.global.lock();
        if let Err(retry_after) = global.try_consume(&self.global_params, now) {
            user_bucket.refund(&self.user_params);
            debug!(%user, ?retry_after, "global bucket empty");
            return Admission::Denied(RateLimitDenied::GlobalLimited { retry_after });
        }

        Admission::Allowed
    }

    /// Tokens `user` could spend at `now`, without consuming any.
    pub fn remaining(&self, user: &UserId, now: Timestamp) -> f64 {
        let bucket = self.users.read().get(user).map(Arc::clone);
        match bucket {
            Some(bucket) => {
                let mut bucket = bucket.lock();
                bucket.refill(&self.user_params, now);
                bucket.tokens()
            }
            None => self.user_params.capacity,
        }
    }

    /// Tokens left in the shared bucket at `now`.
    pub fn global_remaining(&self, now: Timestamp) -> f64 {
        let mut global = self.global.lock();
        global.refill(&self.global_params, now);
        global.tokens()
    }

    pub fn tracked_users(&self) -> usize {
        self.users.read().len()
    }

    /// Forget every user bucket and refill the global one.
    pub fn reset(&self, now: Timestamp) {
        self.users.write().clear();
        *self.global.lock() = TokenBucket::full(&self.global_params, now);
        debug!("rate limiter reset");
    }

    fn bucket(&self, user: &UserId, now: Timestamp) -> Arc<Mutex<TokenBucket>> {
        // Fast path: read lock
        if let Some(bucket) = self.users.read().get(user) {
            return Arc::clone(bucket);
        }

        let mut users = self.users.write();

        // Double-check after acquiring write lock
        if let Some(bucket) = users.get(user) {
            return Arc::clone(bucket);
        }

        let bucket = Arc::new(Mutex::new(TokenBucket::full(&self.user_params, now)));
        users.insert(user.clone(), Arc::clone(&bucket));
        debug!(%user, "rate bucket created");
        bucket
    }
}
