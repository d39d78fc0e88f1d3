//! In-memory reputation registry.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crowdprice_config::ReputationConfig;
use crowdprice_primitives::{Timestamp, UserId};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cell::{Fields, ReputationCell};
use crate::{ReputationChange, ReputationStatus, UserReputation};

type CellMap = HashMap<UserId, Arc<ReputationCell>>;

/// Authoritative in-memory reputation for the active session.
///
/// Entries are created lazily and never removed; a session reset only clears
/// the session components.
#[derive(Debug)]
pub struct ReputationStore {
    config: ReputationConfig,
    users: RwLock<CellMap>,
}

impl ReputationStore {
    pub fn new(config: ReputationConfig) -> Self {
        Self {
            config,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Reputation of `user`, creating a default entry on first access.
    pub fn read(&self, user: &UserId) -> UserReputation {
        let cell = self.cell(user);
        let (fields, version) = cell.load();
        to_record(user, fields, version)
    }

    /// Reputation of `user` if it is already tracked.
    pub fn get(&self, user: &UserId) -> Option<UserReputation> {
        let cell = self.users.read().get(user).map(Arc::clone)?;
        let (fields, version) = cell.load();
        Some(to_record(user, fields, version))
    }

    /// Apply `change` to `user` and return the resulting reputation.
    ///
    /// Updates to the same user are serialised; none are lost.
    pub fn update(&self, user: &UserId, change: ReputationChange, now: Timestamp) -> UserReputation {
        let cell = self.cell(user);
        let config = &self.config;

        let (fields, version) = cell.modify(|fields| {
            match change {
                ReputationChange::AcceptedVote => {
                    let reward = config.score_reward_per_accepted_vote;
                    fields.lifetime_score = self.clamp_score(fields.lifetime_score + reward);
                    fields.session_score = self.clamp_score(fields.session_score + reward);
                    fields.vote_count = fields.vote_count.saturating_add(1);
                    fields.session_votes = fields.session_votes.saturating_add(1);
                    fields.last_vote_at = Some(now);
                }
                ReputationChange::Penalty { amount } => {
                    let amount = if amount.is_finite() { amount.abs() } else { 0.0 };
                    fields.lifetime_score = self.clamp_score(fields.lifetime_score - amount);
                    fields.session_score = self.clamp_score(fields.session_score - amount);
                    fields.penalties = fields.penalties.saturating_add(1);
                    fields.session_penalties = fields.session_penalties.saturating_add(1);
                }
            }
            fields.status = self.derive_status(fields);
        });

        trace!(%user, ?change, version, status = %fields.status, "reputation updated");
        to_record(user, fields, version)
    }

    /// Status implied by the configured thresholds.
    ///
    /// Flagging wins over trust: a user with a high lifetime score who keeps
    /// collecting penalties this session is still muted.
    fn derive_status(&self, fields: &Fields) -> ReputationStatus {
        let penalty_limit = u64::from(self.config.flagged_penalty_count);
        if fields.lifetime_score <= self.config.flagged_threshold
            || fields.session_penalties >= penalty_limit
        {
            ReputationStatus::Flagged
        } else if fields.lifetime_score >= self.config.trusted_threshold {
            ReputationStatus::Trusted
        } else {
            ReputationStatus::Neutral
        }
    }

    fn clamp_score(&self, score: f64) -> f64 {
        score.clamp(self.config.min_score, self.config.max_score)
    }

    /// Clear session scores and counters for every user. Lifetime data and
    /// the entries themselves are kept.
    pub fn reset_session(&self) {
        let cells: Vec<_> = self.users.read().values().map(Arc::clone).collect();
        for cell in &cells {
            cell.modify(|fields| {
                fields.session_score = 0.0;
                fields.session_votes = 0;
                fields.session_penalties = 0;
                fields.status = self.derive_status(fields);
            });
        }
        debug!(users = cells.len(), "session reputation reset");
    }

    /// Load persisted reputation, typically at startup.
    ///
    /// Unknown users take their lifetime data from the record and start the
    /// session empty. A tracked user whose version is behind the record keeps
    /// its entry: the record's lifetime totals are added to what was recorded
    /// live, session components are kept and the version jumps past the
    /// record's. Records that are not newer than the tracked entry are
    /// skipped. Returns the number of records applied.
    pub fn restore(&self, records: impl IntoIterator<Item = UserReputation>) -> usize {
        let mut applied = 0;

        for record in records {
            let existing = {
                let mut users = self.users.write();
                match users.entry(record.user.clone()) {
                    Entry::Occupied(entry) => Arc::clone(entry.get()),
                    Entry::Vacant(entry) => {
                        let mut fields = Fields {
                            lifetime_score: self.clamp_score(record.lifetime_score),
                            vote_count: record.vote_count,
                            penalties: record.penalties,
                            last_vote_at: record.last_vote_at,
                            ..Fields::default()
                        };
                        fields.status = self.derive_status(&fields);
                        entry.insert(Arc::new(ReputationCell::new(fields, record.version)));
                        applied += 1;
                        continue;
                    }
                }
            };

            let merged = existing.merge(|fields, version| {
                if version >= record.version {
                    return None;
                }
                fields.lifetime_score = self.clamp_score(fields.lifetime_score + record.lifetime_score);
                fields.vote_count = fields.vote_count.saturating_add(record.vote_count);
                fields.penalties = fields.penalties.saturating_add(record.penalties);
                fields.last_vote_at = fields.last_vote_at.max(record.last_vote_at);
                fields.status = self.derive_status(fields);
                Some(record.version.saturating_add(version))
            });

            match merged {
                Some((_, version)) => {
                    debug!(user = %record.user, stored = record.version, version, "merged reputation record into live entry");
                    applied += 1;
                }
                None => {
                    trace!(user = %record.user, version = record.version, "skipping stale reputation record");
                }
            }
        }

        debug!(applied, "reputation restored");
        applied
    }

    /// Snapshot of every tracked user, ordered by user id.
    pub fn snapshot(&self) -> Vec<UserReputation> {
        let mut records: Vec<_> = self
            .users
            .read()
            .iter()
            .map(|(user, cell)| {
                let (fields, version) = cell.load();
                to_record(user, fields, version)
            })
            .collect();
        records.sort_by(|a, b| a.user.cmp(&b.user));
        records
    }

    /// Users with the most accepted votes across all sessions.
    pub fn top_voters(&self, limit: usize) -> Vec<UserReputation> {
        let mut records = self.snapshot();
        records.retain(|r| r.vote_count > 0);
        records.sort_by_key(|r| Reverse(r.vote_count));
        records.truncate(limit);
        records
    }

    /// Users who voted most recently, newest first.
    pub fn recently_active(&self, limit: usize) -> Vec<UserReputation> {
        let mut records = self.snapshot();
        records.retain(|r| r.last_vote_at.is_some());
        records.sort_by_key(|r| Reverse(r.last_vote_at));
        records.truncate(limit);
        records
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.users.read().contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    fn cell(&self, user: &UserId) -> Arc<ReputationCell> {
        // Fast path: read lock
        if let Some(cell) = self.users.read().get(user) {
            return Arc::clone(cell);
        }

        let mut users = self.users.write();

        // Double-check after acquiring write lock
        if let Some(cell) = users.get(user) {
            return Arc::clone(cell);
        }

        let cell = Arc::new(ReputationCell::new(Fields::default(), 0));
        users.insert(user.clone(), Arc::clone(&cell));
        debug!(%user, "reputation entry created");
        cell
    }
}

fn to_record(user: &UserId, fields: Fields, version: u64) -> UserReputation {
    UserReputation {
        user: user.clone(),
        lifetime_score: fields.lifetime_score,
        session_score: fields.session_score,
        vote_count: fields.vote_count,
        session_votes: fields.session_votes,
        penalties: fields.penalties,
        session_penalties: fields.session_penalties,
        last_vote_at: fields.last_vote_at,
        status: fields.status,
        version,
    }
}
