//! Per-user reputation storage with lock-free consistent reads.

use std::hint::spin_loop;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering, fence};

use crowdprice_primitives::Timestamp;
use parking_lot::Mutex;

use crate::ReputationStatus;

/// Fixed-point scaling so scores fit in atomics.
const SCORE_SCALE: f64 = 100_000.0;
const NEVER_VOTED: u64 = u64::MAX;
const ORD: Ordering = Ordering::Relaxed;

pub(crate) fn to_fixed(score: f64) -> i64 {
    (score * SCORE_SCALE).round() as i64
}

pub(crate) fn from_fixed(fixed: i64) -> f64 {
    fixed as f64 / SCORE_SCALE
}

/// Plain copy of the mutable fields of a [`ReputationCell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fields {
    pub(crate) lifetime_score: f64,
    pub(crate) session_score: f64,
    pub(crate) vote_count: u64,
    pub(crate) session_votes: u64,
    pub(crate) penalties: u64,
    pub(crate) session_penalties: u64,
    pub(crate) last_vote_at: Option<Timestamp>,
    pub(crate) status: ReputationStatus,
}

impl Default for Fields {
    fn default() -> Self {
        Self {
            lifetime_score: 0.0,
            session_score: 0.0,
            vote_count: 0,
            session_votes: 0,
            penalties: 0,
            session_penalties: 0,
            last_vote_at: None,
            status: ReputationStatus::Neutral,
        }
    }
}

/// Sequence-locked reputation fields.
///
/// `seq` is odd while a writer is mid-update. Readers copy the fields and
/// retry until they observe the same even `seq` before and after the copy.
/// Writers are serialised by `writer`, so `seq / 2` is the number of
/// completed updates.
#[derive(Debug)]
pub(crate) struct ReputationCell {
    seq: AtomicU64,
    lifetime_score: AtomicI64,
    session_score: AtomicI64,
    vote_count: AtomicU64,
    session_votes: AtomicU64,
    penalties: AtomicU64,
    session_penalties: AtomicU64,
    last_vote_at: AtomicU64,
    status: AtomicU8,
    writer: Mutex<()>,
}

impl ReputationCell {
    pub(crate) fn new(fields: Fields, version: u64) -> Self {
        let cell = Self {
            seq: AtomicU64::new(version.saturating_mul(2)),
            lifetime_score: AtomicI64::new(0),
            session_score: AtomicI64::new(0),
            vote_count: AtomicU64::new(0),
            session_votes: AtomicU64::new(0),
            penalties: AtomicU64::new(0),
            session_penalties: AtomicU64::new(0),
            last_vote_at: AtomicU64::new(NEVER_VOTED),
            status: AtomicU8::new(ReputationStatus::Neutral as u8),
            writer: Mutex::new(()),
        };
        cell.store_fields(&fields);
        cell
    }

    /// Consistent copy of the fields and the version they belong to.
    pub(crate) fn load(&self) -> (Fields, u64) {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }

            let fields = self.load_fields();
            fence(Ordering::Acquire);

            if self.seq.load(ORD) == before {
                return (fields, before / 2);
            }
            spin_loop();
        }
    }

    /// Apply `f` under the writer lock and publish the result.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut Fields)) -> (Fields, u64) {
        let _guard = self.writer.lock();
        let seq = self.seq.load(ORD);

        let mut fields = self.load_fields();
        f(&mut fields);
        self.publish(seq, fields, seq / 2 + 1)
    }

    /// Like [`Self::modify`], but `f` also sees the current version and
    /// returns the version to publish at, or `None` to leave the cell
    /// untouched. The published version always moves forward.
    pub(crate) fn merge(&self, f: impl FnOnce(&mut Fields, u64) -> Option<u64>) -> Option<(Fields, u64)> {
        let _guard = self.writer.lock();
        let seq = self.seq.load(ORD);

        let mut fields = self.load_fields();
        let version = f(&mut fields, seq / 2)?;
        Some(self.publish(seq, fields, version.max(seq / 2 + 1)))
    }

    /// Caller holds `writer`.
    fn publish(&self, seq: u64, mut fields: Fields, version: u64) -> (Fields, u64) {
        fields.lifetime_score = from_fixed(to_fixed(fields.lifetime_score));
        fields.session_score = from_fixed(to_fixed(fields.session_score));

        self.seq.store(seq + 1, ORD);
        fence(Ordering::Release);
        self.store_fields(&fields);
        self.seq.store(version.saturating_mul(2), Ordering::Release);

        (fields, version)
    }

    pub(crate) fn version(&self) -> u64 {
        self.seq.load(Ordering::Acquire) / 2
    }

    fn load_fields(&self) -> Fields {
        let last_vote_at = self.last_vote_at.load(ORD);
        Fields {
            lifetime_score: from_fixed(self.lifetime_score.load(ORD)),
            session_score: from_fixed(self.session_score.load(ORD)),
            vote_count: self.vote_count.load(ORD),
            session_votes: self.session_votes.load(ORD),
            penalties: self.penalties.load(ORD),
            session_penalties: self.session_penalties.load(ORD),
            last_vote_at: (last_vote_at != NEVER_VOTED).then(|| Timestamp::from_millis(last_vote_at)),
            status: ReputationStatus::from_repr(self.status.load(ORD)).unwrap_or_default(),
        }
    }

    fn store_fields(&self, fields: &Fields) {
        self.lifetime_score.store(to_fixed(fields.lifetime_score), ORD);
        self.session_score.store(to_fixed(fields.session_score), ORD);
        self.vote_count.store(fields.vote_count, ORD);
        self.session_votes.store(fields.session_votes, ORD);
        self.penalties.store(fields.penalties, ORD);
        self.session_penalties.store(fields.session_penalties, ORD);
        self.last_vote_at.store(
            fields.last_vote_at.map_or(NEVER_VOTED, |at| at.as_millis()),
            ORD,
        );
        self.status.store(fields.status as u8, ORD);
    }
}
