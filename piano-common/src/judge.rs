//! Submission judging
//!
//! A submission maps note identifiers to the correction the player applied
//! to each key. For every key the residual detuning is
//! `offset + correction`, where `offset` comes from the oracle level; a key
//! counts as acceptable when `round(|residual|) <= 8`. Missing keys, and
//! keys whose value is not a JSON number, have an infinite distance.
//! Unknown keys are ignored.
//!
//! The number of acceptable keys picks a feedback [`Tier`]. Only a perfect
//! 25 releases the reward payload.
//!
//! # Rate limiting
//!
//! Each session seed may be judged at most once per cooldown (60 s by
//! default). The check and the timestamp update happen under one lock, so two
//! concurrent submissions for the same seed cannot both get through. A
//! throttled call does no oracle work and leaves the timestamp untouched;
//! a judged call updates it whether or not the answer was right.
//!
//! Entries expire in insertion order through a queue drained on every call.
//! Once `max_tracked` sessions are all inside their cooldown, new sessions
//! are answered as throttled until the oldest entry expires.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::notes::{Note, NOTE_COUNT};
use crate::oracle::TuningOracle;

/// Player submission: note identifier -> applied correction
pub type TuningMap = HashMap<String, Value>;

/// Largest rounded distance still counted as in tune
pub const ACCEPTABLE_DISTANCE: f64 = 8.0;

/// Default minimum interval between judged submissions per session
pub const DEFAULT_COOLDOWN_SECS: i64 = 60;

/// Default number of sessions tracked inside their cooldown
pub const DEFAULT_MAX_TRACKED_SESSIONS: usize = 100_000;

const THROTTLED_MESSAGE: &str =
    "Tarkistit viimeksi alle minuutti sitten, palaappa vielä hetkeksi sorvin ääreen.";

/// Feedback bucket for an acceptable-key count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// All 25 keys in tune
    Tuned,
    /// 24 keys
    AlmostPerfect,
    /// 21-23 keys
    Playable,
    /// 16-20 keys
    Progress,
    /// 11-15 keys
    StillRough,
    /// 6-10 keys
    OutOfTune,
    /// 0-5 keys
    NoEffort,
}

impl Tier {
    pub fn from_count(acceptable: usize) -> Self {
        match acceptable {
            n if n >= NOTE_COUNT => Tier::Tuned,
            n if n > 23 => Tier::AlmostPerfect,
            n if n > 20 => Tier::Playable,
            n if n > 15 => Tier::Progress,
            n if n > 10 => Tier::StillRough,
            n if n > 5 => Tier::OutOfTune,
            _ => Tier::NoEffort,
        }
    }

    /// Fixed feedback text; `None` for [`Tier::Tuned`], which answers with
    /// the reward payload instead
    pub fn message(self) -> Option<&'static str> {
        let message = match self {
            Tier::Tuned => return None,
            Tier::AlmostPerfect => {
                "<h3>Ei ihan vielä täydellinen, mutta...</h3>
        <p>Enää muutama nuotti kaipaa viimeiset hienosäädöt. Mahtavaa työtä, vielä loppurutistus ja saadaan tämä työ päätökseen.</p>"
            }
            Tier::Playable => {
                "<h3>Hienosäädön varaa vielä on, mutta...</h3>
      <p>Loppusuora häämöttää! Tällähän voi jo soittaa jotain. Ei silti varmaan kelpaisi virittäjän asiakkaalle palautettavaksi.</p>"
            }
            Tier::Progress => {
                "<h3>Eipä näillä eväillä vielä naatteja saa, mutta...</h3>
        <p>Hei! Täällähän on tapahtunut edistystä! Paljon on silti vielä hommaa jäljellä.</p>"
            }
            Tier::StillRough => {
                "<h3>Nuotit särähtävät vielä pahoin korvaan, mutta...</h3>
        <p>Muutama kosketin kuulostaa jo aivan oikealta, mutta ei tällä vielä kehtaa soittaa muuta kuin Ukko-Nooaa...</p>"
            }
            Tier::OutOfTune => {
                "<h3>Ei, ei, ei...</h3>
        <p>Tämä piano vaikuttaa olevan vielä pahasti epävireessä... Jatka virittämistä!</p>"
            }
            Tier::NoEffort => {
                "<h3>😡</h3>
        <p>Teitkö sinä edes mitään tälle, vai laitoitko nupit kaakkoon ihan omiasi? Tämähän on aivan täydellisesti epävireessä!</p>"
            }
        };
        Some(message)
    }
}

/// Result returned to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub tuned: bool,
    pub message: String,
}

impl Verdict {
    fn throttled() -> Self {
        Self {
            tuned: false,
            message: THROTTLED_MESSAGE.to_string(),
        }
    }

    /// True when this verdict is the cooldown answer rather than a judgement
    pub fn is_throttled(&self) -> bool {
        !self.tuned && self.message == THROTTLED_MESSAGE
    }
}

/// Per-note distances for one submission
#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    /// Rounded distance per note in index order; infinite for missing notes
    pub distances: [f64; NOTE_COUNT],
    /// Notes within [`ACCEPTABLE_DISTANCE`]
    pub acceptable: usize,
}

/// Compare a submission against the oracle's levels for one session
pub fn score(oracle: &TuningOracle, session_seed: u32, submission: &TuningMap) -> Scorecard {
    let mut distances = [f64::INFINITY; NOTE_COUNT];
    for note in Note::all() {
        if let Some(correction) = submission.get(note.name()).and_then(Value::as_f64) {
            let offset = f64::from(oracle.level(note, session_seed).offset());
            distances[note.index() as usize] = (offset + correction).abs().round();
        }
    }

    let acceptable = distances
        .iter()
        .filter(|distance| **distance <= ACCEPTABLE_DISTANCE)
        .count();

    Scorecard {
        distances,
        acceptable,
    }
}

/// Per-session cooldown bookkeeping
#[derive(Debug, Default)]
struct CooldownTable {
    last_judged: HashMap<u32, DateTime<Utc>>,
    /// Judged times in insertion order, one entry per tracked session
    expiry: VecDeque<(DateTime<Utc>, u32)>,
}

impl CooldownTable {
    /// Forget every session whose cooldown has run out by `now`
    fn expire(&mut self, now: DateTime<Utc>, cooldown: Duration) -> usize {
        let mut expired = 0;
        while let Some(&(judged_at, seed)) = self.expiry.front() {
            if now - judged_at < cooldown {
                break;
            }
            self.expiry.pop_front();
            if self.last_judged.get(&seed) == Some(&judged_at) {
                self.last_judged.remove(&seed);
                expired += 1;
            }
        }
        expired
    }

    fn record(&mut self, seed: u32, now: DateTime<Utc>) {
        self.last_judged.insert(seed, now);
        self.expiry.push_back((now, seed));
    }
}

/// Judges submissions and enforces the per-session cooldown
pub struct SubmissionJudge {
    reward: String,
    cooldown: Duration,
    max_tracked: usize,
    table: Mutex<CooldownTable>,
    scored: AtomicU64,
}

impl SubmissionJudge {
    /// Judge with the default cooldown and tracking limit
    pub fn new(reward: impl Into<String>) -> Self {
        Self::with_limits(
            reward,
            Duration::seconds(DEFAULT_COOLDOWN_SECS),
            DEFAULT_MAX_TRACKED_SESSIONS,
        )
    }

    pub fn with_limits(reward: impl Into<String>, cooldown: Duration, max_tracked: usize) -> Self {
        Self {
            reward: reward.into(),
            cooldown,
            max_tracked: max_tracked.max(1),
            table: Mutex::new(CooldownTable::default()),
            scored: AtomicU64::new(0),
        }
    }

    /// Judge a submission at time `now`
    pub fn judge(
        &self,
        oracle: &TuningOracle,
        session_seed: u32,
        submission: &TuningMap,
        now: DateTime<Utc>,
    ) -> Verdict {
        if !self.try_begin(session_seed, now) {
            debug!("[{}]: Submission throttled", session_seed);
            return Verdict::throttled();
        }

        self.scored.fetch_add(1, Ordering::Relaxed);
        let scorecard = score(oracle, session_seed, submission);
        info!(
            "[{}]: Count {}, tunings {:?}",
            session_seed, scorecard.acceptable, scorecard.distances
        );

        let tier = Tier::from_count(scorecard.acceptable);
        match tier.message() {
            Some(message) => Verdict {
                tuned: false,
                message: message.to_string(),
            },
            None => {
                info!("[{}]: Piano tuned, releasing reward", session_seed);
                Verdict {
                    tuned: true,
                    message: self.reward.clone(),
                }
            }
        }
    }

    /// Last judged time for a session, if any
    pub fn last_judged(&self, session_seed: u32) -> Option<DateTime<Utc>> {
        self.lock().last_judged.get(&session_seed).copied()
    }

    /// Number of sessions currently tracked
    pub fn tracked_sessions(&self) -> usize {
        self.lock().last_judged.len()
    }

    /// Submissions scored against the oracle since startup
    pub fn scored_submissions(&self) -> u64 {
        self.scored.load(Ordering::Relaxed)
    }

    /// Atomically check the cooldown and claim the slot for `now`
    fn try_begin(&self, session_seed: u32, now: DateTime<Utc>) -> bool {
        let mut table = self.lock();

        let expired = table.expire(now, self.cooldown);
        if expired > 0 {
            debug!("Expired {} rate-limit entries", expired);
        }

        if let Some(last) = table.last_judged.get(&session_seed) {
            if now - *last < self.cooldown {
                return false;
            }
        }

        if table.last_judged.len() >= self.max_tracked
            && !table.last_judged.contains_key(&session_seed)
        {
            warn!(
                "[{}]: Rate-limit table full ({} sessions), submission throttled",
                session_seed, self.max_tracked
            );
            return false;
        }

        table.record(session_seed, now);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CooldownTable> {
        // The table stays consistent even if a holder panicked
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
