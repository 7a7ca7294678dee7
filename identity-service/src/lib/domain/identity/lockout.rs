use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// Wrong-attempt ceiling; the counter never moves past this value.
pub const MAX_WRONG_ATTEMPTS: u8 = 3;

/// How long an account stays blocked after the third wrong code.
pub const BLOCK_MINUTES: i64 = 60;

/// Lockout state of an identity's challenge, derived from the persisted
/// counter and block expiry.
///
/// `Locked` auto-reverts to `Open` purely by time comparison; there is no
/// explicit unlock event. A stale counter left behind by an expired block
/// is only reset when the next challenge is issued or a verification
/// succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    /// 0 or 1 wrong attempts recorded
    Open,
    /// 2 wrong attempts recorded; the next failure locks the account
    Warned,
    /// Block active until the carried instant
    Locked { until: DateTime<Utc> },
}

/// Derive the lockout state from persisted challenge fields.
pub fn state(
    wrong_attempts: u8,
    block_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LockoutState {
    if let Some(until) = block_expires_at {
        if now < until {
            return LockoutState::Locked { until };
        }
    }
    match wrong_attempts {
        2 => LockoutState::Warned,
        _ => LockoutState::Open,
    }
}

/// Persisted effect of one more wrong code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrongCodeTransition {
    /// Counter moves up; no block yet
    Count { wrong_attempts: u8 },
    /// Third failure: counter saturates and the block is stamped
    Lock {
        wrong_attempts: u8,
        until: DateTime<Utc>,
    },
    /// Counter already saturated; nothing to record
    Saturated,
}

/// The single transition function for wrong-code events.
///
/// Callers must have already rejected the attempt while `Locked`; this
/// function only decides what the failure does to the persisted counter
/// and block expiry.
pub fn on_wrong_code(wrong_attempts: u8, now: DateTime<Utc>) -> WrongCodeTransition {
    match wrong_attempts {
        0 | 1 => WrongCodeTransition::Count {
            wrong_attempts: wrong_attempts + 1,
        },
        2 => WrongCodeTransition::Lock {
            wrong_attempts: MAX_WRONG_ATTEMPTS,
            until: now + Duration::minutes(BLOCK_MINUTES),
        },
        _ => WrongCodeTransition::Saturated,
    }
}
