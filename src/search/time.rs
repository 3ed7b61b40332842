use std::time::Duration;

pub const MOVES_TO_GO_MAX: u32 = 30;
const NORMAL_RATIO: f64 = 1.0;
const PONDER_RATIO: f64 = 1.25;

/// Soft and hard budgets for one move.
///
/// - `limit_1`: target; past it a finished iteration stops the search.
/// - `limit_2`: hard stop checked inside the tree.
/// - `limit_3`: stop during a root re-search (fail high/low).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeLimits {
    pub limit_1: Duration,
    pub limit_2: Duration,
    pub limit_3: Duration,
}

impl TimeLimits {
    /// Splits the remaining clock over `movestogo` moves (30 when unknown or
    /// larger), keeping 5% plus one second in reserve.
    pub fn allocate(time: Duration, inc: Duration, movestogo: Option<u32>, ponder: bool) -> Self {
        let mtg = match movestogo {
            Some(n) if n > 0 && n <= MOVES_TO_GO_MAX => n,
            _ => MOVES_TO_GO_MAX,
        } as f64;
        let time_max = (time.as_secs_f64() * 0.95 - 1.0).max(0.0);
        let horizon = time_max + inc.as_secs_f64() * (mtg - 1.0);

        let ratio = if ponder { PONDER_RATIO } else { NORMAL_RATIO };
        let limit_1 = (horizon / mtg * ratio).min(time_max);
        let limit_2 = (horizon * 0.5).max(limit_1).min(time_max);
        let limit_3 = (horizon * 0.25).max(limit_1).min(time_max);

        Self {
            limit_1: Duration::from_secs_f64(limit_1),
            limit_2: Duration::from_secs_f64(limit_2),
            limit_3: Duration::from_secs_f64(limit_3),
        }
    }

    /// Fixed time per move. The soft limit is pushed out so that only the
    /// hard limit ends the search.
    pub fn fixed(movetime: Duration) -> Self {
        Self { limit_1: movetime * 5, limit_2: movetime, limit_3: movetime }
    }
}
