use async_trait::async_trait;

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Cooperative delay between polling attempts.
#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, ms: u32);
}

/// `setTimeout`-backed sleeper for the browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutSleeper;

#[async_trait(?Send)]
impl Sleeper for TimeoutSleeper {
    async fn sleep(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval_ms: u32,
    pub max_attempts: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The predicate held on attempt `attempts` (1-based).
    Satisfied { attempts: u32 },
    /// The budget ran out; callers continue with whatever they have.
    Exhausted { attempts: u32 },
}

impl RetryOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, RetryOutcome::Satisfied { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Satisfied { attempts } | RetryOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

/// Run `attempt` until it returns true or `policy.max_attempts` calls have been made,
/// sleeping `policy.interval_ms` between calls. Never sleeps after the last call.
pub async fn retry_until<S, F>(policy: RetryPolicy, sleeper: &S, mut attempt: F) -> RetryOutcome
where
    S: Sleeper + ?Sized,
    F: FnMut(u32) -> bool,
{
    let max = policy.max_attempts.max(1);
    for n in 1..=max {
        if attempt(n) {
            return RetryOutcome::Satisfied { attempts: n };
        }
        if n < max {
            sleeper.sleep(policy.interval_ms).await;
        }
    }
    RetryOutcome::Exhausted { attempts: max }
}
