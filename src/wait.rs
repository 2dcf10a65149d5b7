use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Interval and deadline of a poll loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Poll {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Poll {
    fn default() -> Self {
        Poll {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub enum PollError<E> {
    Timeout,
    Cancelled,
    Failed(E),
}

impl Poll {
    /// Fetches a fresh resource immediately and then once per interval until
    /// `check` yields a value, the deadline passes, `cancel` fires, or a
    /// fetch fails. A failed fetch aborts the loop without retrying.
    pub async fn until<R, E, T, F, Fut, C>(
        &self,
        cancel: &CancellationToken,
        mut fetch: F,
        mut check: C,
    ) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        C: FnMut(R) -> Option<T>,
    {
        let attempts = attempt_until(self.interval, &mut fetch, &mut check);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PollError::Cancelled),
            res = tokio::time::timeout(self.timeout, attempts) => match res {
                Ok(res) => res,
                Err(_) => Err(PollError::Timeout),
            },
        }
    }
}

async fn attempt_until<R, E, T, F, Fut, C>(
    interval: Duration,
    fetch: &mut F,
    check: &mut C,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    C: FnMut(R) -> Option<T>,
{
    loop {
        let resource = fetch().await.map_err(PollError::Failed)?;
        if let Some(done) = check(resource) {
            return Ok(done);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Runs a single cluster call, dropping it as soon as `cancel` fires.
pub async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    call: F,
) -> Result<F::Output, Error> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        output = call => Ok(output),
    }
}
