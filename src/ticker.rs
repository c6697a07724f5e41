use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::broker::Broadcaster;
use crate::console::Console;
use crate::scheduler::TickScheduler;

/// Drive `scheduler` once per configured period until `shutdown` fires.
///
/// The first tick lands one full period after spawning. Ticks missed while
/// the runtime was busy are skipped rather than replayed in a burst.
pub fn spawn_ticker<B>(
    mut scheduler: TickScheduler,
    console: Console,
    out: B,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    B: Broadcaster + 'static,
{
    let period = scheduler.config().period;
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(period_ms = period.as_millis() as u64, "ticker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    scheduler.tick(&console, &out);
                }
            }
        }
        tracing::debug!("ticker stopped");
    })
}
