use tokio::time::{self, MissedTickBehavior};

use crate::prelude::MonitorResult;
use crate::processing::acquisition::{AcquisitionLoop, Clock, LoopState, TickOutcome};
use crate::sdr_interface::{Renderer, SampleSource};

/// Ticks the loop at its configured interval until it stops or faults.
///
/// Starts an idle loop first. Ticks never overlap: a cycle that runs past the
/// interval pushes the next tick back instead of bursting to catch up.
/// Returns the number of readings published.
pub async fn drive<S, R, C>(acquisition: &mut AcquisitionLoop<S, R, C>) -> MonitorResult<usize>
where
    S: SampleSource,
    R: Renderer,
    C: Clock,
{
    if acquisition.state() == LoopState::Idle {
        acquisition.start()?;
    }
    let mut interval = time::interval(acquisition.config().tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut published = 0;
    loop {
        interval.tick().await;
        match acquisition.tick()? {
            TickOutcome::Published { .. } => published += 1,
            TickOutcome::Stopped => return Ok(published),
        }
    }
}
