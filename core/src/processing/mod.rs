pub mod acquisition;
pub mod buffer;
pub mod estimator;
pub mod scheduler;

pub use acquisition::{AcquisitionLoop, Clock, LoopState, StopHandle, SystemClock, TickOutcome};
pub use buffer::{RetentionPolicy, TimeSeriesBuffer};
pub use estimator::PowerEstimator;
pub use scheduler::drive;
