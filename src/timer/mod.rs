//! Countdown timing: clock, scheduler and the state machine.

pub mod clock;
pub mod engine;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Collaborators, CountdownEngine, TimerEvent};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TaskId, TokioScheduler};
