// Tiltwatch - Tilt Escalation Monitor
//
// Samples a 3-axis accelerometer, classifies each reading as level or tilted,
// and latches a critical alarm when tilt persists through a fixed deadline.
//
// Pipeline:
//   sampler task --(latest-wins handoff)--> evaluator task
//                                             |-> escalation timer (one-shot)
//                                             '-> LED matrix
// The timer reports back only through an atomic deadline flag, which the
// evaluator polls once per cycle.

pub mod config;
pub mod drivers;
pub mod error;
pub mod escalation;
pub mod events;
pub mod handoff;
pub mod tasks;
pub mod timer;

pub use config::MonitorConfig;
pub use error::DriverError;
pub use escalation::{AlarmLatch, Phase};
pub use events::{Pattern, Reading, TiltStatus};
pub use tasks::evaluator::{evaluator_task, Evaluator};
pub use tasks::sampler::sampler_task;
pub use timer::{DeadlineFlag, EscalationTimer};
