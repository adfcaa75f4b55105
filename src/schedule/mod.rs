pub mod duration;
pub mod scheduler;

pub use duration::{from_time_units, to_time_units, FormatOptions, TimeUnit};
pub use scheduler::{
    DynamicIntervalScheduler, IntervalValue, SchedulerConfig, TickCallback, TickFuture,
};
