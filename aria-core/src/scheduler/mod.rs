// Scheduler module: polling loop that drains eligible jobs

pub mod engine;

pub use engine::SchedulerEngine;
