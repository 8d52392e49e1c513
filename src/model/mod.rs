pub mod period;
pub mod task;
