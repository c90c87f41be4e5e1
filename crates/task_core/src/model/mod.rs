mod task;

pub use task::{DISPLAY_FORMAT, TIMESTAMP_FORMAT, Task, now_timestamp};
