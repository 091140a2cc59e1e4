mod time_utils;

pub use time_utils::{
    TimeUtils, format_duration, local_now, now_timestamp_ms,
    rfc3339_to_epoch_ms, seconds_left_in_month, start_of_next_month,
};
