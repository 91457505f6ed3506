pub mod queues {
    pub const READING_QUEUE_CAPACITY: usize = 100;
    pub const EVENT_QUEUE_CAPACITY: usize = 100;
}

pub mod sampling {
    use tokio::time::Duration;

    pub const SAMPLE_PERIOD: Duration = Duration::from_millis(1000);
    pub const SOUND_WINDOW: Duration = Duration::from_millis(100);
    pub const SOUND_YIELD_EVERY: u32 = 10;
    pub const ADC_MAX: u16 = 4095;
    pub const TEMPERATURE_RANGE: (f32, f32) = (-40.0, 80.0);
    pub const HUMIDITY_RANGE: (f32, f32) = (0.0, 100.0);
}

pub mod events {
    pub const DEBOUNCE_WINDOW_MS: u64 = 3000;
}

pub mod wifi {
    use tokio::time::Duration;

    pub const POLL_SPACING: Duration = Duration::from_millis(500);
    pub const PRIMARY_ATTEMPTS: u32 = 20;
    pub const SECONDARY_ATTEMPTS: u32 = 40;
    pub const BACKOFF_FLOOR: Duration = Duration::from_millis(500);
    pub const BACKOFF_CEILING: Duration = Duration::from_millis(4000);
    pub const RESTART_GRACE: Duration = Duration::from_millis(1000);
    pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);
    pub const RESTART_EXIT_CODE: i32 = 75;
}

pub mod upload {
    use tokio::time::Duration;

    pub const BATCH_SIZE: usize = 10;
    pub const UPLOAD_INTERVAL: Duration = Duration::from_secs(10);
    pub const RECEIVE_WAIT: Duration = Duration::from_millis(100);
    pub const UPLOADER_YIELD: Duration = Duration::from_millis(50);
}

pub mod store {
    use tokio::time::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const READY_CHECK_INTERVAL: Duration = Duration::from_secs(5);
}

pub mod display {
    use tokio::time::Duration;

    pub const STATUS_PERIOD: Duration = Duration::from_millis(500);
    pub const LOCK_TIMEOUT: Duration = Duration::from_millis(100);
    pub const ROWS: usize = 4;
    pub const COLS: usize = 20;
}

pub mod simulation {
    use std::time::Duration;

    pub const PULSE_PERIOD: Duration = Duration::from_secs(7);
    pub const RADIO_POLLS_TO_CONNECT: u32 = 3;
    pub const RADIO_DROP_EVERY: u32 = 60;
}

pub mod retention {
    use std::time::Duration;

    pub const RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);
}
