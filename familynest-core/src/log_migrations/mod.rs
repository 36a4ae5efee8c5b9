//! Event log schema, embedded at compile time and applied in order.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[(
    "001_session_events.sql",
    include_str!("001_session_events.sql"),
)];
