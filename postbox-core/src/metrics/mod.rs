//! Metric names and descriptions
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op, so library code records unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const LOGIN_SUCCESS: &str = "postbox.login.success";
pub const LOGIN_FAILURE: &str = "postbox.login.failure";
pub const MESSAGES_SENT: &str = "postbox.messages.sent";
pub const BROKER_DELIVERED: &str = "postbox.broker.delivered";
pub const BROKER_DISCONNECTED: &str = "postbox.broker.disconnected";
pub const BROKER_SUBSCRIBERS: &str = "postbox.broker.subscribers";

/// Register descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(LOGIN_SUCCESS, "Successful logins");
    describe_counter!(LOGIN_FAILURE, "Rejected logins");
    describe_counter!(MESSAGES_SENT, "Messages stored and published");
    describe_counter!(BROKER_DELIVERED, "Records handed to subscriber buffers");
    describe_counter!(
        BROKER_DISCONNECTED,
        "Subscribers dropped because their buffer was full"
    );
    describe_gauge!(BROKER_SUBSCRIBERS, "Currently registered subscribers");
}

pub fn record_counter(name: &'static str, value: u64) {
    if value > 0 {
        counter!(name).increment(value);
    }
}

pub fn record_gauge(name: &'static str, value: f64) {
    gauge!(name).set(value);
}
