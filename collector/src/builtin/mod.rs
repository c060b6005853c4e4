pub mod batch;
pub mod heartbeat;
pub mod logging;
