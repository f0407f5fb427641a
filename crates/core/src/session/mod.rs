mod detection_poller;
pub mod session_config;
pub mod session_controller;
pub mod session_error;
pub mod session_event;
pub mod session_logger;
pub mod session_shared;
pub mod submission_pipeline;
#[cfg(test)]
mod test_support;
