pub mod capture;
pub mod detection;
pub mod session;
pub mod shared;
pub mod submission;
pub mod workflow;
