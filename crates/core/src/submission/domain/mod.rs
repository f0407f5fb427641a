pub mod commit_client;
pub mod submission;
