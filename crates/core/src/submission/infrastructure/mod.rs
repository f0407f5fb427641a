pub mod http_commit_client;
