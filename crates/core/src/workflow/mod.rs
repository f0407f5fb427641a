pub mod capture_workflow;
