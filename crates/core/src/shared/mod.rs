pub mod api_client;
pub mod bounding_box;
pub mod constants;
pub mod frame;
