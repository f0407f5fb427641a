pub mod image_file_source;
pub mod latest_frame_slot;
