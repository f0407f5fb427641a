pub mod detection_sample;
pub mod presence_detector;
