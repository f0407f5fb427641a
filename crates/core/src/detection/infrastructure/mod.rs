pub mod http_presence_detector;
