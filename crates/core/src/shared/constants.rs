use std::time::Duration;

pub const CHECK_FACE_PATH: &str = "/api/attendance/check_face/";
pub const MARK_ATTENDANCE_PATH: &str = "/api/attendance/mark_attendance/";
pub const UPLOAD_PHOTO_PATH: &str = "/api/students/upload_photo/";

/// Multipart field carrying the frame for face checks and attendance.
pub const IMAGE_FIELD: &str = "image";
/// Multipart field carrying the frame for photo registration.
pub const PHOTO_FIELD: &str = "photo";
/// Multipart field carrying the identity hint.
pub const STUDENT_ID_FIELD: &str = "student_id";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Detector polling cadence used by the capture pages.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Detection calls allowed to be outstanding at once before ticks are skipped.
pub const DEFAULT_MAX_PENDING_DETECTIONS: usize = 4;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
