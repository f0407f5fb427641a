use crate::shared::frame::Frame;

/// Domain interface for the live image feed.
///
/// Called from per-tick detection workers and from commit requests,
/// possibly at the same time, hence `&self` and `Sync`. A slow capture
/// holds a pending-call slot but never delays the poll timer. `None` means
/// no frame is available right now.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Option<Frame>;
}
