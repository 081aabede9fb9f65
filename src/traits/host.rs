use std::path::Path;

use crate::error::Result;

/// Operations the render sequencer drives once per frame stage
pub trait FrameHost {
    /// Flag derived scene data as stale
    fn mark_scene_dirty(&mut self);

    /// Rebuild, upload, bind, dispatch and accumulate one frame
    fn render_frame(&mut self) -> Result<()>;

    /// Capture the currently displayed target to `path`
    fn capture_frame(&mut self, path: &Path) -> Result<()>;

    /// Notify frame subscribers that `frame` has been rendered
    fn publish_frame(&mut self, frame: u32);

    /// Release every device resource owned by the host
    fn release_resources(&mut self);
}
