use crate::prelude::{MonitorResult, VisibleFrame};

/// Display side of the pipeline; receives the visible slice once per tick.
pub trait Renderer {
    fn render(&mut self, frame: &VisibleFrame) -> MonitorResult<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, frame: &VisibleFrame) -> MonitorResult<()> {
        (**self).render(frame)
    }
}

/// Discards every frame; useful when only the buffer is of interest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &VisibleFrame) -> MonitorResult<()> {
        Ok(())
    }
}
