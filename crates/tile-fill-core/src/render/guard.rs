use super::gpu::MaskState;
use super::painter::Painter;
use std::ops::{Deref, DerefMut};

/// Scoped access to a painter that puts the GPU write masks back on drop.
///
/// The color, depth and stencil masks seen on [`MaskGuard::new`] are restored however the
/// scope is left, so callers further down the frame always find them as they left them.
pub struct MaskGuard<'a, P: Painter> {
    painter: &'a mut P,
    saved: MaskState,
}

impl<'a, P: Painter> MaskGuard<'a, P> {
    pub fn new(painter: &'a mut P) -> Self {
        let saved = MaskState::capture(painter.gpu());
        Self { painter, saved }
    }

    /// Masks that will be restored.
    pub fn saved(&self) -> MaskState {
        self.saved
    }
}

impl<P: Painter> Deref for MaskGuard<'_, P> {
    type Target = P;
    fn deref(&self) -> &P {
        self.painter
    }
}

impl<P: Painter> DerefMut for MaskGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.painter
    }
}

impl<P: Painter> Drop for MaskGuard<'_, P> {
    fn drop(&mut self) {
        let saved = self.saved;
        saved.apply(self.painter.gpu());
    }
}
