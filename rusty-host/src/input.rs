/// Pointer input state for camera drags.
///
/// Only the horizontal axis matters: a press starts a drag, every move while
/// pressed yields the x delta since the last move, release ends it.
#[derive(Debug, Default)]
pub struct InputState {
    pub pointer_down: bool,
    pub pointer_x: Option<f64>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self) {
        self.pointer_down = true;
    }

    pub fn release(&mut self) {
        self.pointer_down = false;
    }

    /// Pointer left the window: drop the drag and forget the position so the
    /// next entry does not produce a jump.
    pub fn leave(&mut self) {
        self.pointer_down = false;
        self.pointer_x = None;
    }

    /// Record a cursor move. Returns the horizontal delta in pixels when a
    /// drag is in progress.
    pub fn moved(&mut self, x: f64) -> Option<f32> {
        let last = self.pointer_x.replace(x);
        if !self.pointer_down {
            return None;
        }
        let dx = x - last?;
        (dx != 0.0).then_some(dx as f32)
    }
}
