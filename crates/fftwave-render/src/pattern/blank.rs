use crate::canvas::Canvas;

use super::{PatternInput, PatternRenderer};

/// Draws nothing, leaving the whole canvas to the background
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankPattern;

impl PatternRenderer for BlankPattern {
    fn name(&self) -> &str {
        "blank"
    }

    fn draw(&mut self, canvas: &mut dyn Canvas, _input: &PatternInput<'_>) {
        canvas.clear();
    }
}
