use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Pixel, Pos3D};

/// A physical drone's state: position and current color.
///
/// `is_hidden` is derived from `color`, not stored, so the two can never
/// drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneState {
    pub pos: Pos3D,
    pub color: Color,
}

impl DroneState {
    pub fn new(pos: Pos3D, color: Color) -> Self {
        DroneState { pos, color }
    }

    pub fn from_pixel(pixel: Pixel) -> Self {
        DroneState::new(pixel.pos, pixel.color)
    }

    pub fn is_hidden(&self) -> bool {
        self.color == Color::HIDDEN
    }

    pub fn pixel(&self) -> Pixel {
        Pixel::new(self.pos, self.color)
    }

    pub fn set_pos(&mut self, pos: Pos3D) {
        self.pos = pos;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_hidden_tracks_color() {
        let mut drone = DroneState::new(Pos3D::new(0.0, 0.0, 0.0), Color::RED);
        assert!(!drone.is_hidden());
        drone.set_color(Color::HIDDEN);
        assert!(drone.is_hidden());
    }
}
