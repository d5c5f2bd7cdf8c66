//! Perceptual volume
//!
//! Levels 0-100 map to -60 dB..0 dB so the slider feels even to the ear.
//! Level 0 and mute both mean true silence.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LEVEL: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    level: u8,
    muted: bool,
}

impl Volume {
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Linear gain for the current level, 0.0 when muted
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            level_to_gain(self.level)
        }
    }

    pub fn to_db(&self) -> f32 {
        if self.level == 0 || self.muted {
            -60.0
        } else {
            (f32::from(self.level) - 100.0) * 0.6
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

/// gain = 10^((level - 100) * 0.6 / 20)
fn level_to_gain(level: u8) -> f32 {
    if level == 0 {
        return 0.0;
    }
    let db = (f32::from(level) - 100.0) * 0.6;
    10.0_f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_level_is_unity() {
        assert_eq!(Volume::new(100).gain(), 1.0);
    }

    #[test]
    fn zero_level_is_silent() {
        assert_eq!(Volume::new(0).gain(), 0.0);
        assert_eq!(Volume::new(0).to_db(), -60.0);
    }

    #[test]
    fn half_level_is_minus_thirty_db() {
        let vol = Volume::new(50);
        assert!((vol.gain() - 0.0316).abs() < 0.001);
        assert_eq!(vol.to_db(), -30.0);
    }

    #[test]
    fn mute_keeps_level() {
        let mut vol = Volume::new(70);
        vol.set_muted(true);
        assert_eq!(vol.gain(), 0.0);
        assert_eq!(vol.level(), 70);
        vol.set_muted(false);
        assert!(vol.gain() > 0.0);
    }

    #[test]
    fn level_is_clamped() {
        let mut vol = Volume::new(250);
        assert_eq!(vol.level(), 100);
        vol.set_level(101);
        assert_eq!(vol.level(), 100);
    }

    #[test]
    fn gain_grows_with_level() {
        let gains: Vec<f32> = (0..=100).map(|l| Volume::new(l).gain()).collect();
        assert!(gains.windows(2).all(|w| w[1] > w[0]));
    }
}
