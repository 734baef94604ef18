//! Three-button chord decoding.
//!
//! A chord is the set of buttons that went down together and have all come
//! back up. Buttons pressed while others are held join the chord; the chord
//! fires on the release that makes the released set equal to the pressed set.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    One,
    Two,
    Three,
}

impl Button {
    pub const ALL: [Self; 3] = [Self::One, Self::Two, Self::Three];

    /// Zero-based position, left to right.
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
        }
    }

    pub const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl TryFrom<u8> for Button {
    type Error = u8;

    /// Buttons are numbered 1..=3 as printed on the panel.
    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(other),
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index() + 1)
    }
}

/// Bit mask of buttons: bit0 = button 1, bit1 = button 2, bit2 = button 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Chord(pub u8);

impl Chord {
    /// Button 1 alone: "back", "cancel", "-".
    pub const LEFT: Self = Self(0b001);
    /// Button 2 alone: "pour", "end", "+".
    pub const MIDDLE: Self = Self(0b010);
    /// Buttons 1 and 2 together: parameter views / recalibrate.
    pub const LEFT_MIDDLE: Self = Self(0b011);
    /// Button 3 alone: "next", "pour" during capture, "raise".
    pub const RIGHT: Self = Self(0b100);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, b: Button) -> bool {
        self.0 & b.bit() != 0
    }

    pub fn of(buttons: &[Button]) -> Self {
        Self(buttons.iter().fold(0, |m, b| m | b.bit()))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for b in Button::ALL {
            if self.contains(b) {
                if !first {
                    f.write_str("+")?;
                }
                write!(f, "{b}")?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Before/after masks for one chord in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChordTracker {
    before: u8,
    after: u8,
}

impl ChordTracker {
    pub const fn new() -> Self {
        Self {
            before: 0,
            after: 0,
        }
    }

    pub fn press(&mut self, b: Button) {
        self.before |= b.bit();
    }

    /// Record a release. Returns the completed chord, if this release
    /// completed one; both masks are cleared when that happens.
    pub fn release(&mut self, b: Button) -> Option<Chord> {
        self.after |= b.bit();
        if self.before != self.after {
            return None;
        }
        let chord = Chord(self.before);
        self.before = 0;
        self.after = 0;
        (!chord.is_empty()).then_some(chord)
    }

    pub const fn masks(&self) -> (u8, u8) {
        (self.before, self.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_click_fires_on_release() {
        let mut t = ChordTracker::new();
        t.press(Button::Three);
        assert_eq!(t.release(Button::Three), Some(Chord::RIGHT));
        assert_eq!(t.masks(), (0, 0));
    }

    #[test]
    fn overlapping_presses_form_one_chord() {
        let mut t = ChordTracker::new();
        t.press(Button::One);
        t.press(Button::Two);
        assert_eq!(t.release(Button::One), None);
        assert_eq!(t.masks(), (0b011, 0b001));
        assert_eq!(t.release(Button::Two), Some(Chord::LEFT_MIDDLE));
        assert_eq!(t.masks(), (0, 0));
    }

    #[test]
    fn release_of_unpressed_button_never_completes() {
        let mut t = ChordTracker::new();
        t.press(Button::One);
        // the panel filters these out by tracking levels
        assert_eq!(t.release(Button::Two), None);
        assert_eq!(t.release(Button::One), None);
    }

    #[test]
    fn button_numbers_map_to_bits() {
        assert_eq!(Button::try_from(1), Ok(Button::One));
        assert_eq!(Button::try_from(3).map(Button::bit), Ok(0b100));
        assert_eq!(Button::try_from(0), Err(0));
        assert_eq!(Chord::of(&[Button::One, Button::Two]), Chord::LEFT_MIDDLE);
        assert_eq!(Chord::LEFT_MIDDLE.to_string(), "1+2");
    }
}
