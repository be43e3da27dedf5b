//! Hand landmark types and their mapping to screen points.

use serde::{Deserialize, Serialize};

use crate::distance::MeasurementSegment;

/// A digit of the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digit {
    /// Thumb (tip, IP, MP, CMC).
    Thumb,
    /// Index finger (tip, DIP, PIP, MCP).
    Index,
    /// Middle finger.
    Middle,
    /// Ring finger.
    Ring,
    /// Little finger.
    Little,
}

impl Digit {
    /// All digits, thumb first.
    pub const ALL: [Self; 5] = [
        Self::Thumb,
        Self::Index,
        Self::Middle,
        Self::Ring,
        Self::Little,
    ];
}

/// A detected 2D landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Normalized x in `[0, 1]`.
    pub x: f64,
    /// Normalized y in `[0, 1]`.
    pub y: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Landmark {
    /// Creates a landmark.
    #[must_use]
    pub const fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// The four joints of one digit, tip first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitJoints {
    /// Fingertip.
    pub tip: Landmark,
    /// Joint nearest the tip (DIP, or IP for the thumb).
    pub upper: Landmark,
    /// Middle joint (PIP, or MP for the thumb).
    pub lower: Landmark,
    /// Base joint (MCP, or CMC for the thumb).
    pub base: Landmark,
}

impl DigitJoints {
    /// Creates a joint chain, tip first.
    #[must_use]
    pub const fn new(tip: Landmark, upper: Landmark, lower: Landmark, base: Landmark) -> Self {
        Self {
            tip,
            upper,
            lower,
            base,
        }
    }

    /// Joints in chain order, tip to base.
    #[must_use]
    pub const fn chain(&self) -> [Landmark; 4] {
        [self.tip, self.upper, self.lower, self.base]
    }
}

/// One detected hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    /// Thumb joints.
    pub thumb: DigitJoints,
    /// Index finger joints.
    pub index: DigitJoints,
    /// Middle finger joints.
    pub middle: DigitJoints,
    /// Ring finger joints.
    pub ring: DigitJoints,
    /// Little finger joints.
    pub little: DigitJoints,
    /// Wrist.
    pub wrist: Landmark,
}

impl HandPose {
    /// Joints of one digit.
    #[must_use]
    pub const fn digit(&self, digit: Digit) -> &DigitJoints {
        match digit {
            Digit::Thumb => &self.thumb,
            Digit::Index => &self.index,
            Digit::Middle => &self.middle,
            Digit::Ring => &self.ring,
            Digit::Little => &self.little,
        }
    }
}

/// How normalized landmark coordinates map to screen points.
///
/// # Example
///
/// ```
/// use ar_measure::LandmarkMapping;
///
/// // Portrait capture: the landmark axes are swapped and scaled by width.
/// let mapping = LandmarkMapping::default();
/// assert_eq!(mapping.to_screen(0.25, 0.5), [195.0, 97.5]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LandmarkMapping {
    /// `(x, y) → (y * width, x * width)`, for a pipeline rotated to portrait.
    Portrait {
        /// View width in points.
        width: f64,
    },
    /// `(x, y) → (x * width, y * height)`.
    Direct {
        /// View width in points.
        width: f64,
        /// View height in points.
        height: f64,
    },
}

impl LandmarkMapping {
    /// Maps a normalized landmark position to a screen point.
    #[must_use]
    pub fn to_screen(&self, x: f64, y: f64) -> [f64; 2] {
        match *self {
            Self::Portrait { width } => [y * width, x * width],
            Self::Direct { width, height } => [x * width, y * height],
        }
    }

    /// Inverse of [`to_screen`](Self::to_screen).
    #[must_use]
    pub fn to_normalized(&self, screen: [f64; 2]) -> (f64, f64) {
        match *self {
            Self::Portrait { width } => (screen[1] / width, screen[0] / width),
            Self::Direct { width, height } => (screen[0] / width, screen[1] / height),
        }
    }

    /// True if every dimension is positive and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            Self::Portrait { width } => ok(width),
            Self::Direct { width, height } => ok(width) && ok(height),
        }
    }
}

impl Default for LandmarkMapping {
    fn default() -> Self {
        Self::Portrait { width: 390.0 }
    }
}

/// Length of one digit.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitMeasurement {
    /// Which digit.
    pub digit: Digit,
    /// Straight tip-to-base distance in centimeters.
    pub length_cm: f64,
    /// Tip→upper, upper→lower and lower→base, for drawing.
    pub segments: Vec<MeasurementSegment>,
}

/// Palm length, middle-finger base to wrist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmMeasurement {
    /// Distance in centimeters.
    pub length_cm: f64,
    /// The measured segment.
    pub segment: MeasurementSegment,
}

/// Everything measurable on one hand in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandMeasurement {
    /// Digits measured this frame.
    pub digits: Vec<DigitMeasurement>,
    /// Digits voided by low confidence or a missed raycast.
    pub voided: Vec<Digit>,
    /// Palm length, if measurable.
    pub palm: Option<PalmMeasurement>,
}

impl HandMeasurement {
    /// Measurement of a single digit, if it was not voided.
    #[must_use]
    pub fn digit(&self, digit: Digit) -> Option<&DigitMeasurement> {
        self.digits.iter().find(|m| m.digit == digit)
    }
}
