//! Fixed-point math utilities for deterministic movement.
//!
//! Positions, step durations and elapsed time are all fixed-point so an
//! interpolated step lands exactly on its destination cell and two runs of
//! the same input produce bit-identical state on any CPU.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for hand-written fixed-point values.
///
/// Config files carry decimals as strings (`"0.25"`). Parsing goes through
/// the fixed crate's exact decimal parser, never through `f64`.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal string.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim()
            .parse::<Fixed>()
            .map_err(|e| D::Error::custom(format!("invalid decimal '{text}': {e}")))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Linearly interpolate between two vectors.
    ///
    /// `t` is clamped to `[0, 1]`; at `t == 1` the result is exactly `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        let t = t.clamp(Fixed::ZERO, Fixed::ONE);
        if t == Fixed::ONE {
            return other;
        }
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    // Binary search converges from below; perfect squares come out exact.
    let rounded = low.round();
    if rounded * rounded == value {
        rounded
    } else {
        low
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert_eq!(a.distance(b), Fixed::from_num(5));
    }

    #[test]
    fn test_unit_distance_is_exact() {
        let a = Vec2Fixed::from_ints(7, 7);
        let b = Vec2Fixed::from_ints(7, 8);
        assert_eq!(a.distance(b), Fixed::ONE);
    }

    #[test]
    fn test_sqrt_of_two_is_close() {
        let root = fixed_sqrt(Fixed::from_num(2));
        let err = (root * root - Fixed::from_num(2)).abs();
        assert!(err < Fixed::ONE / Fixed::from_num(100_000));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(10, 20);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::from_ints(5, 10));
    }

    #[test]
    fn test_lerp_clamps_to_destination() {
        let a = Vec2Fixed::from_ints(1, 1);
        let b = Vec2Fixed::from_ints(2, 1);
        assert_eq!(a.lerp(b, Fixed::from_num(3)), b);
        assert_eq!(a.lerp(b, Fixed::from_num(-1)), a);
    }

    #[test]
    fn test_fixed_decimal_parses_exactly() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "fixed_decimal")]
            value: Fixed,
        }

        let parsed: Wrapper = ron::from_str("(value: \"0.25\")").unwrap();
        assert_eq!(parsed.value, Fixed::ONE / Fixed::from_num(4));

        let bad: std::result::Result<Wrapper, _> = ron::from_str("(value: \"quarter\")");
        assert!(bad.is_err());
    }
}
