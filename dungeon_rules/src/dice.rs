//! Dice expressions such as `1d6+2`, `1d4+STR` or `2d6-1+INT/2`.
//!
//! Grammar (whitespace ignored):
//!
//! ```text
//! expr   := term (('+' | '-') term)*        first term may carry a sign
//! term   := [count] 'd' sides               dice group, count defaults to 1
//!         | integer                         flat constant
//!         | ('STR' | 'AGI' | 'INT') ['/' k] attribute modifier, divided by k
//! ```
//!
//! Expressions are validated when parsed, which happens when content is
//! deserialized. A malformed expression is therefore a load-time failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::mechanics::Attribute;
use crate::rng::RollSource;

/// Upper bound on dice in one group.
pub const MAX_DICE: u32 = 100;
/// Upper bound on faces per die.
pub const MAX_SIDES: u32 = 1000;

/// Errors produced while parsing a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("empty dice expression")]
    Empty,

    #[error("unexpected token at position {position} in dice expression '{expr}'")]
    UnexpectedToken { expr: String, position: usize },

    #[error("invalid dice group {count}d{sides} in '{expr}'")]
    InvalidDie { expr: String, count: u32, sides: u32 },

    #[error("attribute divisor must be positive in '{expr}'")]
    ZeroDivisor { expr: String },

    #[error("constant term out of range in '{expr}'")]
    Overflow { expr: String },
}

/// `count` dice with `sides` faces each, added or subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceGroup {
    pub count: u32,
    pub sides: u32,
    pub negative: bool,
}

/// An attribute reference, resolved against the roller's attribute modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTerm {
    pub attribute: Attribute,
    pub divisor: i32,
    pub negative: bool,
}

/// A parsed, validated dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpr {
    dice: Vec<DiceGroup>,
    attributes: Vec<AttributeTerm>,
    flat: i32,
}

impl DiceExpr {
    /// Parse and validate an expression.
    pub fn parse(input: &str) -> Result<Self, DiceError> {
        let compact: Vec<u8> = input.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }

        let mut parser = Parser {
            source: input,
            bytes: &compact,
            pos: 0,
        };
        let mut expr = DiceExpr {
            dice: Vec::new(),
            attributes: Vec::new(),
            flat: 0,
        };

        let mut first = true;
        while !parser.at_end() {
            let negative = match parser.peek() {
                Some(b'+') => {
                    parser.pos += 1;
                    false
                }
                Some(b'-') => {
                    parser.pos += 1;
                    true
                }
                _ if first => false,
                _ => return Err(parser.unexpected()),
            };
            first = false;
            parser.term(negative, &mut expr)?;
        }

        Ok(expr)
    }

    /// A bare constant, useful for fixed damage.
    pub fn constant(value: i32) -> Self {
        Self {
            dice: Vec::new(),
            attributes: Vec::new(),
            flat: value,
        }
    }

    /// The dice groups in this expression.
    pub fn dice(&self) -> &[DiceGroup] {
        &self.dice
    }

    /// The sum of the flat constants.
    pub fn flat(&self) -> i32 {
        self.flat
    }

    /// Roll only the dice groups. Can be negative if a group is subtracted.
    pub fn roll_dice<R: RollSource + ?Sized>(&self, rng: &mut R) -> i32 {
        let mut total = 0i32;
        for group in &self.dice {
            let mut sum = 0i32;
            for _ in 0..group.count {
                sum += rng.roll_die(group.sides) as i32;
            }
            if group.negative {
                total -= sum;
            } else {
                total += sum;
            }
        }
        total
    }

    /// Resolve the attribute terms. `modifier` maps an attribute to the
    /// roller's modifier for it.
    pub fn attribute_bonus(&self, modifier: impl Fn(Attribute) -> i32) -> i32 {
        self.attributes
            .iter()
            .map(|term| {
                let value = modifier(term.attribute).div_euclid(term.divisor);
                if term.negative {
                    -value
                } else {
                    value
                }
            })
            .sum()
    }

    /// Roll the whole expression, floored at zero.
    pub fn roll<R: RollSource + ?Sized>(
        &self,
        rng: &mut R,
        modifier: impl Fn(Attribute) -> i32,
    ) -> i32 {
        self.roll_dice(rng)
            .saturating_add(self.flat)
            .saturating_add(self.attribute_bonus(modifier))
            .max(0)
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for group in &self.dice {
            if group.negative {
                write!(f, "-")?;
            } else if wrote {
                write!(f, "+")?;
            }
            write!(f, "{}d{}", group.count, group.sides)?;
            wrote = true;
        }
        for term in &self.attributes {
            if term.negative {
                write!(f, "-")?;
            } else if wrote {
                write!(f, "+")?;
            }
            write!(f, "{}", term.attribute.token())?;
            if term.divisor != 1 {
                write!(f, "/{}", term.divisor)?;
            }
            wrote = true;
        }
        if self.flat != 0 || !wrote {
            if wrote && self.flat > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", self.flat)?;
        }
        Ok(())
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DiceExpr> for String {
    fn from(expr: DiceExpr) -> Self {
        expr.to_string()
    }
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn unexpected(&self) -> DiceError {
        DiceError::UnexpectedToken {
            expr: self.source.to_string(),
            position: self.pos,
        }
    }

    fn number(&mut self) -> Result<u32, DiceError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected());
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or(DiceError::UnexpectedToken {
                expr: self.source.to_string(),
                position: start,
            })
    }

    fn term(&mut self, negative: bool, expr: &mut DiceExpr) -> Result<(), DiceError> {
        match self.peek() {
            Some(b) if b.is_ascii_digit() || b == b'd' => {
                let count = if b == b'd' { 1 } else { self.number()? };
                if self.peek() == Some(b'd') {
                    self.pos += 1;
                    let sides = self.number()?;
                    if count == 0 || count > MAX_DICE || sides == 0 || sides > MAX_SIDES {
                        return Err(DiceError::InvalidDie {
                            expr: self.source.to_string(),
                            count,
                            sides,
                        });
                    }
                    expr.dice.push(DiceGroup {
                        count,
                        sides,
                        negative,
                    });
                } else {
                    let value = i32::try_from(count).map_err(|_| self.unexpected())?;
                    let flat = if negative {
                        expr.flat.checked_sub(value)
                    } else {
                        expr.flat.checked_add(value)
                    };
                    expr.flat = flat.ok_or(DiceError::Overflow {
                        expr: self.source.to_string(),
                    })?;
                }
                Ok(())
            }
            Some(b) if b.is_ascii_uppercase() => {
                let start = self.pos;
                while matches!(self.peek(), Some(b) if b.is_ascii_uppercase()) {
                    self.pos += 1;
                }
                let token = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
                let attribute = Attribute::from_token(token).ok_or(DiceError::UnexpectedToken {
                    expr: self.source.to_string(),
                    position: start,
                })?;
                let mut divisor = 1;
                if self.peek() == Some(b'/') {
                    self.pos += 1;
                    let raw = self.number()?;
                    if raw == 0 {
                        return Err(DiceError::ZeroDivisor {
                            expr: self.source.to_string(),
                        });
                    }
                    divisor = i32::try_from(raw).map_err(|_| self.unexpected())?;
                }
                expr.attributes.push(AttributeTerm {
                    attribute,
                    divisor,
                    negative,
                });
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;

    fn no_attributes(_: Attribute) -> i32 {
        0
    }

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpr::parse("1d6+2").unwrap();
        assert_eq!(
            expr.dice(),
            &[DiceGroup {
                count: 1,
                sides: 6,
                negative: false
            }]
        );
        assert_eq!(expr.flat(), 2);
        assert_eq!(expr.to_string(), "1d6+2");
    }

    #[test]
    fn test_parse_attribute_terms() {
        let expr = DiceExpr::parse("2d6 - 1 + INT/2").unwrap();
        assert_eq!(expr.flat(), -1);
        assert_eq!(expr.to_string(), "2d6+INT/2-1");

        let bonus = expr.attribute_bonus(|attr| match attr {
            Attribute::Intellect => 5,
            _ => 0,
        });
        assert_eq!(bonus, 2);
    }

    #[test]
    fn test_implicit_count_and_constant_only() {
        assert_eq!(DiceExpr::parse("d8").unwrap().to_string(), "1d8");
        assert_eq!(DiceExpr::parse("3").unwrap().to_string(), "3");
        assert_eq!(DiceExpr::parse("-2").unwrap().flat(), -2);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(DiceExpr::parse("   "), Err(DiceError::Empty));
        assert!(matches!(
            DiceExpr::parse("1d6+"),
            Err(DiceError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            DiceExpr::parse("1d0"),
            Err(DiceError::InvalidDie { .. })
        ));
        assert!(matches!(
            DiceExpr::parse("0d6"),
            Err(DiceError::InvalidDie { .. })
        ));
        assert!(matches!(
            DiceExpr::parse("1d6+CHA"),
            Err(DiceError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            DiceExpr::parse("STR/0"),
            Err(DiceError::ZeroDivisor { .. })
        ));
        assert!(matches!(
            DiceExpr::parse("1d6*2"),
            Err(DiceError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_roll_uses_script() {
        let expr = DiceExpr::parse("2d6+1").unwrap();
        let mut rng = ScriptedRolls::new([3, 5]);
        assert_eq!(expr.roll(&mut rng, no_attributes), 9);
    }

    #[test]
    fn test_roll_floors_at_zero() {
        let expr = DiceExpr::parse("1d4-10").unwrap();
        let mut rng = ScriptedRolls::new([4]);
        assert_eq!(expr.roll(&mut rng, no_attributes), 0);
    }

    #[test]
    fn test_serde_validates_on_load() {
        let expr: DiceExpr = serde_json::from_str("\"1d4+STR\"").unwrap();
        assert_eq!(expr.to_string(), "1d4+STR");
        assert_eq!(serde_json::to_string(&expr).unwrap(), "\"1d4+STR\"");

        let bad: Result<DiceExpr, _> = serde_json::from_str("\"1dX\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_constant_overflow_is_an_error() {
        let overflow =
            |expr: &str| matches!(DiceExpr::parse(expr), Err(DiceError::Overflow { .. }));
        assert!(overflow("2147483647+1"));
        assert!(overflow("2000000000+2000000000"));
        assert!(overflow("-2147483647-2"));
        assert_eq!(DiceExpr::parse("2147483647").unwrap().flat(), i32::MAX);

        let bad: Result<DiceExpr, _> = serde_json::from_str("\"2147483647+1\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_roll_saturates() {
        let expr = DiceExpr::parse("1d6+2147483647").unwrap();
        let mut rng = ScriptedRolls::new([6]);
        assert_eq!(expr.roll(&mut rng, no_attributes), i32::MAX);
    }
}
