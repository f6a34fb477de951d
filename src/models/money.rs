use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A non-fractional-cent amount of money, stored as integer cents.
///
/// Serialized as a decimal number (`12.5`); deserialized from a number or a
/// numeric string, rounded to the nearest cent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// `None` for NaN, infinities, and values too large to hold in cents.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as a number or numeric string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_decimal(v).ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                v.checked_mul(100)
                    .map(Money)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .map_err(|_| E::custom("amount out of range"))
                    .and_then(|v| self.visit_i64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                let parsed: f64 = v
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("invalid amount: {v:?}")))?;
                self.visit_f64(parsed)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(5005).to_string(), "50.05");
        assert_eq!(Money::from_cents(-150).to_string(), "-1.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn decimal_rounds_to_nearest_cent() {
        assert_eq!(Money::from_decimal(19.999).unwrap().cents(), 2000);
        assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap().cents(), 30);
        assert!(Money::from_decimal(f64::NAN).is_none());
        assert!(Money::from_decimal(f64::INFINITY).is_none());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let from_int: Money = serde_json::from_str("50").unwrap();
        let from_float: Money = serde_json::from_str("12.5").unwrap();
        let from_str: Money = serde_json::from_str("\"200.00\"").unwrap();
        assert_eq!(from_int, Money::from_units(50));
        assert_eq!(from_float.cents(), 1250);
        assert_eq!(from_str, Money::from_units(200));
        assert!(serde_json::from_str::<Money>("\"lots\"").is_err());
    }

    #[test]
    fn serializes_as_decimal_number() {
        let json = serde_json::to_value(Money::from_cents(1250)).unwrap();
        assert_eq!(json, serde_json::json!(12.5));
    }

    #[test]
    fn ordering_compares_cents() {
        assert!(Money::from_units(50) > Money::from_cents(4999));
        assert!(Money::from_cents(-1).is_negative());
    }
}
