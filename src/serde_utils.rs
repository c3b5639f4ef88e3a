//! Shared serialization utilities for 256-bit fixed-point values.
//!
//! Values are written as decimal strings and read from either decimal strings
//! or plain integers, so TOML configs can use integers while JSON scenario
//! files can carry values beyond `u64`.

use std::fmt;

use ethnum::{I256, U256};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

struct U256Visitor;

impl<'de> Visitor<'de> for U256Visitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative value {} for unsigned field", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        U256::from_str_radix(v.trim().replace('_', "").as_str(), 10)
            .map_err(|e| E::custom(format!("invalid unsigned integer {:?}: {}", v, e)))
    }
}

struct I256Visitor;

impl<'de> Visitor<'de> for I256Visitor {
    type Value = I256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a signed integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<I256, E> {
        Ok(I256::new(v as i128))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<I256, E> {
        Ok(I256::new(v as i128))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<I256, E> {
        I256::from_str_radix(v.trim().replace('_', "").as_str(), 10)
            .map_err(|e| E::custom(format!("invalid signed integer {:?}: {}", v, e)))
    }
}

/// `#[serde(with = "crate::serde_utils::u256")]`
pub mod u256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        d.deserialize_any(U256Visitor)
    }
}

/// `#[serde(with = "crate::serde_utils::i256")]`
pub mod i256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &I256, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<I256, D::Error> {
        d.deserialize_any(I256Visitor)
    }
}

/// `#[serde(with = "crate::serde_utils::u256_seq")]` for `Vec<U256>`
pub mod u256_seq {
    use super::*;
    use serde::de::SeqAccess;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(values: &[U256], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    struct Element(U256);

    impl<'de> serde::Deserialize<'de> for Element {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            d.deserialize_any(U256Visitor).map(Element)
        }
    }

    struct SeqVisitor;

    impl<'de> Visitor<'de> for SeqVisitor {
        type Value = Vec<U256>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of unsigned integers")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<U256>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Element(value)) = seq.next_element()? {
                out.push(value);
            }
            Ok(out)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<U256>, D::Error> {
        d.deserialize_seq(SeqVisitor)
    }
}
