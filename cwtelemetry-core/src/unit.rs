// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The closed catalog of measurement [Unit]s a datapoint may carry.
//!
//! The catalog is exactly the set of unit names accepted by
//! [CloudWatch](https://docs.aws.amazon.com/AmazonCloudWatch/latest/APIReference/API_MetricDatum.html).
//! Unknown names are rejected when parsing ([`FromStr`]) or deserializing, so
//! anything holding a [`Unit`] is already known to be valid.

use std::{fmt, str::FromStr};

/// Represent all metric value units allowed by CloudWatch.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// No Unit
    #[default]
    None,
    /// Count
    Count,
    /// Count/Second
    CountPerSecond,
    /// Percent
    Percent,
    /// Seconds with a scale prefix
    Second(NegativeScale),
    /// Bytes with a scale prefix
    Byte(PositiveScale),
    /// Bytes/second with a scale prefix
    BytePerSecond(PositiveScale),
    /// Bits with a scale prefix
    Bit(PositiveScale),
    /// Bits/second with a scale prefix
    BitPerSecond(PositiveScale),
}

impl Unit {
    /// Every unit in the catalog.
    pub const ALL: [Unit; 27] = {
        use NegativeScale as N;
        use PositiveScale as P;
        [
            Unit::Bit(P::One),
            Unit::BitPerSecond(P::One),
            Unit::Byte(P::One),
            Unit::BytePerSecond(P::One),
            Unit::Count,
            Unit::CountPerSecond,
            Unit::Bit(P::Giga),
            Unit::BitPerSecond(P::Giga),
            Unit::Byte(P::Giga),
            Unit::BytePerSecond(P::Giga),
            Unit::Bit(P::Kilo),
            Unit::BitPerSecond(P::Kilo),
            Unit::Byte(P::Kilo),
            Unit::BytePerSecond(P::Kilo),
            Unit::Bit(P::Mega),
            Unit::BitPerSecond(P::Mega),
            Unit::Byte(P::Mega),
            Unit::BytePerSecond(P::Mega),
            Unit::Second(N::Micro),
            Unit::Second(N::Milli),
            Unit::None,
            Unit::Percent,
            Unit::Second(N::One),
            Unit::Bit(P::Tera),
            Unit::BitPerSecond(P::Tera),
            Unit::Byte(P::Tera),
            Unit::BytePerSecond(P::Tera),
        ]
    };

    /// The public name defined by CloudWatch for the unit.
    pub const fn name(self) -> &'static str {
        macro_rules! positive_scale {
            ($scale:expr, $base:literal, $scaled:literal) => {
                match $scale {
                    PositiveScale::One => $base,
                    PositiveScale::Kilo => concat!("Kilo", $scaled),
                    PositiveScale::Mega => concat!("Mega", $scaled),
                    PositiveScale::Giga => concat!("Giga", $scaled),
                    PositiveScale::Tera => concat!("Tera", $scaled),
                }
            };
        }

        match self {
            Self::None => "None",
            Self::Count => "Count",
            Self::CountPerSecond => "Count/Second",
            Self::Percent => "Percent",
            Self::Second(scale) => match scale {
                NegativeScale::Micro => "Microseconds",
                NegativeScale::Milli => "Milliseconds",
                NegativeScale::One => "Seconds",
            },
            Self::Byte(scale) => positive_scale!(scale, "Bytes", "bytes"),
            Self::BytePerSecond(scale) => positive_scale!(scale, "Bytes/Second", "bytes/Second"),
            Self::Bit(scale) => positive_scale!(scale, "Bits", "bits"),
            Self::BitPerSecond(scale) => positive_scale!(scale, "Bits/Second", "bits/Second"),
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a unit name outside the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnit(pub String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit `{}`", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

impl FromStr for Unit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.name() == s)
            .ok_or_else(|| UnknownUnit(s.to_owned()))
    }
}

impl serde::Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Supported *negative* power-of-ten scales for [`Unit`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NegativeScale {
    /// `10^-6`
    Micro,
    /// `10^-3`
    Milli,
    #[default]
    /// `10^0`
    One,
}

/// Supported *positive* power-of-ten scales for [`Unit`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PositiveScale {
    /// `10^0`
    #[default]
    One,
    /// `10^3`
    Kilo,
    /// `10^6`
    Mega,
    /// `10^9`
    Giga,
    /// `10^12`
    Tera,
}
