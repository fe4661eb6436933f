//! JSON has no NaN. Series serialize undefined entries as `null` and read
//! `null` back as NaN, so reports survive a round trip.

use std::collections::BTreeMap;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

struct NanSeq<'a>(&'a [f64]);

impl Serialize for NanSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for v in self.0 {
            seq.serialize_element(&(!v.is_nan()).then_some(*v))?;
        }
        seq.end()
    }
}

fn from_options(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    NanSeq(values).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    Vec::<Option<f64>>::deserialize(deserializer).map(from_options)
}

/// For `Option<Vec<f64>>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        values.as_deref().map(NanSeq).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        Option::<Vec<Option<f64>>>::deserialize(deserializer).map(|v| v.map(from_options))
    }
}

/// For name → series maps.
pub mod map {
    use super::*;

    pub fn serialize<S: Serializer>(
        series: &BTreeMap<String, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(series.iter().map(|(k, v)| (k, NanSeq(v))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<f64>>, D::Error> {
        let raw = BTreeMap::<String, Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(k, v)| (k, from_options(v))).collect())
    }
}

#[cfg(test)]
mod tests {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        values: Vec<f64>,
        #[serde(with = "super::option")]
        maybe: Option<Vec<f64>>,
    }

    #[test]
    fn nan_round_trips_through_null() {
        let w = Wrapper {
            values: vec![f64::NAN, 1.5],
            maybe: Some(vec![2.0, f64::NAN]),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"values":[null,1.5],"maybe":[2.0,null]}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert!(back.values[0].is_nan());
        assert_eq!(back.values[1], 1.5);
        let maybe = back.maybe.unwrap();
        assert_eq!(maybe[0], 2.0);
        assert!(maybe[1].is_nan());
    }

    #[test]
    fn none_stays_none() {
        let back: Wrapper = serde_json::from_str(r#"{"values":[],"maybe":null}"#).unwrap();
        assert!(back.values.is_empty());
        assert!(back.maybe.is_none());
    }
}
