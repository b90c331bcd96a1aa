//! Serde adapters for float series containing NaN.
//!
//! JSON has no NaN: warm-up entries are written as `null` and read back as
//! `f64::NAN`. Use with `#[serde(with = "crate::serde_nan::vec")]`.

fn opt(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

pub mod vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(|v| super::opt(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(d)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

pub mod matrix {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(rows: &[Vec<f64>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(
            rows.iter()
                .map(|row| row.iter().map(|v| super::opt(*v)).collect::<Vec<_>>()),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<f64>>, D::Error> {
        let raw: Vec<Vec<Option<f64>>> = Vec::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect())
    }
}

pub mod map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<f64>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_map(map.iter().map(|(k, values)| {
            (
                k,
                values.iter().map(|v| super::opt(*v)).collect::<Vec<_>>(),
            )
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, Vec<f64>>, D::Error> {
        let raw: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(k, values)| {
                (
                    k,
                    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                )
            })
            .collect())
    }
}

/// A single value that may be NaN.
pub mod scalar {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        match super::opt(*v) {
            Some(x) => s.serialize_some(&x),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::vec")]
        values: Vec<f64>,
        #[serde(with = "super::map")]
        series: BTreeMap<String, Vec<f64>>,
        #[serde(with = "super::scalar")]
        one: f64,
    }

    #[test]
    fn nan_survives_json() {
        let mut series = BTreeMap::new();
        series.insert("upper".to_string(), vec![f64::NAN, 2.0]);
        let h = Holder {
            values: vec![f64::NAN, 1.5],
            series,
            one: f64::NAN,
        };
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.contains("null"));
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert!(back.values[0].is_nan());
        assert_eq!(back.values[1], 1.5);
        assert!(back.series["upper"][0].is_nan());
        assert!(back.one.is_nan());
    }
}
