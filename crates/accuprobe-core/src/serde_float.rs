//! Serde helpers: `f64` as a JSON number when finite, and as the string
//! `"NaN"`, `"inf"` or `"-inf"` otherwise.
//!
//! serde_json writes non-finite floats as `null`, which cannot be told apart
//! or read back. Probed values are exactly where NaN and infinities show up.
//!
//! Use with `#[serde(with = "crate::serde_float")]` on `f64` fields and
//! `#[serde(default, with = "crate::serde_float::option")]` on `Option<f64>`.

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

fn label(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v.is_sign_positive() {
        "inf"
    } else {
        "-inf"
    }
}

fn from_repr<E: serde::de::Error>(repr: Repr) -> Result<f64, E> {
    match repr {
        Repr::Number(n) => Ok(n),
        Repr::Text(text) => match text.as_str() {
            "NaN" | "nan" => Ok(f64::NAN),
            "inf" | "+inf" | "Infinity" => Ok(f64::INFINITY),
            "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
            other => Err(E::custom(format!(
                "expected a number, \"NaN\", \"inf\" or \"-inf\", got \"{other}\""
            ))),
        },
    }
}

pub fn serialize<S>(v: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if v.is_finite() {
        s.serialize_f64(*v)
    } else {
        s.serialize_str(label(*v))
    }
}

pub fn deserialize<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    from_repr(Repr::deserialize(d)?)
}

pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Repr;

    pub fn serialize<S>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match v {
            Some(x) => super::serialize(x, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Repr>::deserialize(d)?
            .map(super::from_repr)
            .transpose()
    }
}
