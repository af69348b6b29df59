//! Vector literal form.
//!
//! Embeddings are persisted as text: `[` + comma-separated numbers + `]`
//! with no spaces, e.g. `[0.1,-0.25,3]`. This is the form the database
//! `vector` column type accepts as input and the form the RPC search
//! function expects for its query argument.

use crate::error::{DbError, DbResult};

/// Render a vector in literal form.
///
/// Numbers use the shortest representation that parses back to the same
/// `f32`, so `parse_vector(&format_vector(v)) == v` for finite input.
pub fn format_vector(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 12 + 2);
    out.push('[');
    for (i, value) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

/// Parse a vector literal.
///
/// Accepts surrounding whitespace and spaces around elements. Rejects
/// missing brackets, empty elements, an empty vector and non-finite numbers.
pub fn parse_vector(literal: &str) -> DbResult<Vec<f32>> {
    let trimmed = literal.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| DbError::vector_literal("expected '[' ... ']'"))?;

    if inner.trim().is_empty() {
        return Err(DbError::vector_literal("empty vector"));
    }

    inner
        .split(',')
        .enumerate()
        .map(|(i, element)| {
            let element = element.trim();
            if element.is_empty() {
                return Err(DbError::vector_literal(format!("empty element at {}", i)));
            }
            let value: f32 = element
                .parse()
                .map_err(|_| DbError::vector_literal(format!("'{}' is not a number", element)))?;
            if !value.is_finite() {
                return Err(DbError::vector_literal(format!(
                    "non-finite element '{}' at {}",
                    element, i
                )));
            }
            Ok(value)
        })
        .collect()
}

/// Serde adapter for `Option<Vec<f32>>` fields stored in literal form.
///
/// Writes the literal string (or `null`). Reads either the literal string or
/// a plain JSON array of numbers, since rows exported by other tools use both.
pub mod embedding_literal {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Literal(String),
        Array(Vec<f32>),
    }

    pub fn serialize<S>(value: &Option<Vec<f32>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(vector) => serializer.serialize_some(&super::format_vector(vector)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Literal(s)) => super::parse_vector(&s).map(Some).map_err(D::Error::custom),
            Some(Raw::Array(v)) if v.is_empty() => Err(D::Error::custom("empty vector")),
            Some(Raw::Array(v)) => Ok(Some(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_has_no_spaces() {
        assert_eq!(format_vector(&[0.1, -0.25, 3.0]), "[0.1,-0.25,3]");
        assert_eq!(format_vector(&[]), "[]");
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(parse_vector("  [0.5, -1 ,2e-3]\n").unwrap(), vec![0.5, -1.0, 0.002]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "0.1,0.2", "[]", "[ ]", "[1,,2]", "[1,]", "[a]", "[NaN]", "[inf,1]"] {
            assert!(
                matches!(parse_vector(bad), Err(DbError::VectorLiteral { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_literal_survives_parse() {
        let v = vec![0.123_456_79_f32, -1.0e-7, 42.0, 0.0];
        assert_eq!(parse_vector(&format_vector(&v)).unwrap(), v);
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Row {
        #[serde(default, with = "embedding_literal")]
        embedding: Option<Vec<f32>>,
    }

    #[test]
    fn test_serde_reads_string_array_and_null() {
        let a: Row = serde_json::from_str(r#"{"embedding":"[1,2]"}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"embedding":[1.0,2.0]}"#).unwrap();
        let c: Row = serde_json::from_str(r#"{"embedding":null}"#).unwrap();
        let d: Row = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(a.embedding, Some(vec![1.0, 2.0]));
        assert_eq!(b.embedding, Some(vec![1.0, 2.0]));
        assert_eq!(c.embedding, None);
        assert_eq!(d.embedding, None);

        assert!(serde_json::from_str::<Row>(r#"{"embedding":"[1,,2]"}"#).is_err());
    }

    #[test]
    fn test_serde_writes_literal() {
        let row = Row {
            embedding: Some(vec![0.5, 1.0]),
        };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"embedding":"[0.5,1]"}"#);
    }
}
