//! Post header parsing

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::helpers::parse_datetime;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> std::result::Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec).map(Some)
}

/// Deserialize a timestamp written in any of the usual spellings
fn datetime<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {:?}", raw)))
}

/// Header fields of a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Headers {
    pub title: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub authors: Option<Vec<String>>,
    #[serde(deserialize_with = "datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "datetime")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Option<Vec<String>>,
    /// One-line markdown summary
    pub tldr: Option<String>,
    /// URL of an externally hosted post to embed instead of the body
    pub proxy: Option<String>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Headers {
    /// Parse headers from the front-matter of a post
    ///
    /// The front-matter is the YAML between the first two `---` lines. Text
    /// without that block yields empty headers.
    pub fn parse(content: &str) -> Result<Self> {
        let Some(yaml) = front_matter_block(content) else {
            return Ok(Headers::default());
        };
        if yaml.trim().is_empty() {
            return Ok(Headers::default());
        }
        Ok(serde_yaml::from_str(&yaml)?)
    }
}

/// Lines between the first and second `---` delimiter lines
fn front_matter_block(content: &str) -> Option<String> {
    let mut lines = content.lines();
    lines.by_ref().find(|line| line.trim() == "---")?;

    let mut block = Vec::new();
    for line in lines {
        if line.trim() == "---" {
            return Some(block.join("\n"));
        }
        block.push(line);
    }
    None
}
