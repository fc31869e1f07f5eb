use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Key holding the interface language of every request
pub const LANGUAGE_KEY: &str = "hl";

/// Language used when none was set
pub const DEFAULT_LANGUAGE: &str = "en";

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Int(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Accumulated query parameters of a retriever.
///
/// No key ever maps to a null value: writing `None` removes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestParameters {
    values: BTreeMap<String, ParamValue>,
}

impl RequestParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a parameter
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Overwrite a parameter, or delete it when `value` is `None`
    pub fn update<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        let key = key.into();
        match value {
            Some(value) => {
                self.values.insert(key, value.into());
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    /// Delete a parameter, returning its previous value
    pub fn unset(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    /// Merge with overwrite; `None` entries delete their key
    pub fn merge<K, I>(&mut self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<ParamValue>)>,
    {
        for (key, value) in entries {
            self.update(key, value);
        }
    }

    /// Clear every parameter and merge `entries` into the empty set
    pub fn replace_all<K, I>(&mut self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<ParamValue>)>,
    {
        self.values.clear();
        self.merge(entries);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Text rendering of a parameter, whatever its type
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(ToString::to_string)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Language of the requests, falling back to [`DEFAULT_LANGUAGE`]
    #[must_use]
    pub fn language(&self) -> String {
        self.get_string(LANGUAGE_KEY)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.set(LANGUAGE_KEY, language.into());
    }

    /// Key/value pairs in the form the transport sends them
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }

    /// Parameters of a URL's query component; the first occurrence of a key wins
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::new();
        for (key, value) in url.query_pairs() {
            if !params.contains(&key) {
                params.set(key.into_owned(), value.into_owned());
            }
        }
        params
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}
