//! Injection input: bare URLs or partial records, normalized into [`Record`]

use serde::Deserialize;

/// Raw injection input: a bare location or a record object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Url(String),
    Object(RawRecord),
}

/// Record object as supplied by the producer, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRecord {
    pub url: Option<String>,
    pub change_freq: Option<String>,
    pub priority: Option<f64>,
}

/// A validated sitemap entry. Immutable once accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    url: String,
    change_freq: Option<String>,
    priority: Option<f64>,
}

/// Malformed injection input
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    MissingUrl,
    EmptyUrl,
    EmptyChangeFreq,
    PriorityOutOfRange(f64),
    Malformed(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUrl => write!(f, "\"url\" is required"),
            Self::EmptyUrl => write!(f, "\"url\" is not allowed to be empty"),
            Self::EmptyChangeFreq => write!(f, "\"changeFreq\" is not allowed to be empty"),
            Self::PriorityOutOfRange(p) => write!(f, "\"priority\" {p} is outside [0, 1]"),
            Self::Malformed(msg) => write!(f, "malformed entry: {msg}"),
        }
    }
}

impl std::error::Error for RecordError {}

impl Entry {
    /// Parse one line of producer input: a JSON object, a JSON string, or a bare URL.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let line = line.trim();
        if line.starts_with('{') || line.starts_with('"') || line.starts_with('[') {
            return serde_json::from_str(line).map_err(|e| RecordError::Malformed(e.to_string()));
        }
        Ok(Self::Url(line.to_string()))
    }

    /// Validate and fill in a [`Record`]
    pub fn normalize(self) -> Result<Record, RecordError> {
        let raw = match self {
            Self::Url(url) => RawRecord {
                url: Some(url),
                ..Default::default()
            },
            Self::Object(raw) => raw,
        };

        let url = raw.url.ok_or(RecordError::MissingUrl)?;
        if url.is_empty() {
            return Err(RecordError::EmptyUrl);
        }
        if raw.change_freq.as_deref() == Some("") {
            return Err(RecordError::EmptyChangeFreq);
        }
        if let Some(p) = raw.priority {
            // NaN fails both comparisons
            if !(0.0..=1.0).contains(&p) {
                return Err(RecordError::PriorityOutOfRange(p));
            }
        }

        Ok(Record {
            url,
            change_freq: raw.change_freq,
            priority: raw.priority,
        })
    }
}

impl Record {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn change_freq(&self) -> Option<&str> {
        self.change_freq.as_deref()
    }

    pub fn priority(&self) -> Option<f64> {
        self.priority
    }
}

impl From<&str> for Entry {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for Entry {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<RawRecord> for Entry {
    fn from(raw: RawRecord) -> Self {
        Self::Object(raw)
    }
}

impl From<Record> for Entry {
    fn from(record: Record) -> Self {
        Self::Object(RawRecord {
            url: Some(record.url),
            change_freq: record.change_freq,
            priority: record.priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_url() {
        let record = Entry::from("/some-path").normalize().unwrap();
        assert_eq!(record.url(), "/some-path");
        assert_eq!(record.change_freq(), None);
        assert_eq!(record.priority(), None);
    }

    #[test]
    fn full_object() {
        let record = Entry::parse_line(r#"{"url": "/a", "changeFreq": "monthly", "priority": 0.9}"#)
            .unwrap()
            .normalize()
            .unwrap();
        assert_eq!(record.url(), "/a");
        assert_eq!(record.change_freq(), Some("monthly"));
        assert_eq!(record.priority(), Some(0.9));
    }

    #[test]
    fn missing_url() {
        let entry = Entry::parse_line(r#"{"changeFreq": "daily"}"#).unwrap();
        assert_eq!(entry.normalize().unwrap_err(), RecordError::MissingUrl);
    }

    #[test]
    fn empty_url() {
        assert_eq!(Entry::from("").normalize().unwrap_err(), RecordError::EmptyUrl);
    }

    #[test]
    fn empty_change_freq() {
        let entry = Entry::Object(RawRecord {
            url: Some("/a".to_string()),
            change_freq: Some(String::new()),
            priority: None,
        });
        assert_eq!(entry.normalize().unwrap_err(), RecordError::EmptyChangeFreq);
    }

    #[test]
    fn priority_bounds() {
        for p in [0.0, 0.5, 1.0] {
            let entry = Entry::Object(RawRecord {
                url: Some("/a".to_string()),
                priority: Some(p),
                ..Default::default()
            });
            assert!(entry.normalize().is_ok());
        }
        for p in [-0.1, 1.5, f64::NAN] {
            let entry = Entry::Object(RawRecord {
                url: Some("/a".to_string()),
                priority: Some(p),
                ..Default::default()
            });
            assert!(matches!(
                entry.normalize(),
                Err(RecordError::PriorityOutOfRange(_))
            ));
        }
    }

    #[test]
    fn array_is_malformed() {
        assert!(matches!(
            Entry::parse_line(r#"["/some-path"]"#),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_key_is_malformed() {
        assert!(matches!(
            Entry::parse_line(r#"{"url": "/a", "lastmod": "2020-01-01"}"#),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn json_string_line() {
        assert_eq!(
            Entry::parse_line(r#""/quoted""#).unwrap(),
            Entry::Url("/quoted".to_string())
        );
    }

    #[test]
    fn record_round_trips_into_entry() {
        let record = Entry::from("/x").normalize().unwrap();
        assert_eq!(Entry::from(record.clone()).normalize().unwrap(), record);
    }
}
