use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (as Unix timestamp)
    #[serde(deserialize_with = "deserialize_numeric_date")]
    pub exp: u64,

    /// Granted scopes or roles
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_scopes"
    )]
    pub scopes: Vec<String>,

    /// Issued at (as Unix timestamp)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_numeric_date"
    )]
    pub iat: Option<u64>,

    /// Not before (as Unix timestamp)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_numeric_date"
    )]
    pub nbf: Option<u64>,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audiences, from a single string or a list
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_audience"
    )]
    pub aud: Vec<String>,

    /// Custom claims
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create new claims for a subject expiring at `exp`
    pub fn new(subject: impl Into<String>, exp: u64) -> Self {
        Self {
            sub: subject.into(),
            exp,
            scopes: Vec::new(),
            iat: None,
            nbf: None,
            iss: None,
            aud: Vec::new(),
            custom: HashMap::new(),
        }
    }

    /// Set scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set not before time
    pub fn with_not_before(mut self, nbf: u64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Set issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Add an audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.aud.push(audience.into());
        self
    }

    /// Check if the claims are expired at `now` (Unix seconds)
    pub fn is_expired(&self, now: u64) -> bool {
        self.exp < now
    }

    /// Check if the claims are not yet valid at `now` (Unix seconds)
    pub fn is_not_valid_yet(&self, now: u64) -> bool {
        self.nbf.map_or(false, |nbf| nbf > now)
    }

    /// Scopes formatted for the identity header
    pub fn scopes_header_value(&self) -> Option<String> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(self.scopes.join(" "))
        }
    }
}

/// Accepts `"read write"` as well as `["read", "write"]`
fn deserialize_scopes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scopes {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Scopes::deserialize(deserializer)? {
        Scopes::List(list) => list,
        Scopes::Joined(joined) => joined.split_whitespace().map(str::to_string).collect(),
    })
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Audience>::deserialize(deserializer)? {
        Some(Audience::One(aud)) => vec![aud],
        Some(Audience::Many(list)) => list,
        None => Vec::new(),
    })
}

/// NumericDate may carry a fractional part; it is truncated to whole seconds
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Seconds(u64),
    Fractional(f64),
}

impl NumericDate {
    fn into_seconds<E: de::Error>(self) -> Result<u64, E> {
        match self {
            NumericDate::Seconds(secs) => Ok(secs),
            NumericDate::Fractional(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs.trunc() as u64),
            NumericDate::Fractional(secs) => {
                Err(E::custom(format!("invalid numeric date: {}", secs)))
            }
        }
    }
}

fn deserialize_numeric_date<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    NumericDate::deserialize(deserializer)?.into_seconds()
}

fn deserialize_optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumericDate>::deserialize(deserializer)?
        .map(NumericDate::into_seconds)
        .transpose()
}

/// Supported JWT algorithms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256
    #[default]
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JwtAlgorithm::HS256 => "HS256",
            JwtAlgorithm::HS384 => "HS384",
            JwtAlgorithm::HS512 => "HS512",
        };
        f.write_str(name)
    }
}

impl FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            other => Err(format!("unsupported token algorithm: {}", other)),
        }
    }
}
