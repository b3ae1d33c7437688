//! Settings - resolved configuration
//!
//! An immutable key/value view of the configuration file, plus typed accessors
//! for every key the bridge itself understands. Keys it does not understand
//! are handed to the sink client untouched (see [`Settings::passthrough`]).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::ContractError;

/// Destination topic
pub const TOPIC_KEY: &str = "topic";
/// Comma-separated filter terms
pub const TERMS_KEY: &str = "terms";
/// OAuth consumer key
pub const CONSUMER_KEY_KEY: &str = "consumer.key";
/// OAuth consumer secret
pub const CONSUMER_SECRET_KEY: &str = "consumer.secret";
/// OAuth access token
pub const TOKEN_KEY: &str = "token";
/// OAuth access token secret
pub const TOKEN_SECRET_KEY: &str = "token.secret";
/// Relay capacity
pub const RELAY_CAPACITY_KEY: &str = "relay.capacity";
/// Bound on the drain phase, in milliseconds (0 = unbounded)
pub const DRAIN_TIMEOUT_KEY: &str = "drain.timeout.ms";
/// Stream client selection
pub const STREAM_SOURCE_KEY: &str = "stream.source";
/// TCP stream endpoint
pub const STREAM_HOST_KEY: &str = "stream.host";
/// Bound on TCP connect plus handshake, in milliseconds
pub const STREAM_CONNECT_TIMEOUT_KEY: &str = "stream.connect.timeout.ms";
/// Recorded stream file
pub const STREAM_REPLAY_PATH_KEY: &str = "stream.replay.path";
/// How long a send may wait for room in the sink's own queue
pub const SINK_QUEUE_TIMEOUT_KEY: &str = "sink.queue.timeout.ms";

/// Topic used when `topic` is unset
pub const DEFAULT_TOPIC: &str = "feed_raw";
/// Terms tracked when `terms` is unset
pub const DEFAULT_TERMS: [&str; 2] = ["kafka", "summer"];
/// Relay capacity used when `relay.capacity` is unset
pub const DEFAULT_RELAY_CAPACITY: usize = 10_000;
/// Drain bound used when `drain.timeout.ms` is unset
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
/// Connect bound used when `stream.connect.timeout.ms` is unset
pub const DEFAULT_STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Sink queue wait used when `sink.queue.timeout.ms` is unset
pub const DEFAULT_SINK_QUEUE_TIMEOUT: Duration = Duration::from_secs(60);

/// Mandatory credential keys, in the order they are checked
pub const CREDENTIAL_KEYS: [&str; 4] = [
    CONSUMER_KEY_KEY,
    CONSUMER_SECRET_KEY,
    TOKEN_KEY,
    TOKEN_SECRET_KEY,
];

/// Keys owned by the bridge and therefore never passed to the sink
const RESERVED_KEYS: [&str; 6] = [
    TOPIC_KEY,
    TERMS_KEY,
    CONSUMER_KEY_KEY,
    CONSUMER_SECRET_KEY,
    TOKEN_KEY,
    TOKEN_SECRET_KEY,
];

/// Key prefixes owned by the bridge
const RESERVED_PREFIXES: [&str; 4] = ["stream.", "relay.", "drain.", "sink."];

/// Resolved settings
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: BTreeMap<String, String>,
}

impl Settings {
    /// Create settings from resolved entries
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Raw value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Destination topic, `feed_raw` when unset
    pub fn topic(&self) -> &str {
        self.get(TOPIC_KEY).unwrap_or(DEFAULT_TOPIC)
    }

    /// Filter terms, the default pair when unset
    pub fn filter_terms(&self) -> FilterTermSet {
        match self.get(TERMS_KEY) {
            Some(raw) => FilterTermSet::parse(raw),
            None => FilterTermSet::default(),
        }
    }

    /// Stream credentials
    ///
    /// # Errors
    /// `Authentication` naming the first absent (or empty) credential key.
    pub fn credentials(&self) -> Result<Credentials, ContractError> {
        Ok(Credentials {
            consumer_key: self.credential(CONSUMER_KEY_KEY)?,
            consumer_secret: self.credential(CONSUMER_SECRET_KEY)?,
            token: self.credential(TOKEN_KEY)?,
            token_secret: self.credential(TOKEN_SECRET_KEY)?,
        })
    }

    fn credential(&self, key: &str) -> Result<String, ContractError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ContractError::missing_credential(key))
    }

    /// Relay capacity
    pub fn relay_capacity(&self) -> Result<usize, ContractError> {
        match self.get(RELAY_CAPACITY_KEY) {
            None => Ok(DEFAULT_RELAY_CAPACITY),
            Some(raw) => raw.trim().parse().map_err(|_| {
                ContractError::config_validation(
                    RELAY_CAPACITY_KEY,
                    format!("expected a positive integer, got '{raw}'"),
                )
            }),
        }
    }

    /// Drain bound, `None` means wait for every in-flight delivery
    pub fn drain_timeout(&self) -> Result<Option<Duration>, ContractError> {
        match self.millis(DRAIN_TIMEOUT_KEY)? {
            None => Ok(Some(DEFAULT_DRAIN_TIMEOUT)),
            Some(0) => Ok(None),
            Some(ms) => Ok(Some(Duration::from_millis(ms))),
        }
    }

    /// Sink queue wait
    pub fn sink_queue_timeout(&self) -> Result<Duration, ContractError> {
        Ok(self
            .millis(SINK_QUEUE_TIMEOUT_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SINK_QUEUE_TIMEOUT))
    }

    /// Stream connect and handshake bound
    pub fn stream_connect_timeout(&self) -> Result<Duration, ContractError> {
        Ok(self
            .millis(STREAM_CONNECT_TIMEOUT_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STREAM_CONNECT_TIMEOUT))
    }

    /// Optional millisecond value
    pub fn millis(&self, key: &str) -> Result<Option<u64>, ContractError> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    ContractError::config_validation(
                        key,
                        format!("expected milliseconds, got '{raw}'"),
                    )
                })
            })
            .transpose()
    }

    /// Stream client selection, `tcp` when unset
    pub fn stream_source(&self) -> Result<StreamSourceKind, ContractError> {
        match self.get(STREAM_SOURCE_KEY) {
            None => Ok(StreamSourceKind::Tcp),
            Some(raw) => StreamSourceKind::from_name(raw).ok_or_else(|| {
                ContractError::config_validation(
                    STREAM_SOURCE_KEY,
                    format!("unknown stream source '{raw}', expected 'tcp' or 'replay'"),
                )
            }),
        }
    }

    /// Entries the bridge does not own, for the sink client
    pub fn passthrough(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(key, _)| !is_reserved(key))
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key) || RESERVED_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Stream client kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSourceKind {
    /// Line-delimited stream over TCP
    Tcp,
    /// Recorded stream file
    Replay,
}

impl StreamSourceKind {
    /// Parse from a config value
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "replay" => Some(Self::Replay),
            _ => None,
        }
    }
}

/// OAuth1-style stream credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("token", &self.token)
            .field("token_secret", &"***")
            .finish()
    }
}

/// Ordered terms the stream is filtered to
///
/// Never empty: parsing always yields at least one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTermSet(Vec<String>);

impl FilterTermSet {
    /// Split a comma-separated value, trimming each term
    ///
    /// Order and duplicates are kept. Trailing empty terms are dropped
    /// (`a,b,` is `[a, b]`), but at least one term always remains.
    pub fn parse(raw: &str) -> Self {
        let mut terms: Vec<String> = raw.split(',').map(|t| t.trim().to_string()).collect();
        while terms.len() > 1 && terms.last().is_some_and(String::is_empty) {
            terms.pop();
        }
        Self(terms)
    }

    /// Terms in subscription order
    pub fn terms(&self) -> &[String] {
        &self.0
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every term is blank
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(String::is_empty)
    }
}

impl Default for FilterTermSet {
    fn default() -> Self {
        Self(DEFAULT_TERMS.iter().map(|t| t.to_string()).collect())
    }
}

impl fmt::Display for FilterTermSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
