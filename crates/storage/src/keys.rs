//! Namespace scheme
//!
//! Maps an entity kind plus id to a backend address. The relational backend
//! uses one table per kind. The key/value backend emulates those tables with
//! `prefix + tag + id` keys in one flat keyspace; the tags below are part of the
//! on-disk layout and must not change.

use std::fmt;

/// Id under which singleton kinds are stored in the relational backend
pub const SINGLETON_ID: &str = "default";

/// Key of the schema version marker, relative to the prefix
pub const VERSION_KEY: &str = "dbversion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Metadata,
    Hotlink,
    ApiKey,
    Session,
    UploadStatus,
    UploadDefaults,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Metadata,
        Kind::Hotlink,
        Kind::ApiKey,
        Kind::Session,
        Kind::UploadStatus,
        Kind::UploadDefaults,
    ];

    /// Key tag; keyed kinds end in ':' and get the id appended
    pub const fn tag(self) -> &'static str {
        match self {
            Kind::Metadata => "metadata:",
            Kind::Hotlink => "hotlink:",
            Kind::ApiKey => "apikey:",
            Kind::Session => "session:",
            Kind::UploadStatus => "uploadstatus:",
            Kind::UploadDefaults => "uploaddefaults",
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            Kind::Metadata => "file_metadata",
            Kind::Hotlink => "hotlinks",
            Kind::ApiKey => "api_keys",
            Kind::Session => "sessions",
            Kind::UploadStatus => "upload_status",
            Kind::UploadDefaults => "upload_defaults",
        }
    }

    pub const fn is_singleton(self) -> bool {
        matches!(self, Kind::UploadDefaults)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::Metadata => "metadata",
            Kind::Hotlink => "hotlink",
            Kind::ApiKey => "api key",
            Kind::Session => "session",
            Kind::UploadStatus => "upload status",
            Kind::UploadDefaults => "upload defaults",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key builder for one deployment's slice of a shared keyspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full key of a record; singleton kinds ignore `id`
    pub fn key(&self, kind: Kind, id: &str) -> String {
        if kind.is_singleton() {
            format!("{}{}", self.prefix, kind.tag())
        } else {
            format!("{}{}{}", self.prefix, kind.tag(), id)
        }
    }

    pub fn version_key(&self) -> String {
        format!("{}{}", self.prefix, VERSION_KEY)
    }

    /// Glob pattern matching every key of `kind` and nothing else
    pub fn pattern(&self, kind: Kind) -> String {
        let mut pattern = escape_glob(&self.prefix);
        pattern.push_str(&escape_glob(kind.tag()));
        if !kind.is_singleton() {
            pattern.push('*');
        }
        pattern
    }

    /// Recovers the id from a full key, `None` if the key is not of `kind`
    pub fn id_of<'a>(&self, kind: Kind, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        if kind.is_singleton() {
            return (rest == kind.tag()).then_some(SINGLETON_ID);
        }
        rest.strip_prefix(kind.tag())
    }
}

/// Escapes redis glob metacharacters
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
