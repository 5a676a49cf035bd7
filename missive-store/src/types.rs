use std::sync::{LazyLock, Mutex, PoisonError};

/// Identifier for a notification record
///
/// A ULID: globally unique, and lexicographically sortable by creation time.
/// Identifiers handed out by one process are strictly increasing, so "lowest
/// identifier" and "created first" agree even within a single millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId {
    id: ulid::Ulid,
}

static GENERATOR: LazyLock<Mutex<ulid::Generator>> =
    LazyLock::new(|| Mutex::new(ulid::Generator::new()));

impl NotificationId {
    /// Parse a record ID from a filename like `01ARYZ6S41TSV4RRFFQ69G5FAV.bin`
    ///
    /// Rejects path separators, `..` and anything that is not a valid ULID.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(".bin")?;
        stem.parse().ok()
    }

    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new identifier, greater than any previously generated in this process
    #[must_use]
    pub fn generate() -> Self {
        let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
        let id = generator.generate().unwrap_or_else(|_| ulid::Ulid::new());
        Self { id }
    }

    pub(crate) fn filename(&self) -> String {
        format!("{}.bin", self.id)
    }
}

impl std::str::FromStr for NotificationId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self::new)
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl serde::Serialize for NotificationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for NotificationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_validation() {
        assert!(NotificationId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_some());

        assert!(NotificationId::from_filename("../etc/passwd.bin").is_none());
        assert!(NotificationId::from_filename("foo/bar.bin").is_none());
        assert!(NotificationId::from_filename("..\\windows\\system32.bin").is_none());
        assert!(NotificationId::from_filename("not_a_valid_ulid.bin").is_none());
        assert!(NotificationId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.eml").is_none());
        assert!(NotificationId::from_filename(".tmp_01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_none());
    }

    #[test]
    fn test_generated_ids_are_strictly_increasing() {
        let ids: Vec<_> = (0..1000).map(|_| NotificationId::generate()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_display_parse_round_trip() {
        let id = NotificationId::generate();
        let parsed: NotificationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("nope".parse::<NotificationId>().is_err());
    }
}
