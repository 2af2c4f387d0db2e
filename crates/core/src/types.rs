/// Patient identifiers are random UUIDs allocated at registration and
/// immutable for the patient's lifetime.
pub type PatientId = uuid::Uuid;

/// Provider identifiers are random UUIDs allocated at registration.
pub type ProviderId = uuid::Uuid;

/// Alert subscribers are providers or emergency contacts.
pub type SubscriberId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
