use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, Secret};

/// Timestamp layout every signed request carries.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Method name used to open a new session.
pub const CREATE_SESSION: &str = "createsession";

/// Signer trait for request authentication
///
/// Signing must be a pure function of the credentials, the method name and the
/// timestamp, so implementations never touch the network or any shared state.
pub trait Signer: Send + Sync {
    /// Developer id sent in clear alongside the signature
    fn developer_id(&self) -> &str;

    /// Compute the signature for a method call at the given (already formatted) timestamp
    fn sign(&self, method_name: &str, timestamp: &str) -> String;

    /// Path segments for a session-creation request:
    /// `[developer_id, signature, timestamp]`
    fn session_payload(&self, timestamp: &str) -> [String; 3] {
        [
            self.developer_id().to_string(),
            self.sign(CREATE_SESSION, timestamp),
            timestamp.to_string(),
        ]
    }
}

/// Format a UTC instant the way the service expects it in request paths.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current UTC time in request-path format.
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// MD5 signer used by the Hi-Rez API family.
///
/// The signature is the lowercase hex MD5 digest of
/// `developer_id + method_name + AUTH_KEY + timestamp`, with the auth key uppercased.
pub struct Md5Signer {
    developer_id: String,
    auth_key: Secret<String>,
}

impl Md5Signer {
    /// Create a new signer
    ///
    /// # Arguments
    /// * `developer_id` - Developer id issued by the service
    /// * `auth_key` - Authentication key paired with the developer id
    pub fn new(developer_id: impl Into<String>, auth_key: &str) -> Self {
        Self {
            developer_id: developer_id.into(),
            auth_key: Secret::new(auth_key.trim().to_uppercase()),
        }
    }
}

impl std::fmt::Debug for Md5Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Md5Signer")
            .field("developer_id", &self.developer_id)
            .finish_non_exhaustive()
    }
}

impl Signer for Md5Signer {
    fn developer_id(&self) -> &str {
        &self.developer_id
    }

    fn sign(&self, method_name: &str, timestamp: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.developer_id.as_bytes());
        hasher.update(method_name.to_lowercase().as_bytes());
        hasher.update(self.auth_key.expose_secret().as_bytes());
        hasher.update(timestamp.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DEV_ID: &str = "1004";
    const AUTH_KEY: &str = "23DF3C7E9BD14D84BF892AD206B6755C";

    #[test]
    fn test_known_signature() {
        let signer = Md5Signer::new(DEV_ID, AUTH_KEY);
        assert_eq!(
            signer.sign("createsession", "20120927183145"),
            "8f53249be0922c94720834771ad43f0f"
        );
        assert_eq!(
            signer.sign("getplayer", "20120927183145"),
            "e4b75aac6c70059578adeb7fa2bbf504"
        );
    }

    #[test]
    fn test_signature_is_deterministic() {
        let first = Md5Signer::new(DEV_ID, AUTH_KEY);
        let second = Md5Signer::new(DEV_ID, AUTH_KEY);
        let a = first.sign("getplayer", "20240101000000");
        assert_eq!(a, first.sign("getplayer", "20240101000000"));
        assert_eq!(a, second.sign("getplayer", "20240101000000"));
        assert_ne!(a, first.sign("getplayer", "20240101000001"));
    }

    #[test]
    fn test_auth_key_case_is_normalized() {
        let upper = Md5Signer::new(DEV_ID, AUTH_KEY);
        let lower = Md5Signer::new(DEV_ID, &AUTH_KEY.to_lowercase());
        assert_eq!(
            upper.sign("createsession", "20120927183145"),
            lower.sign("createsession", "20120927183145")
        );
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2012, 9, 27, 18, 31, 45).unwrap();
        assert_eq!(format_timestamp(at), "20120927183145");
    }

    #[test]
    fn test_session_payload() {
        let signer = Md5Signer::new(DEV_ID, AUTH_KEY);
        let [dev_id, signature, timestamp] = signer.session_payload("20120927183145");
        assert_eq!(dev_id, DEV_ID);
        assert_eq!(signature, "8f53249be0922c94720834771ad43f0f");
        assert_eq!(timestamp, "20120927183145");
    }
}
