//! Secret types for protecting credentials from accidental logging.
//!
//! Database passwords and object-store secret keys are read from the
//! environment into [`SecretString`]. Its `Debug` implementation redacts the
//! value, so a config struct that derives `Debug` stays safe to log, and the
//! value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct MinioCredentials {
//!     access_key: String,
//!     secret_key: SecretString,
//! }
//!
//! let creds = MinioCredentials {
//!     access_key: "minio".to_string(),
//!     secret_key: SecretString::from("minio12345"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("minio12345"));
//! assert_eq!(creds.secret_key.expose_secret(), "minio12345");
//! ```
//!
//! Call `expose_secret()` only at the point where the value is handed to a
//! client library.

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("postgres");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("postgres"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("minio12345");
        assert_eq!(secret.expose_secret(), "minio12345");
    }

    #[test]
    fn test_struct_with_secret_is_safe() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct DatabaseCredentials {
            user: String,
            password: SecretString,
        }

        let creds = DatabaseCredentials {
            user: "mysql".to_string(),
            password: SecretString::from("super-secret"),
        };

        let debug_str = format!("{creds:?}");

        assert!(debug_str.contains("mysql"));
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn test_clone_works() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
