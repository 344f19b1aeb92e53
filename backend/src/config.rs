//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use tracing::warn;

/// Default maximum photo size (5 MiB)
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Record store configuration
    pub storage: StorageConfig,
    /// Object store (image hosting) configuration
    pub object_store: ObjectStoreConfig,
    /// Registration policy
    pub registration: RegistrationConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Record store configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: String,
}

/// Object store configuration
#[derive(Clone)]
pub struct ObjectStoreConfig {
    /// Upload API base URL (without the cloud name)
    pub api_base_url: String,
    /// Account (cloud) name
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret used to sign uploads
    pub api_secret: String,
    /// Folder uploads are placed in
    pub folder: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Digest the account expects for upload signatures
    pub signature_algorithm: SignatureAlgorithm,
}

/// Upload signature digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// SHA-1, the upload API's default
    #[default]
    Sha1,
    /// SHA-256, for accounts switched to it
    Sha256,
}

impl SignatureAlgorithm {
    /// Parse from a config string
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Some(SignatureAlgorithm::Sha1),
            "sha256" | "sha-256" => Some(SignatureAlgorithm::Sha256),
            _ => None,
        }
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("timeout_secs", &self.timeout_secs)
            .field("signature_algorithm", &self.signature_algorithm)
            .finish()
    }
}

/// How the QR code reference is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrDelivery {
    /// Embed the image as a `data:` URI
    Inline,
    /// Upload the image to the object store and keep its URL
    Upload,
}

impl QrDelivery {
    /// Parse from a config string
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(QrDelivery::Inline),
            "upload" => Some(QrDelivery::Upload),
            _ => None,
        }
    }
}

/// Registration policy
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Base URL of the public lookup page; lookup URLs are `{base}/usuario/{key}`
    pub public_base_url: String,
    /// Whether callers must supply a natural key
    pub require_natural_key: bool,
    /// Whether a photo is mandatory
    pub require_photo: bool,
    /// Maximum accepted photo size in bytes
    pub max_photo_bytes: usize,
    /// QR code delivery mode
    pub qr_delivery: QrDelivery,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
            require_natural_key: true,
            require_photo: false,
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
            qr_delivery: QrDelivery::Inline,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an enum-valued variable, warning when the value is not recognised
fn env_choice<T: Copy + std::fmt::Debug>(
    name: &str,
    parse: fn(&str) -> Option<T>,
    default: T,
) -> T {
    match env::var(name) {
        Ok(value) => parse(&value).unwrap_or_else(|| {
            warn!(
                "Unrecognised value {:?} for {}, using {:?}",
                value, name, default
            );
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = RegistrationConfig::default();
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| {
            if let Some(home) = env::var_os("HOME") {
                format!("{}/.person-registry", home.to_string_lossy())
            } else {
                ".person-registry".to_string()
            }
        });

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5001),
                host: env_or("HOST", "0.0.0.0"),
            },
            storage: StorageConfig {
                database_path: env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| format!("{}/registry.db", data_dir)),
            },
            object_store: ObjectStoreConfig {
                api_base_url: env_or("CLOUDINARY_API_BASE_URL", "https://api.cloudinary.com/v1_1"),
                cloud_name: env_or("CLOUDINARY_CLOUD_NAME", ""),
                api_key: env_or("CLOUDINARY_API_KEY", ""),
                api_secret: env_or("CLOUDINARY_API_SECRET", ""),
                folder: env_or("CLOUDINARY_FOLDER", "carnaval"),
                timeout_secs: env::var("UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(30),
                signature_algorithm: env_choice(
                    "CLOUDINARY_SIGNATURE_ALGORITHM",
                    SignatureAlgorithm::parse,
                    SignatureAlgorithm::default(),
                ),
            },
            registration: RegistrationConfig {
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or(defaults.public_base_url),
                require_natural_key: env::var("REQUIRE_NATURAL_KEY")
                    .ok()
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(defaults.require_natural_key),
                require_photo: env::var("REQUIRE_PHOTO")
                    .ok()
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(defaults.require_photo),
                max_photo_bytes: env::var("MAX_PHOTO_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_photo_bytes),
                qr_delivery: env_choice("QR_DELIVERY", QrDelivery::parse, defaults.qr_delivery),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "HOST",
        "DATABASE_PATH",
        "DATA_DIR",
        "PUBLIC_BASE_URL",
        "REQUIRE_NATURAL_KEY",
        "REQUIRE_PHOTO",
        "MAX_PHOTO_BYTES",
        "QR_DELIVERY",
        "CLOUDINARY_API_SECRET",
        "CLOUDINARY_SIGNATURE_ALGORITHM",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();

        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server_addr(), "0.0.0.0:5001");
        assert!(config.storage.database_path.ends_with("registry.db"));
        assert_eq!(config.registration.public_base_url, "http://localhost:3000");
        assert!(config.registration.require_natural_key);
        assert!(!config.registration.require_photo);
        assert_eq!(config.registration.max_photo_bytes, DEFAULT_MAX_PHOTO_BYTES);
        assert_eq!(config.registration.qr_delivery, QrDelivery::Inline);
        assert_eq!(config.object_store.folder, "carnaval");
        assert_eq!(
            config.object_store.signature_algorithm,
            SignatureAlgorithm::Sha1
        );
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("PORT", "8088");
        env::set_var("DATABASE_PATH", "/tmp/people.db");
        env::set_var("REQUIRE_PHOTO", "yes");
        env::set_var("REQUIRE_NATURAL_KEY", "false");
        env::set_var("QR_DELIVERY", "Upload");
        env::set_var("MAX_PHOTO_BYTES", "1024");
        env::set_var("CLOUDINARY_SIGNATURE_ALGORITHM", "SHA256");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.storage.database_path, "/tmp/people.db");
        assert!(config.registration.require_photo);
        assert!(!config.registration.require_natural_key);
        assert_eq!(config.registration.qr_delivery, QrDelivery::Upload);
        assert_eq!(config.registration.max_photo_bytes, 1024);
        assert_eq!(
            config.object_store.signature_algorithm,
            SignatureAlgorithm::Sha256
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        env::set_var("REQUIRE_PHOTO", "maybe");
        env::set_var("QR_DELIVERY", "uplaod");
        env::set_var("CLOUDINARY_SIGNATURE_ALGORITHM", "md5");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, 5001);
        assert!(!config.registration.require_photo);
        assert_eq!(config.registration.qr_delivery, QrDelivery::Inline);
        assert_eq!(
            config.object_store.signature_algorithm,
            SignatureAlgorithm::Sha1
        );
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!(QrDelivery::parse(" Upload "), Some(QrDelivery::Upload));
        assert_eq!(QrDelivery::parse("inline"), Some(QrDelivery::Inline));
        assert_eq!(QrDelivery::parse("uplaod"), None);
        assert_eq!(
            SignatureAlgorithm::parse("sha-256"),
            Some(SignatureAlgorithm::Sha256)
        );
        assert_eq!(SignatureAlgorithm::parse("sha1"), Some(SignatureAlgorithm::Sha1));
        assert_eq!(SignatureAlgorithm::parse("md5"), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ObjectStoreConfig {
            api_base_url: "https://api.example".to_string(),
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "super-secret".to_string(),
            folder: String::new(),
            timeout_secs: 1,
            signature_algorithm: SignatureAlgorithm::Sha1,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
