use crate::sessions::SessionConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the session secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public base URL used when building share/invite links
    /// (e.g. `https://proofs.example.com`). Links are relative without it.
    pub public_base_url: Option<String>,
    /// Branding name used in outbound email subjects.
    pub company_name: String,
    /// Whether the customer portal (logins, invites, resets) is enabled.
    pub customer_portal_enabled: bool,
    /// Whether proofs owned by a customer stay reachable through their bare
    /// share link (with a sign-in banner) when the portal is enabled.
    pub legacy_links_enabled: bool,
    /// Failed logins per IP before lockout.
    pub login_max_attempts: usize,
    /// Sliding lockout window in seconds.
    pub login_attempt_window_secs: u64,
    /// Customer invite token validity in hours.
    pub invite_expiry_hours: i64,
    /// Default guest access grant validity in hours.
    pub guest_expiry_hours: i64,
    /// Session cookie signing configuration.
    pub session: SessionConfig,
    /// Proof file storage backend selection.
    pub storage: StorageConfig,
}

/// Default guest access validity: 7 days.
const DEFAULT_GUEST_EXPIRY_HOURS: i64 = 168;

/// Default invite token validity: 3 days.
const DEFAULT_INVITE_EXPIRY_HOURS: i64 = 72;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `PUBLIC_BASE_URL`              | --                      |
    /// | `COMPANY_NAME`                 | `Proof Approval System` |
    /// | `CUSTOMER_LOGIN_ENABLED`       | `false`                 |
    /// | `LEGACY_PUBLIC_LINKS_ENABLED`  | `true`                  |
    /// | `LOGIN_MAX_ATTEMPTS`           | `5`                     |
    /// | `LOGIN_ATTEMPT_WINDOW`         | `300`                   |
    /// | `CUSTOMER_INVITE_EXPIRY_HOURS` | `72`                    |
    /// | `GUEST_ACCESS_EXPIRY_HOURS`    | `168`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let login_max_attempts: usize = std::env::var("LOGIN_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("LOGIN_MAX_ATTEMPTS must be a valid usize");

        let login_attempt_window_secs: u64 = std::env::var("LOGIN_ATTEMPT_WINDOW")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("LOGIN_ATTEMPT_WINDOW must be a valid u64");

        let invite_expiry_hours: i64 = std::env::var("CUSTOMER_INVITE_EXPIRY_HOURS")
            .unwrap_or_else(|_| DEFAULT_INVITE_EXPIRY_HOURS.to_string())
            .parse()
            .expect("CUSTOMER_INVITE_EXPIRY_HOURS must be a valid i64");

        let guest_expiry_hours: i64 = std::env::var("GUEST_ACCESS_EXPIRY_HOURS")
            .unwrap_or_else(|_| DEFAULT_GUEST_EXPIRY_HOURS.to_string())
            .parse()
            .expect("GUEST_ACCESS_EXPIRY_HOURS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url: std::env::var("PUBLIC_BASE_URL").ok(),
            company_name: std::env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "Proof Approval System".into()),
            customer_portal_enabled: env_flag("CUSTOMER_LOGIN_ENABLED", false),
            legacy_links_enabled: env_flag("LEGACY_PUBLIC_LINKS_ENABLED", true),
            login_max_attempts,
            login_attempt_window_secs,
            invite_expiry_hours,
            guest_expiry_hours,
            session: SessionConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }

    /// Absolute (or relative, without a public base URL) link to a proof.
    pub fn share_url(&self, share_id: &str) -> String {
        self.absolute_path(&format!("/proof/{share_id}"))
    }

    /// Absolute invite-acceptance link for a raw token.
    pub fn invite_url(&self, raw_token: &str) -> String {
        self.absolute_path(&format!("/customer/invite/{raw_token}"))
    }

    /// Absolute reset link for a raw token.
    pub fn reset_url(&self, raw_token: &str) -> String {
        self.absolute_path(&format!("/customer/reset/{raw_token}"))
    }

    /// Absolute guest access link for an access token.
    pub fn guest_url(&self, access_token: &str) -> String {
        self.absolute_path(&format!("/customer/guest/{access_token}"))
    }

    fn absolute_path(&self, path: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}{path}", base.trim_end_matches('/')),
            None => path.to_string(),
        }
    }
}

/// Proof file storage backend selection and credentials.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        /// Directory that holds uploaded proof files.
        root: String,
        /// Optional externally served base URL for the root directory.
        public_base_url: Option<String>,
    },
    S3 {
        bucket: String,
        region: Option<String>,
        /// Key prefix inside the bucket.
        base_path: Option<String>,
        /// Custom endpoint for S3-compatible object stores.
        endpoint_url: Option<String>,
        /// Optional CDN/public base URL instead of presigned links.
        public_base_url: Option<String>,
    },
}

impl StorageConfig {
    /// Load backend selection from environment variables.
    ///
    /// | Env Var                | Default    |
    /// |------------------------|------------|
    /// | `FILE_STORAGE_BACKEND` | `local`    |
    /// | `FILE_STORAGE_ROOT`    | `./proofs` |
    /// | `FILE_BASE_URL`        | --         |
    /// | `AWS_S3_BUCKET`        | --         |
    /// | `AWS_S3_REGION`        | --         |
    /// | `AWS_S3_BASE_PATH`     | --         |
    /// | `AWS_S3_ENDPOINT_URL`  | --         |
    ///
    /// # Panics
    ///
    /// Panics when `FILE_STORAGE_BACKEND=s3` and `AWS_S3_BUCKET` is unset --
    /// misconfiguration should fail at startup, not at first upload.
    pub fn from_env() -> Self {
        let backend = std::env::var("FILE_STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .trim()
            .to_lowercase();
        match backend.as_str() {
            "s3" => Self::S3 {
                bucket: std::env::var("AWS_S3_BUCKET")
                    .expect("AWS_S3_BUCKET must be set for the s3 storage backend"),
                region: std::env::var("AWS_S3_REGION").ok(),
                base_path: std::env::var("AWS_S3_BASE_PATH").ok(),
                endpoint_url: std::env::var("AWS_S3_ENDPOINT_URL").ok(),
                public_base_url: std::env::var("FILE_BASE_URL").ok(),
            },
            _ => Self::Local {
                root: std::env::var("FILE_STORAGE_ROOT").unwrap_or_else(|_| "./proofs".into()),
                public_base_url: std::env::var("FILE_BASE_URL").ok(),
            },
        }
    }
}

/// Parse a boolean environment flag the way operators actually write them.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}
