//! Static credentials and endpoint layout.

use std::fmt;

/// Upload path used when none is configured.
pub const DEFAULT_UPLOAD_PATH: &str = "/import_product.csv";

/// Default Microsoft identity platform host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Microsoft Graph host.
pub const DEFAULT_GRAPH_HOST: &str = "https://graph.microsoft.com";

/// Client credentials of the app registration plus the target drive path.
///
/// Read once at startup and shared read-only afterwards. `Debug` output
/// never includes the client secret.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    /// Drive-relative path of the uploaded file, always starting with `/`
    pub upload_path: String,
}

impl CredentialSet {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        upload_path: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            upload_path: normalize_upload_path(&upload_path.into()),
        }
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("upload_path", &self.upload_path)
            .finish()
    }
}

/// Where tokens are requested and files are uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEndpoints {
    pub authority_host: String,
    pub graph_host: String,
    /// Upload into this user's drive instead of `/me`
    pub drive_user: Option<String>,
}

impl Default for GraphEndpoints {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_host: DEFAULT_GRAPH_HOST.to_string(),
            drive_user: None,
        }
    }
}

impl GraphEndpoints {
    /// Tenant-scoped OAuth 2.0 v2 token endpoint.
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }

    /// Default scope of the Graph resource.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.graph_host.trim_end_matches('/'))
    }

    /// Content endpoint of the drive item at `upload_path`.
    pub fn upload_url(&self, upload_path: &str) -> String {
        let drive = match &self.drive_user {
            Some(user) => format!("users/{user}"),
            None => "me".to_string(),
        };
        format!(
            "{}/v1.0/{}/drive/root:{}:/content",
            self.graph_host.trim_end_matches('/'),
            drive,
            normalize_upload_path(upload_path)
        )
    }
}

fn normalize_upload_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
