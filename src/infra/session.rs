//! Credential holder shared by the HTTP adapters.
//!
//! A [`Session`] is built once and passed into the clients that need it.
//! When a path is configured the credentials are mirrored to a JSON file so
//! they survive between CLI invocations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::InfraError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescriptor {
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserDescriptor>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserDescriptor) -> Self {
        self.user = Some(user);
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Session {
    credentials: RwLock<Option<Credentials>>,
    path: Option<PathBuf>,
}

impl Session {
    /// No credentials and no backing file.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// In-memory session with fixed credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
            path: None,
        }
    }

    /// Session mirrored to `path`. A missing file means signed out.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let credentials = match fs::read(&path) {
            Ok(bytes) => Some(serde_json::from_slice::<Credentials>(&bytes).map_err(|err| {
                InfraError::session(format!("failed to parse {}: {err}", path.display()))
            })?),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        debug!(
            path = %path.display(),
            signed_in = credentials.is_some(),
            "session loaded"
        );
        Ok(Self {
            credentials: RwLock::new(credentials),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn token(&self) -> Option<String> {
        self.read(|credentials| credentials.map(|c| c.token.clone()))
    }

    pub fn user(&self) -> Option<UserDescriptor> {
        self.read(|credentials| credentials.and_then(|c| c.user.clone()))
    }

    pub fn is_signed_in(&self) -> bool {
        self.read(|credentials| credentials.is_some())
    }

    /// Replace the credentials and persist them when file-backed.
    pub fn sign_in(&self, credentials: Credentials) -> Result<(), InfraError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_vec_pretty(&credentials)
                .map_err(|err| InfraError::session(format!("failed to encode session: {err}")))?;
            fs::write(path, body)?;
        }
        *self.write() = Some(credentials);
        info!("session credentials stored");
        Ok(())
    }

    /// Forget the credentials and remove the backing file.
    pub async fn clear(&self) -> Result<(), InfraError> {
        *self.write() = None;
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        info!("session credentials cleared");
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(Option<&Credentials>) -> R) -> R {
        let guard = self
            .credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(guard.as_ref())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Credentials>> {
        self.credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("secret-token").with_user(UserDescriptor {
            id: Some("u1".into()),
            email: "admin@example.com".into(),
            name: None,
        })
    }

    #[test]
    fn missing_file_means_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = Session::load(dir.path().join("session.json")).expect("load");
        assert!(!session.is_signed_in());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn sign_in_persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        let session = Session::load(&path).expect("load");
        session.sign_in(credentials()).expect("sign in");
        assert!(path.exists());

        let reloaded = Session::load(&path).expect("reload");
        assert_eq!(reloaded.token().as_deref(), Some("secret-token"));
        assert_eq!(
            reloaded.user().map(|user| user.email),
            Some("admin@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn clear_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let session = Session::load(&path).expect("load");
        session.sign_in(credentials()).expect("sign in");

        session.clear().await.expect("clear");
        assert!(!path.exists());
        assert!(!session.is_signed_in());
        session.clear().await.expect("clearing twice is fine");
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, b"not json").expect("write");
        assert!(matches!(
            Session::load(&path),
            Err(InfraError::Session { .. })
        ));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("secret-token"));
    }
}
