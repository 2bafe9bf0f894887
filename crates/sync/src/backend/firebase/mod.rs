//! Hosted backend over the Identity Toolkit and Firestore REST APIs.
//!
//! # Limitations
//!
//! - ID tokens are not refreshed while running. Once the token expires (one
//!   hour) document calls fail with [`BackendError::Unauthenticated`] until
//!   the next run restores the saved sign-in through the refresh token.
//! - Live updates are polled: [`DocumentStore::watch`] re-reads the document
//!   every `watch_interval` and emits when its `updateTime` changes.
//! - Updates are a read-modify-write guarded by the document's `updateTime`,
//!   not a server-side array union. When two writers patch the same record at
//!   once (two quick adds from different tabs, say), the slower one fails
//!   with [`BackendError::Conflict`] and the visitor sees an error
//!   notification; retrying the action succeeds.

mod wire;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use url::Url;
use viva_mais_core::{DocumentPath, FavoritesPatch, FavoritesRecord, VisitorId};

use self::wire::{
    CustomTokenRequest, Document, DocumentWrite, ErrorBody, ErrorResponse, LookupRequest,
    LookupResponse, RefreshRequest, RefreshResponse, SignUpRequest, TokenResponse,
};
use super::{
    AuthUser, BackendError, DocumentStore, DocumentWatch, IdentityProvider, StoredCredential,
};
use crate::config::ProviderConfig;
use crate::task::OwnedTask;

struct Inner {
    client: reqwest::Client,
    config: ProviderConfig,
    watch_interval: Duration,
    auth: watch::Sender<Option<AuthUser>>,
    tokens: Mutex<Option<Tokens>>,
}

struct Tokens {
    id_token: SecretString,
    refresh_token: Option<SecretString>,
}

/// Identity provider and document store backed by Firebase.
#[derive(Clone)]
pub struct FirebaseBackend {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FirebaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseBackend")
            .field("config", &self.inner.config)
            .field("watch_interval", &self.inner.watch_interval)
            .finish_non_exhaustive()
    }
}

impl FirebaseBackend {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or an endpoint is not
    /// a valid base URL.
    pub fn new(config: ProviderConfig, watch_interval: Duration) -> Result<Self, BackendError> {
        // Fail early on unusable endpoints rather than on first use.
        identity_url(&config.identity_endpoint, "signUp", "")?;
        token_url(&config.token_endpoint, "")?;
        firestore_base(&config.firestore_endpoint)?;

        let client = reqwest::Client::builder().build()?;
        let (auth, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                config,
                watch_interval,
                auth,
                tokens: Mutex::new(None),
            }),
        })
    }

    fn bearer(&self) -> Result<String, BackendError> {
        let tokens = self
            .inner
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tokens
            .as_ref()
            .map(|t| format!("Bearer {}", t.id_token.expose_secret()))
            .ok_or(BackendError::Unauthenticated)
    }

    fn signed_in(
        &self,
        user: AuthUser,
        id_token: String,
        refresh_token: Option<String>,
    ) -> AuthUser {
        *self
            .inner
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Tokens {
            id_token: SecretString::from(id_token),
            refresh_token: refresh_token.map(SecretString::from),
        });
        self.inner.auth.send_replace(Some(user.clone()));
        user
    }

    async fn call_identity<B, R>(&self, method: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = identity_url(
            &self.inner.config.identity_endpoint,
            method,
            self.inner.config.api_key.expose_secret(),
        )?;
        self.post_json(url, body).await
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.inner.client.post(url).json(body).send().await?;
        let response = check(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Read the raw document. A missing document is `Ok(None)`.
    async fn fetch(&self, path: &DocumentPath) -> Result<Option<Document>, BackendError> {
        let url = document_url(
            &self.inner.config.firestore_endpoint,
            &self.inner.config.project_id,
            path,
        )?;
        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document = check(response)
            .await?
            .json::<Document>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(Some(document))
    }

    /// Replace the `experiences` field, optionally only if the stored
    /// document still has `update_time`.
    async fn write(
        &self,
        path: &DocumentPath,
        record: &FavoritesRecord,
        update_time: Option<&str>,
    ) -> Result<(), BackendError> {
        let url = write_url(
            &self.inner.config.firestore_endpoint,
            &self.inner.config.project_id,
            path,
            update_time,
        )?;
        let response = self
            .inner
            .client
            .patch(url)
            .header(AUTHORIZATION, self.bearer()?)
            .json(&DocumentWrite::from(record))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseBackend {
    #[instrument(skip_all)]
    async fn sign_in_anonymously(&self) -> Result<AuthUser, BackendError> {
        let response: TokenResponse = self
            .call_identity(
                "signUp",
                &SignUpRequest {
                    return_secure_token: true,
                },
            )
            .await?;
        let local_id = response
            .local_id
            .ok_or_else(|| BackendError::Parse("signUp response without localId".to_string()))?;
        let uid = parse_uid(&local_id)?;
        info!(uid = %uid, "Signed in anonymously");
        Ok(self.signed_in(
            AuthUser {
                uid,
                anonymous: true,
            },
            response.id_token,
            response.refresh_token,
        ))
    }

    #[instrument(skip_all)]
    async fn sign_in_with_custom_token(
        &self,
        token: &SecretString,
    ) -> Result<AuthUser, BackendError> {
        let response: TokenResponse = self
            .call_identity(
                "signInWithCustomToken",
                &CustomTokenRequest {
                    token: token.expose_secret(),
                    return_secure_token: true,
                },
            )
            .await?;

        // The custom-token response carries no user id; ask for it.
        let lookup: LookupResponse = self
            .call_identity(
                "lookup",
                &LookupRequest {
                    id_token: &response.id_token,
                },
            )
            .await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse("lookup returned no users".to_string()))?;
        let uid = parse_uid(&user.local_id)?;
        info!(uid = %uid, "Signed in with custom token");
        Ok(self.signed_in(
            AuthUser {
                uid,
                anonymous: false,
            },
            response.id_token,
            response.refresh_token,
        ))
    }

    #[instrument(skip_all, fields(uid = %credential.uid))]
    async fn restore(&self, credential: &StoredCredential) -> Result<AuthUser, BackendError> {
        let url = token_url(
            &self.inner.config.token_endpoint,
            self.inner.config.api_key.expose_secret(),
        )?;
        let response: RefreshResponse = self
            .post_json(
                url,
                &RefreshRequest {
                    grant_type: "refresh_token",
                    refresh_token: credential.refresh_token.expose_secret(),
                },
            )
            .await?;

        let uid = parse_uid(&response.user_id)?;
        if uid != credential.uid {
            warn!(returned = %uid, "Refresh token belongs to another user");
            return Err(BackendError::Unauthenticated);
        }
        info!("Restored saved sign-in");
        Ok(self.signed_in(
            AuthUser {
                uid,
                anonymous: credential.anonymous,
            },
            response.id_token,
            Some(response.refresh_token),
        ))
    }

    fn credential(&self) -> Option<StoredCredential> {
        let user = self.current_user()?;
        let tokens = self
            .inner
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let refresh_token = tokens.as_ref()?.refresh_token.clone()?;
        Some(StoredCredential {
            uid: user.uid,
            anonymous: user.anonymous,
            refresh_token,
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.inner
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.auth.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.inner.auth.borrow().clone()
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.inner.auth.subscribe()
    }
}

#[async_trait]
impl DocumentStore for FirebaseBackend {
    async fn get(&self, path: &DocumentPath) -> Result<Option<FavoritesRecord>, BackendError> {
        Ok(self.fetch(path).await?.map(Document::into_record))
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn update(
        &self,
        path: &DocumentPath,
        patch: &FavoritesPatch,
    ) -> Result<(), BackendError> {
        let document = self
            .fetch(path)
            .await?
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        let update_time = document.update_time.clone();
        let mut record = document.into_record();

        if !record.apply(patch) {
            debug!("Patch leaves document unchanged");
            return Ok(());
        }

        self.write(path, &record, update_time.as_deref()).await
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn create(
        &self,
        path: &DocumentPath,
        record: &FavoritesRecord,
    ) -> Result<(), BackendError> {
        self.write(path, record, None).await
    }

    async fn watch(&self, path: &DocumentPath) -> Result<DocumentWatch, BackendError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = self.clone();
        let path = path.clone();
        let interval = self.inner.watch_interval;

        let producer = OwnedTask::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // `None` until the first snapshot has been delivered.
            let mut last_version: Option<Option<String>> = None;
            let mut failing = false;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let event = match backend.fetch(&path).await {
                    Ok(document) => {
                        failing = false;
                        let version = document.as_ref().and_then(|d| d.update_time.clone());
                        if last_version.as_ref() == Some(&version) {
                            continue;
                        }
                        last_version = Some(version);
                        Ok(document.map(Document::into_record))
                    }
                    // Report a failing poll once, not on every tick.
                    Err(e) if failing => {
                        debug!(path = %path, error = %e, "Document poll still failing");
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Document poll failed");
                        failing = true;
                        Err(e)
                    }
                };

                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(DocumentWatch::with_producer(rx, producer))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_uid(raw: &str) -> Result<VisitorId, BackendError> {
    VisitorId::parse(raw).map_err(|e| BackendError::Parse(format!("invalid user id: {e}")))
}

fn identity_url(endpoint: &str, method: &str, api_key: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(&format!(
        "{}/accounts:{method}",
        endpoint.trim_end_matches('/')
    ))
    .map_err(|e| BackendError::Parse(format!("invalid identity endpoint: {e}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

fn token_url(endpoint: &str, api_key: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(&format!("{}/token", endpoint.trim_end_matches('/')))
        .map_err(|e| BackendError::Parse(format!("invalid token endpoint: {e}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

fn firestore_base(endpoint: &str) -> Result<Url, BackendError> {
    let url = Url::parse(endpoint)
        .map_err(|e| BackendError::Parse(format!("invalid firestore endpoint: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(BackendError::Parse(format!(
            "invalid firestore endpoint: {endpoint}"
        )));
    }
    Ok(url)
}

fn document_url(
    endpoint: &str,
    project_id: &str,
    path: &DocumentPath,
) -> Result<Url, BackendError> {
    let mut url = firestore_base(endpoint)?;
    url.path_segments_mut()
        .map_err(|()| BackendError::Parse(format!("invalid firestore endpoint: {endpoint}")))?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", "(default)", "documents"])
        .extend(path.segments());
    Ok(url)
}

fn write_url(
    endpoint: &str,
    project_id: &str,
    path: &DocumentPath,
    update_time: Option<&str>,
) -> Result<Url, BackendError> {
    let mut url = document_url(endpoint, project_id, path)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("updateMask.fieldPaths", "experiences");
        if let Some(update_time) = update_time {
            query.append_pair("currentDocument.updateTime", update_time);
        }
    }
    Ok(url)
}

/// Pass successful responses through and turn the rest into errors.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorResponse>(&text)
        .ok()
        .map(|e| e.error);
    Err(classify(status.as_u16(), body, text))
}

fn classify(status: u16, body: Option<ErrorBody>, raw: String) -> BackendError {
    if status == 401 {
        return BackendError::Unauthenticated;
    }
    let Some(body) = body else {
        return BackendError::Api {
            status,
            message: raw,
        };
    };

    let unauthenticated = matches!(
        body.message.split(':').next().map(str::trim),
        Some("INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "INVALID_CUSTOM_TOKEN" | "USER_NOT_FOUND")
    );

    match body.status.as_deref() {
        _ if unauthenticated => BackendError::Unauthenticated,
        Some("UNAUTHENTICATED") => BackendError::Unauthenticated,
        Some("NOT_FOUND") => BackendError::NotFound(body.message),
        Some("FAILED_PRECONDITION" | "ABORTED") => BackendError::Conflict(body.message),
        _ => BackendError::Api {
            status,
            message: body.message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn path() -> DocumentPath {
        DocumentPath::favorites("vivamais", &VisitorId::parse("u1").unwrap())
    }

    fn config() -> ProviderConfig {
        ProviderConfig::parse(&SecretString::from(
            r#"{"apiKey":"test-key","projectId":"viva-mais"}"#,
        ))
        .unwrap()
    }

    #[test]
    fn test_identity_url() {
        let url = identity_url(
            "https://identitytoolkit.googleapis.com/v1/",
            "signInWithCustomToken",
            "k&y",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signInWithCustomToken?key=k%26y"
        );
    }

    #[test]
    fn test_document_url() {
        let expected = "https://firestore.googleapis.com/v1/projects/viva-mais/databases/(default)/documents/artifacts/vivamais/users/u1/data/favorites";
        for endpoint in [
            "https://firestore.googleapis.com/v1",
            "https://firestore.googleapis.com/v1/",
        ] {
            let url = document_url(endpoint, "viva-mais", &path()).unwrap();
            assert_eq!(url.as_str(), expected);
        }
    }

    #[test]
    fn test_write_url_with_precondition() {
        let url = write_url(
            "http://localhost:8080/v1",
            "demo",
            &path(),
            Some("2025-05-02T10:00:00.000000Z"),
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("updateMask.fieldPaths".to_string(), "experiences".to_string()),
                (
                    "currentDocument.updateTime".to_string(),
                    "2025-05-02T10:00:00.000000Z".to_string()
                ),
            ]
        );

        let create = write_url("http://localhost:8080/v1", "demo", &path(), None).unwrap();
        assert_eq!(create.query(), Some("updateMask.fieldPaths=experiences"));
    }

    #[test]
    fn test_classify_errors() {
        let body = |message: &str, status: Option<&str>| {
            Some(ErrorBody {
                message: message.to_string(),
                status: status.map(str::to_string),
            })
        };

        assert!(matches!(
            classify(400, body("mismatch", Some("FAILED_PRECONDITION")), String::new()),
            BackendError::Conflict(_)
        ));
        assert!(classify(404, body("no doc", Some("NOT_FOUND")), String::new()).is_not_found());
        assert!(matches!(
            classify(400, body("INVALID_CUSTOM_TOKEN : bad", None), String::new()),
            BackendError::Unauthenticated
        ));
        assert!(matches!(
            classify(401, None, String::new()),
            BackendError::Unauthenticated
        ));
        assert!(matches!(
            classify(502, None, "Bad Gateway".to_string()),
            BackendError::Api { status: 502, .. }
        ));
        assert!(matches!(
            classify(500, body("boom", Some("INTERNAL")), String::new()),
            BackendError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_rejects_unusable_endpoint() {
        let mut config = config();
        config.firestore_endpoint = "mailto:nobody".to_string();
        assert!(FirebaseBackend::new(config, Duration::from_secs(2)).is_err());
    }

    #[tokio::test]
    async fn test_document_calls_require_sign_in() {
        let backend = FirebaseBackend::new(config(), Duration::from_secs(2)).unwrap();
        assert!(backend.current_user().is_none());
        let result = backend.get(&path()).await;
        assert!(matches!(result, Err(BackendError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_sign_out_is_local() {
        let backend = FirebaseBackend::new(config(), Duration::from_secs(2)).unwrap();
        let rx = backend.auth_state();
        backend.signed_in(
            AuthUser {
                uid: VisitorId::parse("u1").unwrap(),
                anonymous: true,
            },
            "tok".to_string(),
            Some("refresh".to_string()),
        );
        assert!(rx.borrow().is_some());
        assert!(backend.bearer().is_ok());
        let credential = backend.credential().unwrap();
        assert_eq!(credential.refresh_token.expose_secret(), "refresh");
        assert!(credential.anonymous);

        backend.sign_out().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(matches!(backend.bearer(), Err(BackendError::Unauthenticated)));
        assert!(backend.credential().is_none());
    }

    #[test]
    fn test_token_url() {
        let url = token_url("https://securetoken.googleapis.com/v1/", "k").unwrap();
        assert_eq!(url.as_str(), "https://securetoken.googleapis.com/v1/token?key=k");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = FirebaseBackend::new(config(), Duration::from_secs(2)).unwrap();
        assert!(!format!("{backend:?}").contains("test-key"));
    }
}
