//! Request and response bodies of the Identity Toolkit and Firestore REST
//! APIs, and the mapping between Firestore documents and favorites records.
//!
//! A favorites document is stored as
//!
//! ```json
//! {"fields": {"experiences": {"arrayValue": {"values": [{"stringValue": "exp1"}]}}}}
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;
use viva_mais_core::{ExperienceId, FavoriteSet, FavoritesRecord};

// =============================================================================
// Identity Toolkit
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTokenRequest<'a> {
    pub token: &'a str,
    pub return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest<'a> {
    pub id_token: &'a str,
}

/// Response of `accounts:signUp`. Custom-token sign-in returns the same
/// shape without `localId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub local_id: Option<String>,
}

/// Secure Token exchange of a refresh token. Unlike the Identity Toolkit
/// this API uses snake case.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupUser {
    pub local_id: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Error envelope shared by both APIs.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    /// Canonical status such as `FAILED_PRECONDITION`. Identity Toolkit
    /// errors omit it.
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Firestore
// =============================================================================

/// A Firestore document as returned by `GET` or `PATCH`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub update_time: Option<String>,
}

/// Document body sent with `PATCH`.
#[derive(Debug, Serialize)]
pub struct DocumentWrite {
    pub fields: Fields,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Fields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiences: Option<ArrayField>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayField {
    pub array_value: ArrayValue,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    // Firestore omits `values` for an empty array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

/// A single typed value. Only strings are meaningful in a favorites array.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

impl Document {
    /// Decode into a favorites record. Entries that are not strings or not
    /// valid experience ids are skipped.
    #[must_use]
    pub fn into_record(self) -> FavoritesRecord {
        let experiences = self
            .fields
            .experiences
            .map(|field| field.array_value.values)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| {
                let raw = value.string_value?;
                match ExperienceId::parse(&raw) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(value = %raw, error = %e, "Skipping invalid favorite entry");
                        None
                    }
                }
            })
            .collect::<FavoriteSet>();
        FavoritesRecord { experiences }
    }
}

impl From<&FavoritesRecord> for DocumentWrite {
    fn from(record: &FavoritesRecord) -> Self {
        let values = record
            .experiences
            .iter()
            .map(|id| Value {
                string_value: Some(id.to_string()),
            })
            .collect();
        Self {
            fields: Fields {
                experiences: Some(ArrayField {
                    array_value: ArrayValue { values },
                }),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn exp(s: &str) -> ExperienceId {
        ExperienceId::parse(s).unwrap()
    }

    #[test]
    fn test_decode_document() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/artifacts/a/users/u/data/favorites",
            "fields": {
                "experiences": {
                    "arrayValue": {
                        "values": [{"stringValue": "exp2"}, {"stringValue": "exp1"}]
                    }
                }
            },
            "createTime": "2025-05-01T10:00:00.000000Z",
            "updateTime": "2025-05-02T10:00:00.000000Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(
            doc.update_time.as_deref(),
            Some("2025-05-02T10:00:00.000000Z")
        );
        let record = doc.into_record();
        assert_eq!(record.experiences.len(), 2);
        assert!(record.experiences.contains(&exp("exp1")));
    }

    #[test]
    fn test_decode_missing_and_empty_fields() {
        let empty_array: Document =
            serde_json::from_str(r#"{"fields":{"experiences":{"arrayValue":{}}}}"#).unwrap();
        assert!(empty_array.into_record().experiences.is_empty());

        let no_fields: Document = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(no_fields.into_record().experiences.is_empty());
    }

    #[test]
    fn test_decode_skips_foreign_values() {
        let json = r#"{"fields":{"experiences":{"arrayValue":{"values":[
            {"integerValue": "3"},
            {"stringValue": "not valid!"},
            {"stringValue": "exp3"}
        ]}}}}"#;
        let record = serde_json::from_str::<Document>(json).unwrap().into_record();
        assert_eq!(record.experiences.iter().collect::<Vec<_>>(), vec![&exp("exp3")]);
    }

    #[test]
    fn test_encode_record() {
        let record: FavoritesRecord = FavoritesRecord {
            experiences: [exp("exp1"), exp("exp2")].into_iter().collect(),
        };
        let value = serde_json::to_value(DocumentWrite::from(&record)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "fields": {
                    "experiences": {
                        "arrayValue": {
                            "values": [{"stringValue": "exp1"}, {"stringValue": "exp2"}]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_encode_empty_record() {
        let value = serde_json::to_value(DocumentWrite::from(&FavoritesRecord::default())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"fields": {"experiences": {"arrayValue": {}}}})
        );
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"error":{"code":400,"message":"the stored version does not match","status":"FAILED_PRECONDITION"}}"#;
        let err: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(err.error.status.as_deref(), Some("FAILED_PRECONDITION"));

        let identity: ErrorResponse =
            serde_json::from_str(r#"{"error":{"code":400,"message":"INVALID_CUSTOM_TOKEN"}}"#)
                .unwrap();
        assert!(identity.error.status.is_none());
        assert_eq!(identity.error.message, "INVALID_CUSTOM_TOKEN");
    }

    #[test]
    fn test_refresh_bodies() {
        let request = serde_json::to_value(RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: "r1",
        })
        .unwrap();
        assert_eq!(
            request,
            serde_json::json!({"grant_type": "refresh_token", "refresh_token": "r1"})
        );

        let response: RefreshResponse = serde_json::from_str(
            r#"{"id_token":"i2","refresh_token":"r2","user_id":"u1","expires_in":"3600","token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(response.user_id, "u1");
        assert_eq!(response.refresh_token, "r2");

        let sign_up: TokenResponse = serde_json::from_str(
            r#"{"idToken":"i1","refreshToken":"r1","localId":"u1","expiresIn":"3600"}"#,
        )
        .unwrap();
        assert_eq!(sign_up.refresh_token.as_deref(), Some("r1"));
    }
}
