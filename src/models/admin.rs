use crate::{
    config::Config,
    database::{get_db, insert_error},
};
use actix_service::{self, Transform};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    Error, HttpMessage,
};
use chrono::Utc;
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use jsonwebtoken::{self, decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    Collection, Database,
};
use pwhash::bcrypt;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, rc::Rc, str::FromStr, sync::OnceLock};

use super::role::AdminRole;

const ISSUER: &str = "Fixit Lanka";
const AUDIENCE: &str = "fixit-lanka-admin";
const ACCESS_TTL: i64 = 86400;
const REFRESH_TTL: i64 = 86400 * 30;
const ADMIN_DOMAIN: &str = "@rda.gov.lk";
const BOOTSTRAP_CLAIM: &str = "owner";

static KEYS: OnceLock<TokenKeys> = OnceLock::new();

pub struct TokenKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct AdminClaims {
    aud: String,
    exp: i64,
    iss: String,
    sub: String,
    kind: TokenKind,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Admin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: AdminRole,
    pub seen_at: Option<DateTime>,
    pub cleared_at: Option<DateTime>,
    pub created_at: DateTime,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminCredential {
    pub email: String,
    pub password: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<AdminRole>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminRefreshRequest {
    pub rtk: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminResponse {
    pub _id: String,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub title: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminTokenResponse {
    pub atk: String,
    pub rtk: String,
    pub admin: AdminResponse,
}
#[derive(Debug)]
pub struct AdminAuthenticationData {
    pub _id: ObjectId,
    pub role: AdminRole,
}
pub struct AdminAuthenticationMiddleware<S> {
    service: Rc<S>,
}
pub struct AdminAuthenticationMiddlewareFactory;

pub type AdminAuthentication = Rc<AdminAuthenticationData>;

pub fn is_rda_email(email: &str) -> bool {
    let email = email.trim().to_lowercase();
    email.ends_with(ADMIN_DOMAIN) && email.len() > ADMIN_DOMAIN.len()
}

fn bootstrap_claim(time: DateTime) -> Document {
    doc! { "_id": BOOTSTRAP_CLAIM, "claimed_at": time }
}

impl Admin {
    pub async fn save(&mut self) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Admin> = db.collection::<Admin>("admins");

        self._id = Some(ObjectId::new());
        self.password = bcrypt::hash(&self.password).map_err(|_| "HASHING_FAILED".to_string())?;

        collection
            .insert_one(&*self, None)
            .await
            .map_err(|error| insert_error(&error, "ADMIN_ALREADY_EXIST"))?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| "INSERTING_FAILED".to_string())
    }
    pub async fn count() -> Result<u64, String> {
        let db: Database = get_db()?;
        let collection: Collection<Admin> = db.collection::<Admin>("admins");

        collection
            .count_documents(doc! {}, None)
            .await
            .map_err(|_| "ADMIN_COUNT_FAILED".to_string())
    }
    /// Only one request may create the first Owner. The claim is keyed on `_id`
    /// so a concurrent second insert fails.
    pub async fn claim_bootstrap() -> Result<(), String> {
        let db: Database = get_db()?;
        let collection: Collection<Document> = db.collection::<Document>("bootstrap");

        collection
            .insert_one(bootstrap_claim(DateTime::now()), None)
            .await
            .map_err(|error| insert_error(&error, "BOOTSTRAP_ALREADY_EXIST"))
            .map(|_| ())
    }
    pub async fn release_bootstrap() -> Result<(), String> {
        let db: Database = get_db()?;
        let collection: Collection<Document> = db.collection::<Document>("bootstrap");

        collection
            .delete_one(doc! { "_id": BOOTSTRAP_CLAIM }, None)
            .await
            .map_err(|_| "BOOTSTRAP_RELEASE_FAILED".to_string())
            .map(|_| ())
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Admin>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Admin> = db.collection::<Admin>("admins");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| "ADMIN_NOT_FOUND".to_string())
    }
    pub async fn find_by_email(email: &str) -> Result<Option<Admin>, String> {
        let db: Database = get_db()?;
        let collection: Collection<Admin> = db.collection::<Admin>("admins");

        collection
            .find_one(doc! { "email": email.trim().to_lowercase() }, None)
            .await
            .map_err(|_| "ADMIN_NOT_FOUND".to_string())
    }
    pub async fn update_seen_at(_id: &ObjectId, time: DateTime) -> Result<ObjectId, String> {
        Self::set_marker(_id, "seen_at", time).await
    }
    pub async fn update_cleared_at(_id: &ObjectId, time: DateTime) -> Result<ObjectId, String> {
        Self::set_marker(_id, "cleared_at", time).await
    }
    async fn set_marker(_id: &ObjectId, field: &str, time: DateTime) -> Result<ObjectId, String> {
        let db: Database = get_db()?;
        let collection: Collection<Admin> = db.collection::<Admin>("admins");

        collection
            .update_one(doc! { "_id": _id }, doc! { "$set": { field: time } }, None)
            .await
            .map_err(|_| "UPDATE_FAILED".to_string())
            .map(|_| *_id)
    }
    pub fn to_response(&self) -> Result<AdminResponse, String> {
        Ok(AdminResponse {
            _id: self
                ._id
                .ok_or_else(|| "ADMIN_NOT_FOUND".to_string())?
                .to_hex(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            title: self.role.title().to_string(),
        })
    }
}

impl AdminCredential {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            return Err("MISSING_CREDENTIALS".to_string());
        }
        if !is_rda_email(&self.email) {
            return Err("UNAUTHORIZED_EMAIL".to_string());
        }
        Ok(())
    }
    pub async fn authenticate(&self) -> Result<AdminTokenResponse, String> {
        self.validate()?;

        let admin = match Admin::find_by_email(&self.email).await? {
            Some(admin) => admin,
            None => return Err("INVALID_COMBINATION".to_string()),
        };
        if !bcrypt::verify(&self.password, &admin.password) {
            return Err("INVALID_COMBINATION".to_string());
        }

        let _id = admin._id.ok_or_else(|| "INVALID_COMBINATION".to_string())?;
        let (atk, rtk) = Self::issue(&_id)?;

        Ok(AdminTokenResponse {
            atk,
            rtk,
            admin: admin.to_response()?,
        })
    }
    pub async fn refresh(rtk: &str) -> Result<AdminTokenResponse, String> {
        let _id = Self::verify_kind(rtk, TokenKind::Refresh)
            .ok_or_else(|| "INVALID_REFRESH_TOKEN".to_string())?;
        let admin = Admin::find_by_id(&_id)
            .await?
            .ok_or_else(|| "INVALID_REFRESH_TOKEN".to_string())?;
        let (atk, rtk) = Self::issue(&_id)?;

        Ok(AdminTokenResponse {
            atk,
            rtk,
            admin: admin.to_response()?,
        })
    }
    pub fn issue(_id: &ObjectId) -> Result<(String, String), String> {
        let atk = Self::sign(_id, TokenKind::Access, ACCESS_TTL)?;
        let rtk = Self::sign(_id, TokenKind::Refresh, REFRESH_TTL)?;
        Ok((atk, rtk))
    }
    fn sign(_id: &ObjectId, kind: TokenKind, ttl: i64) -> Result<String, String> {
        let keys = KEYS.get().ok_or_else(|| "KEYS_NOT_LOADED".to_string())?;
        let claims: AdminClaims = AdminClaims {
            sub: _id.to_hex(),
            exp: Utc::now().timestamp() + ttl,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            kind,
        };

        encode(&Header::new(keys.algorithm), &claims, &keys.encoding)
            .map_err(|_| "GENERATING_FAILED".to_string())
    }
    pub fn verify(token: &str) -> Option<ObjectId> {
        Self::verify_kind(token, TokenKind::Access)
    }
    fn verify_kind(token: &str, kind: TokenKind) -> Option<ObjectId> {
        let keys = KEYS.get()?;
        let mut validation: Validation = Validation::new(keys.algorithm);
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[ISSUER]);

        let data = decode::<AdminClaims>(token, &keys.decoding, &validation).ok()?;
        if data.claims.kind != kind {
            return None;
        }
        ObjectId::from_str(&data.claims.sub).ok()
    }
}

impl<S, B> Service<ServiceRequest> for AdminAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv: Rc<S> = self.service.clone();

        async move {
            let token: Option<String> = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|value| value.trim().to_string());

            if let Some(_id) = token.as_deref().and_then(AdminCredential::verify) {
                match Admin::find_by_id(&_id).await {
                    Ok(Some(admin)) => {
                        let auth_data: AdminAuthenticationData = AdminAuthenticationData {
                            _id,
                            role: admin.role,
                        };
                        req.extensions_mut()
                            .insert::<AdminAuthentication>(Rc::new(auth_data));
                    }
                    Ok(None) => tracing::warn!(admin = %_id, "token for unknown admin"),
                    Err(error) => tracing::error!(%error, "admin lookup failed"),
                }
            }
            let res: ServiceResponse<B> = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}
impl<S, B> Transform<S, ServiceRequest> for AdminAuthenticationMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthenticationMiddleware {
            service: Rc::new(service),
        }))
    }
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        TokenKeys {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
    pub fn from_rsa_files(keys_dir: &str) -> Result<Self, String> {
        let private_access = read_to_string(format!("{keys_dir}/private_access.key"))
            .map_err(|_| "LOAD_FAILED_PRIVATE_ACCESS".to_string())?;
        let public_access = read_to_string(format!("{keys_dir}/public_access.pem"))
            .map_err(|_| "LOAD_FAILED_PUBLIC_ACCESS".to_string())?;

        Ok(TokenKeys {
            algorithm: Algorithm::RS256,
            encoding: EncodingKey::from_rsa_pem(private_access.as_bytes())
                .map_err(|_| "INVALID_PRIVATE_ACCESS".to_string())?,
            decoding: DecodingKey::from_rsa_pem(public_access.as_bytes())
                .map_err(|_| "INVALID_PUBLIC_ACCESS".to_string())?,
        })
    }
}

pub fn load_keys(config: &Config) -> Result<(), String> {
    let keys = match &config.jwt_secret {
        Some(secret) => TokenKeys::from_secret(secret),
        None => TokenKeys::from_rsa_files(&config.keys_dir)?,
    };
    install_keys(keys)
}

pub fn install_keys(keys: TokenKeys) -> Result<(), String> {
    KEYS.set(keys).map_err(|_| "KEYS_ALREADY_LOADED".to_string())
}

#[cfg(test)]
pub(crate) fn install_test_keys() {
    let _ = install_keys(TokenKeys::from_secret("fixit-lanka-test-secret"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_rda_addresses() {
        assert!(is_rda_email("officer@rda.gov.lk"));
        assert!(is_rda_email("  officer@rda.gov.lk "));
        assert!(!is_rda_email("officer@gmail.com"));
        assert!(!is_rda_email("@rda.gov.lk"));
    }

    #[test]
    fn bootstrap_claims_share_one_key() {
        let first = bootstrap_claim(DateTime::from_millis(1_000));
        let second = bootstrap_claim(DateTime::from_millis(2_000));

        assert_eq!(first.get_str("_id").unwrap(), BOOTSTRAP_CLAIM);
        assert_eq!(first.get("_id"), second.get("_id"));
    }

    #[test]
    fn rda_domain_check_ignores_case() {
        assert!(is_rda_email("Officer@RDA.GOV.LK"));
        assert!(is_rda_email("officer@Rda.Gov.Lk"));
        assert!(!is_rda_email("officer@RDA.GOV.LK.example.com"));
    }

    #[test]
    fn credential_validation_reports_first_problem() {
        let missing = AdminCredential {
            email: "officer@rda.gov.lk".to_string(),
            password: "   ".to_string(),
        };
        assert_eq!(missing.validate(), Err("MISSING_CREDENTIALS".to_string()));

        let outsider = AdminCredential {
            email: "someone@example.com".to_string(),
            password: "password".to_string(),
        };
        assert_eq!(outsider.validate(), Err("UNAUTHORIZED_EMAIL".to_string()));
    }

    #[test]
    fn access_and_refresh_tokens_are_not_interchangeable() {
        install_test_keys();
        let _id = ObjectId::new();
        let (atk, rtk) = AdminCredential::issue(&_id).unwrap();

        assert_eq!(AdminCredential::verify(&atk), Some(_id));
        assert_eq!(AdminCredential::verify(&rtk), None);
        assert_eq!(AdminCredential::verify_kind(&rtk, TokenKind::Refresh), Some(_id));
        assert_eq!(AdminCredential::verify("not-a-token"), None);
    }
}
