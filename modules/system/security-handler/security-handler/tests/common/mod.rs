#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

//! In-memory AAM federation: a core AAM and two platform AAMs sharing one
//! account registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use aam_security::clock::now_seconds;
use aam_security::constants::CORE_AAM_INSTANCE_ID;
use aam_security::crypto::{decode_public_key, generate_signing_key};
use aam_security::{
    Aam, Certificate, LoginRequest, Token, TokenIssuer, TokenRequest, TokenType, TokenValidator,
    ValidationStatus, VerifyingKey,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use security_handler_sdk::{AamClient, AamClientError, CertificateRequest, CredentialCertificates};

pub const CORE_ADDRESS: &str = "https://core.example";
pub const PLATFORM_A: &str = "platform-a";
pub const PLATFORM_A_ADDRESS: &str = "https://a.example";
pub const PLATFORM_B: &str = "platform-b";
pub const PLATFORM_B_ADDRESS: &str = "https://b.example";
pub const FEDERATION: &str = "fed-1";

const HOUR: Duration = Duration::from_secs(3600);

struct Account {
    password: String,
    attributes: BTreeMap<String, String>,
}

struct Platform {
    issuer: TokenIssuer,
    aam: Aam,
}

pub struct InMemoryFederation {
    platforms: BTreeMap<String, Platform>,
    accounts: HashMap<String, Account>,
    certified_keys: Mutex<HashMap<String, VerifyingKey>>,
    pub logins: AtomicUsize,
    pub validations: AtomicUsize,
    pub foreign_exchanges: AtomicUsize,
    pub issue_expired_home_tokens: AtomicBool,
}

impl InMemoryFederation {
    pub fn new() -> Arc<Self> {
        let platforms = [
            (CORE_AAM_INSTANCE_ID, CORE_ADDRESS),
            (PLATFORM_A, PLATFORM_A_ADDRESS),
            (PLATFORM_B, PLATFORM_B_ADDRESS),
        ]
        .into_iter()
        .map(|(id, address)| {
            let issuer = TokenIssuer::new(id, generate_signing_key()).unwrap();
            let certificate = Certificate::from_public_key(&issuer.verifying_key()).unwrap();
            let aam = Aam::new(id, address, certificate).with_friendly_name(id);
            (id.to_owned(), Platform { issuer, aam })
        })
        .collect();

        let accounts = HashMap::from([
            (
                "owner".to_owned(),
                Account {
                    password: "owner-pass".to_owned(),
                    attributes: BTreeMap::new(),
                },
            ),
            (
                "john".to_owned(),
                Account {
                    password: "john-pass".to_owned(),
                    attributes: BTreeMap::from([("name".to_owned(), "John".to_owned())]),
                },
            ),
        ]);

        Arc::new(Self {
            platforms,
            accounts,
            certified_keys: Mutex::new(HashMap::new()),
            logins: AtomicUsize::new(0),
            validations: AtomicUsize::new(0),
            foreign_exchanges: AtomicUsize::new(0),
            issue_expired_home_tokens: AtomicBool::new(false),
        })
    }

    pub fn aam(&self, id: &str) -> Aam {
        self.platforms[id].aam.clone()
    }

    pub fn issuer(&self, id: &str) -> &TokenIssuer {
        &self.platforms[id].issuer
    }

    fn platform_at(&self, address: &str) -> Result<&Platform, AamClientError> {
        self.platforms
            .values()
            .find(|p| p.aam.aam_address == address)
            .ok_or_else(|| AamClientError::communication(address, "connection refused"))
    }

    fn rejected(address: &str, message: &str) -> AamClientError {
        AamClientError::UnexpectedStatus {
            address: address.to_owned(),
            status: 401,
            message: message.to_owned(),
        }
    }
}

#[async_trait]
impl AamClient for InMemoryFederation {
    async fn available_aams(
        &self,
        aam_address: &str,
    ) -> Result<BTreeMap<String, Aam>, AamClientError> {
        self.platform_at(aam_address)?;
        Ok(self
            .platforms
            .iter()
            .map(|(id, p)| (id.clone(), p.aam.clone()))
            .collect())
    }

    async fn home_token(
        &self,
        aam_address: &str,
        login_request: &LoginRequest,
    ) -> Result<Token, AamClientError> {
        let platform = self.platform_at(aam_address)?;
        let login = Token::parse(login_request.as_str())?;
        let client_id = login.subject();
        let username = login.issuer();

        let certified = self.certified_keys.lock().get(client_id).copied();
        let Some(key) = certified else {
            return Err(Self::rejected(aam_address, "client is not certified"));
        };
        let status = TokenValidator::default()
            .validate(login.as_str(), Some(&key))
            .unwrap();
        if !status.is_valid() {
            return Err(Self::rejected(aam_address, "login request does not verify"));
        }
        let Some(account) = self.accounts.get(username) else {
            return Err(Self::rejected(aam_address, "unknown user"));
        };

        let request = account.attributes.iter().fold(
            TokenRequest::new(format!("{username}@{client_id}"), TokenType::Home, HOUR)
                .with_subject_key(key),
            |request, (name, value)| request.with_attribute(name, value),
        );
        let issued_at = if self.issue_expired_home_tokens.load(Ordering::SeqCst) {
            now_seconds() - 2 * 3600
        } else {
            now_seconds()
        };
        self.logins.fetch_add(1, Ordering::SeqCst);
        let raw = platform.issuer.issue_at(&request, issued_at).unwrap();
        Ok(Token::parse(&raw)?)
    }

    async fn foreign_token(
        &self,
        aam_address: &str,
        home_token: &Token,
        client_certificate: &Certificate,
        aam_certificate: &Certificate,
    ) -> Result<Token, AamClientError> {
        let platform = self.platform_at(aam_address)?;
        let home_key = aam_certificate.public_key().unwrap();
        let status = TokenValidator::default()
            .validate(home_token.as_str(), Some(&home_key))
            .unwrap();
        let subject_key = home_token
            .claims()
            .subject_public_key
            .as_deref()
            .map(|k| decode_public_key(k).unwrap());
        if !status.is_valid() || subject_key != client_certificate.public_key().ok() {
            return Err(Self::rejected(aam_address, "home token not accepted"));
        }
        self.foreign_exchanges.fetch_add(1, Ordering::SeqCst);
        let raw = platform
            .issuer
            .foreign_token(home_token, &[FEDERATION.to_owned()], HOUR)
            .unwrap();
        Ok(Token::parse(&raw)?)
    }

    async fn guest_token(&self, aam_address: &str) -> Result<Token, AamClientError> {
        let platform = self.platform_at(aam_address)?;
        Ok(Token::parse(&platform.issuer.guest_token(HOUR).unwrap())?)
    }

    async fn client_certificate(
        &self,
        aam_address: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, AamClientError> {
        self.platform_at(aam_address)?;
        let authorized = self
            .accounts
            .get(&request.username)
            .is_some_and(|a| a.password == request.password.expose_secret());
        if !authorized {
            return Err(Self::rejected(aam_address, "wrong username or password"));
        }
        let key = request.public_key.public_key().unwrap();
        self.certified_keys
            .lock()
            .insert(request.client_id.clone(), key);
        Ok(request.public_key.clone())
    }

    async fn component_certificate(
        &self,
        aam_address: &str,
        component_id: &str,
        platform_id: &str,
    ) -> Result<Certificate, AamClientError> {
        self.platform_at(aam_address)?;
        let combined = format!("{component_id}@{platform_id}");
        let key = self.certified_keys.lock().get(&combined).copied();
        key.map(|k| Certificate::from_public_key(&k).unwrap())
            .ok_or(AamClientError::NotFound(combined))
    }

    async fn validate_credentials(
        &self,
        aam_address: &str,
        token: &str,
        _certificates: &CredentialCertificates,
    ) -> Result<ValidationStatus, AamClientError> {
        self.platform_at(aam_address)?;
        self.validations.fetch_add(1, Ordering::SeqCst);
        let parsed = Token::parse(token)?;
        let Some(issuer) = self.platforms.get(parsed.issuer()) else {
            return Ok(ValidationStatus::InvalidTrustChain);
        };
        Ok(TokenValidator::default()
            .validate(token, Some(&issuer.issuer.verifying_key()))
            .unwrap_or(ValidationStatus::Unknown))
    }
}
