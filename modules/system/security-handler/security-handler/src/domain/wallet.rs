//! Caller-owned store of credentials acquired from AAMs.

use std::collections::{BTreeMap, HashMap};

use aam_security::{Aam, HomeCredentials, Token};

/// Everything held towards one AAM: the account's key material and home
/// token, plus FOREIGN tokens obtained with that home token.
#[derive(Debug, Clone)]
pub struct BoundCredentials {
    pub aam: Aam,
    pub home_credentials: HomeCredentials,
    /// FOREIGN tokens by issuing AAM instance id.
    pub foreign_tokens: BTreeMap<String, Token>,
}

impl BoundCredentials {
    #[must_use]
    pub fn new(aam: Aam, home_credentials: HomeCredentials) -> Self {
        Self {
            aam,
            home_credentials,
            foreign_tokens: BTreeMap::new(),
        }
    }
}

/// Credentials by home AAM instance id.
#[derive(Debug, Default)]
pub struct CredentialsWallet {
    credentials: HashMap<String, BoundCredentials>,
}

impl CredentialsWallet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, aam_instance_id: &str) -> Option<&BoundCredentials> {
        self.credentials.get(aam_instance_id)
    }

    pub fn get_mut(&mut self, aam_instance_id: &str) -> Option<&mut BoundCredentials> {
        self.credentials.get_mut(aam_instance_id)
    }

    /// Store `bound` under its AAM id, returning what it replaces.
    pub fn insert(&mut self, bound: BoundCredentials) -> Option<BoundCredentials> {
        self.credentials
            .insert(bound.aam.aam_instance_id.clone(), bound)
    }

    pub fn remove(&mut self, aam_instance_id: &str) -> Option<BoundCredentials> {
        self.credentials.remove(aam_instance_id)
    }

    #[must_use]
    pub fn home_token(&self, aam_instance_id: &str) -> Option<&Token> {
        self.get(aam_instance_id)
            .and_then(|bound| bound.home_credentials.home_token())
    }

    /// Forget every cached token. Keys and certificates stay, so a later
    /// login needs no new certificate.
    pub fn clear_cached_tokens(&mut self) {
        for bound in self.credentials.values_mut() {
            bound.home_credentials.clear_home_token();
            bound.foreign_tokens.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
