//! One-shot display of freshly issued credentials.
//!
//! `Idle -> Requesting -> Disclosed -> Idle`. The disclosed values live only
//! inside the [`Disclosure`] held by the state machine; closing it drops them
//! and there is no way back.

use std::fmt;
use std::time::{Duration, Instant};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// How long a field shows its "copied" acknowledgement.
pub const COPY_ACK: Duration = Duration::from_secs(2);

pub const CLIENT_SECRET: &str = "clientSecret";
pub const CLIENT_ID: &str = "clientId";
pub const PUBLIC_KEY: &str = "publicKey";
pub const PRIVATE_KEY: &str = "privateKey";

/// A credential value whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Issued by the backend.
    Issued,
    /// Generated locally after a failed rotation. Never valid against the API.
    Placeholder,
}

#[derive(Debug)]
pub struct DisclosedField {
    pub name: &'static str,
    value: Secret,
    copied_at: Option<Instant>,
}

impl DisclosedField {
    pub fn value(&self) -> &Secret {
        &self.value
    }
}

#[derive(Debug)]
pub struct Disclosure {
    pub client_id: String,
    pub provenance: Provenance,
    fields: Vec<DisclosedField>,
}

impl Disclosure {
    pub fn issued(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            provenance: Provenance::Issued,
            fields: Vec::new(),
        }
    }

    /// A locally generated stand-in secret, used when rotation fails and the
    /// dialog should still open. Marked [`Provenance::Placeholder`].
    pub fn placeholder(client_id: impl Into<String>) -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value = format!("placeholder-{}", hex::encode(bytes));

        Self {
            client_id: client_id.into(),
            provenance: Provenance::Placeholder,
            fields: Vec::new(),
        }
        .with_field(CLIENT_SECRET, Secret::new(value))
    }

    pub fn with_field(mut self, name: &'static str, value: Secret) -> Self {
        self.fields.push(DisclosedField {
            name,
            value,
            copied_at: None,
        });
        self
    }

    pub fn is_authoritative(&self) -> bool {
        self.provenance == Provenance::Issued
    }

    pub fn fields(&self) -> &[DisclosedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Secret> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Returns the value to place on the clipboard and starts that field's
    /// acknowledgement window. Other fields are unaffected.
    pub fn copy(&mut self, name: &str, now: Instant) -> Option<&str> {
        let field = self.fields.iter_mut().find(|f| f.name == name)?;
        field.copied_at = Some(now);
        Some(field.value.expose())
    }

    pub fn is_copied(&self, name: &str, now: Instant) -> bool {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.copied_at)
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_ACK)
    }
}

#[derive(Debug, Default)]
pub enum DisclosureState {
    #[default]
    Idle,
    Requesting,
    Disclosed(Disclosure),
}

#[derive(Debug, Default)]
pub struct SecretDisclosure {
    state: DisclosureState,
}

impl SecretDisclosure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DisclosureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DisclosureState::Idle)
    }

    /// The triggering control is disabled while this is true.
    pub fn is_requesting(&self) -> bool {
        matches!(self.state, DisclosureState::Requesting)
    }

    pub fn begin(&mut self) -> Result<(), PortalError> {
        match self.state {
            DisclosureState::Idle => {
                self.state = DisclosureState::Requesting;
                Ok(())
            }
            _ => Err(PortalError::DisclosureBusy),
        }
    }

    pub fn disclose(&mut self, disclosure: Disclosure) {
        self.state = DisclosureState::Disclosed(disclosure);
    }

    /// Abandons a request that produced nothing to show.
    pub fn fail(&mut self) {
        if self.is_requesting() {
            self.state = DisclosureState::Idle;
        }
    }

    pub fn current(&self) -> Option<&Disclosure> {
        match &self.state {
            DisclosureState::Disclosed(d) => Some(d),
            _ => None,
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut Disclosure> {
        match &mut self.state {
            DisclosureState::Disclosed(d) => Some(d),
            _ => None,
        }
    }

    /// Closes the dialog, discarding the disclosed values.
    pub fn close(&mut self) {
        self.state = DisclosureState::Idle;
    }
}
