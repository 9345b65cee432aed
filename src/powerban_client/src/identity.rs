use crate::backend::Backend;
use crate::error::{AddressError, StorageError};
use crate::notify::Notifications;
use crate::storage::{KeyValueStore, DEPOSIT_ADDRESS_KEY, USER_ID_KEY, WIN_ADDRESS_KEY};
use crate::types::UserId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{error, info, warn};

/// A remembered payout address is only offered back once it looks like a full address.
const MIN_SUGGESTED_ADDRESS_LEN: usize = 20;

/// Player identity, deposit address and payout address, loaded from storage
/// at construction and written back on every change.
pub struct IdentityStore<S, B> {
    storage: RefCell<S>,
    backend: Rc<B>,
    notices: Rc<Notifications>,
    user_id: RefCell<Option<UserId>>,
    deposit_address: RefCell<Option<String>>,
    payout_address: RefCell<String>,
    previous_payout_address: Option<String>,
    identity_pending: Cell<bool>,
    generating: Cell<bool>,
}

impl<S: KeyValueStore, B: Backend> IdentityStore<S, B> {
    pub fn load(storage: S, backend: Rc<B>, notices: Rc<Notifications>) -> Self {
        let user_id = storage.get(USER_ID_KEY).map(UserId::new);
        let deposit_address = storage.get(DEPOSIT_ADDRESS_KEY);
        let previous_payout_address = storage.get(WIN_ADDRESS_KEY);

        IdentityStore {
            storage: RefCell::new(storage),
            backend,
            notices,
            user_id: RefCell::new(user_id),
            deposit_address: RefCell::new(deposit_address),
            payout_address: RefCell::new(String::new()),
            previous_payout_address,
            identity_pending: Cell::new(false),
            generating: Cell::new(false),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.borrow().clone()
    }

    /// Makes sure a player identity exists, asking the backend only when none
    /// is stored. Failures are logged and leave the store without an identity.
    pub async fn ensure_identity(&self) -> Option<UserId> {
        if let Some(user_id) = self.user_id() {
            return Some(user_id);
        }
        if self.identity_pending.replace(true) {
            return None;
        }

        let result = self.backend.create_player().await;
        self.identity_pending.set(false);

        match result {
            Ok(user_id) => {
                if let Err(e) = self.storage.borrow_mut().set(USER_ID_KEY, user_id.as_str()) {
                    error!(error = %e, "failed to persist user id");
                }
                info!(user = %user_id, "player identity issued");
                *self.user_id.borrow_mut() = Some(user_id.clone());
                Some(user_id)
            }
            Err(e) => {
                warn!(error = %e, "could not obtain a player identity");
                None
            }
        }
    }

    /// The deposit address remembered in storage, if any. Never hits the backend.
    pub fn recall_deposit_address(&self) -> Option<String> {
        let stored = self.storage.borrow().get(DEPOSIT_ADDRESS_KEY);
        if stored.is_some() {
            *self.deposit_address.borrow_mut() = stored.clone();
        }
        stored
    }

    pub fn deposit_address(&self) -> Option<String> {
        self.deposit_address.borrow().clone()
    }

    /// True while a deposit address request is outstanding.
    pub fn is_generating(&self) -> bool {
        self.generating.get()
    }

    /// Requests a fresh deposit address and remembers it. A failed request
    /// keeps whatever address was there before.
    pub async fn generate_deposit_address(&self) -> Result<String, AddressError> {
        let Some(user_id) = self.user_id() else {
            error!("cannot request a deposit address without a user id");
            return Err(AddressError::MissingIdentity);
        };
        if self.generating.replace(true) {
            return Err(AddressError::InFlight);
        }

        let result = self.backend.create_deposit_address(&user_id).await;
        self.generating.set(false);

        match result {
            Ok(address) => {
                if let Err(e) = self.storage.borrow_mut().set(DEPOSIT_ADDRESS_KEY, &address) {
                    error!(error = %e, "failed to persist deposit address");
                }
                *self.deposit_address.borrow_mut() = Some(address.clone());
                self.notices.success("Successfully generated deposit address");
                Ok(address)
            }
            Err(e) => {
                error!(user = %user_id, error = %e, "deposit address request failed");
                self.notices
                    .error("Could not generate deposit address. Please try again.");
                Err(AddressError::Backend(e))
            }
        }
    }

    /// The payout address remembered from an earlier session.
    pub fn recall_payout_address(&self) -> Option<String> {
        self.storage.borrow().get(WIN_ADDRESS_KEY)
    }

    pub fn payout_address(&self) -> String {
        self.payout_address.borrow().clone()
    }

    /// Updates the live payout address and writes it through. Clearing the
    /// field keeps the remembered address for the next session.
    pub fn set_payout_address(&self, address: &str) -> Result<(), StorageError> {
        *self.payout_address.borrow_mut() = address.to_string();
        if address.is_empty() {
            return Ok(());
        }
        self.storage.borrow_mut().set(WIN_ADDRESS_KEY, address)
    }

    /// The payout address from an earlier session, when worth offering as a default.
    pub fn suggested_payout_address(&self) -> Option<String> {
        self.previous_payout_address
            .clone()
            .filter(|address| address.len() > MIN_SUGGESTED_ADDRESS_LEN)
    }
}
