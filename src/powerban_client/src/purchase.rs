use crate::backend::Backend;
use crate::identity::IdentityStore;
use crate::notify::Notifications;
use crate::storage::KeyValueStore;
use crate::tickets::TicketSet;
use crate::types::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

const GENERIC_FAILURE: &str = "Purchase failed";

/// First unmet condition that keeps a purchase from being submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockReason {
    PurchaseInFlight,
    MissingIdentity,
    NoTickets,
    IncompleteTicket(TicketId),
    MissingPayoutAddress,
    MissingDepositAddress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Nothing was sent.
    Blocked(BlockReason),
    Purchased { count: usize },
    Failed { reason: String },
}

// clears the in-flight flag even if the purchase future is dropped mid-request
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Gates and submits the batch purchase of every draft ticket.
pub struct PurchaseCoordinator<S, B> {
    tickets: Rc<RefCell<TicketSet>>,
    identity: Rc<IdentityStore<S, B>>,
    backend: Rc<B>,
    notices: Rc<Notifications>,
    purchasing: Cell<bool>,
    purchased: RefCell<Vec<PurchasedTicket>>,
}

impl<S: KeyValueStore, B: Backend> PurchaseCoordinator<S, B> {
    pub fn new(
        tickets: Rc<RefCell<TicketSet>>,
        identity: Rc<IdentityStore<S, B>>,
        backend: Rc<B>,
        notices: Rc<Notifications>,
    ) -> Self {
        PurchaseCoordinator {
            tickets,
            identity,
            backend,
            notices,
            purchasing: Cell::new(false),
            purchased: RefCell::new(Vec::new()),
        }
    }

    pub fn is_purchasing(&self) -> bool {
        self.purchasing.get()
    }

    pub fn purchased_tickets(&self) -> Vec<PurchasedTicket> {
        self.purchased.borrow().clone()
    }

    pub fn readiness(&self) -> Result<(), BlockReason> {
        if self.purchasing.get() {
            return Err(BlockReason::PurchaseInFlight);
        }
        if self.identity.user_id().is_none() {
            return Err(BlockReason::MissingIdentity);
        }

        let tickets = self.tickets.borrow();
        if tickets.is_empty() {
            return Err(BlockReason::NoTickets);
        }
        if let Some(ticket) = tickets.tickets().iter().find(|t| !t.is_complete()) {
            return Err(BlockReason::IncompleteTicket(ticket.id.clone()));
        }

        if self.identity.payout_address().is_empty() {
            return Err(BlockReason::MissingPayoutAddress);
        }
        if self.identity.deposit_address().is_none() {
            return Err(BlockReason::MissingDepositAddress);
        }
        Ok(())
    }

    pub fn can_purchase(&self) -> bool {
        self.readiness().is_ok()
    }

    /// Submits all drafts as one order. Success clears the drafts; failure
    /// keeps them for a retry.
    pub async fn purchase(&self) -> PurchaseOutcome {
        if let Err(reason) = self.readiness() {
            debug!(?reason, "purchase blocked");
            return PurchaseOutcome::Blocked(reason);
        }
        let Some(user_id) = self.identity.user_id() else {
            return PurchaseOutcome::Blocked(BlockReason::MissingIdentity);
        };

        let order = PurchaseOrder {
            user_id,
            tickets: self.tickets.borrow().payload(),
            win_address: self.identity.payout_address(),
        };

        self.purchasing.set(true);
        let _in_flight = InFlight(&self.purchasing);
        info!(user = %order.user_id, tickets = order.tickets.len(), "submitting purchase");

        match self.backend.purchase_tickets(&order).await {
            Ok(confirmed) => {
                self.tickets.borrow_mut().clear();
                let count = confirmed.len();
                self.notices
                    .success(format!("Successfully purchased {count} ticket(s)!"));

                if !self.refresh_purchased_tickets().await {
                    // keep the view consistent with what was just confirmed
                    let mut purchased = self.purchased.borrow_mut();
                    let mut sets: Vec<Vec<u8>> =
                        purchased.iter().map(|ticket| ticket.numbers.clone()).collect();
                    sets.extend(confirmed);
                    *purchased = PurchasedTicket::from_number_sets(sets);
                }
                PurchaseOutcome::Purchased { count }
            }
            Err(e) => {
                let reason = e.reason().unwrap_or(GENERIC_FAILURE).to_string();
                error!(error = %e, "purchase failed");
                self.notices.error(reason.clone());
                PurchaseOutcome::Failed { reason }
            }
        }
    }

    /// Replaces the purchased-ticket view with the backend's list for today.
    pub async fn refresh_purchased_tickets(&self) -> bool {
        let Some(user_id) = self.identity.user_id() else {
            return false;
        };

        match self.backend.today_tickets(&user_id).await {
            Ok(sets) => {
                *self.purchased.borrow_mut() = PurchasedTicket::from_number_sets(sets);
                true
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "could not load today's tickets");
                self.notices.error("Could not load today's purchased tickets");
                false
            }
        }
    }
}
