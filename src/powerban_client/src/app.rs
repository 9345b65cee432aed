use crate::backend::Backend;
use crate::config::ClientConf;
use crate::draw::{Clock, CountdownTask, DrawSynchronizer, SystemClock};
use crate::error::{AddressError, StorageError, TicketError};
use crate::identity::IdentityStore;
use crate::notify::Notifications;
use crate::purchase::{PurchaseCoordinator, PurchaseOutcome};
use crate::storage::{KeyValueStore, SettingsMemory, StableStore};
use crate::tickets::TicketSet;
use crate::types::*;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Everything the presentation layer renders, captured at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewState {
    pub drafts: Vec<DraftTicket>,
    pub purchased: Vec<PurchasedTicket>,
    pub total_cost: u64,
    pub deposit_address: Option<String>,
    pub generating_address: bool,
    pub payout_address: String,
    pub suggested_payout_address: Option<String>,
    pub purchasing: bool,
    pub can_purchase: bool,
    pub time_left: String,
    pub draw_phase: DrawPhase,
    pub current_draw: Option<CurrentDraw>,
    pub previous_draw: Option<PreviousDraw>,
}

/// Wires the ticket set, identity store, draw synchronizer and purchase
/// coordinator together and forwards user commands to them.
pub struct PowerBan<S, B, C = SystemClock> {
    conf: ClientConf,
    tickets: Rc<RefCell<TicketSet>>,
    identity: Rc<IdentityStore<S, B>>,
    draw: Rc<DrawSynchronizer<B, C>>,
    purchase: PurchaseCoordinator<S, B>,
    notices: Rc<Notifications>,
    countdown: RefCell<Option<CountdownTask>>,
}

impl<S, B, C> PowerBan<S, B, C>
where
    S: KeyValueStore,
    B: Backend + 'static,
    C: Clock + 'static,
{
    pub fn new(conf: ClientConf, storage: S, backend: B, clock: C) -> Self {
        PowerBan::with_tickets(conf, storage, backend, clock, TicketSet::new())
    }

    pub fn with_tickets(conf: ClientConf, storage: S, backend: B, clock: C, tickets: TicketSet) -> Self {
        let backend = Rc::new(backend);
        let notices = Rc::new(Notifications::default());
        let tickets = Rc::new(RefCell::new(tickets));
        let identity = Rc::new(IdentityStore::load(storage, backend.clone(), notices.clone()));
        let draw = Rc::new(DrawSynchronizer::new(&conf, backend.clone(), clock));
        let purchase = PurchaseCoordinator::new(
            tickets.clone(),
            identity.clone(),
            backend,
            notices.clone(),
        );

        PowerBan {
            conf,
            tickets,
            identity,
            draw,
            purchase,
            notices,
            countdown: RefCell::new(None),
        }
    }

    /// Initial load: identity then today's tickets, the draw snapshots, and
    /// the countdown loop. Must run inside a `tokio::task::LocalSet`.
    pub async fn mount(&self) {
        info!("mounting lottery client");
        self.start_countdown();

        let purchases = async {
            if self.identity.ensure_identity().await.is_some() {
                self.purchase.refresh_purchased_tickets().await;
            }
        };
        tokio::join!(purchases, self.draw.refresh_snapshots());
    }

    /// Stops the countdown loop.
    pub fn teardown(&self) {
        if let Some(task) = self.countdown.borrow_mut().take() {
            task.cancel();
        }
    }

    /// (Re)starts the countdown loop, cancelling any previous one first.
    pub fn start_countdown(&self) {
        let mut countdown = self.countdown.borrow_mut();
        if let Some(task) = countdown.take() {
            task.cancel();
        }
        *countdown = Some(CountdownTask::spawn(self.draw.clone()));
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown
            .borrow()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub async fn refresh_draws(&self) {
        self.draw.refresh_snapshots().await;
    }

    pub fn add_ticket(&self) -> TicketId {
        self.tickets.borrow_mut().add_ticket()
    }

    pub fn remove_ticket(&self, id: &TicketId) -> bool {
        self.tickets.borrow_mut().remove_ticket(id)
    }

    pub fn set_numbers(&self, id: &TicketId, numbers: &[u8]) -> Result<(), TicketError> {
        self.tickets.borrow_mut().set_numbers(id, numbers)
    }

    pub fn toggle_number(&self, id: &TicketId, number: u8) -> Result<bool, TicketError> {
        self.tickets.borrow_mut().toggle_number(id, number)
    }

    pub fn quick_pick(&self, id: &TicketId) -> Result<Vec<u8>, TicketError> {
        self.tickets.borrow_mut().quick_pick(id)
    }

    pub async fn generate_deposit_address(&self) -> Result<String, AddressError> {
        self.identity.generate_deposit_address().await
    }

    pub fn set_payout_address(&self, address: &str) -> Result<(), StorageError> {
        self.identity.set_payout_address(address)
    }

    /// Copies the remembered payout address into the live field.
    pub fn use_suggested_payout_address(&self) -> Result<bool, StorageError> {
        match self.identity.suggested_payout_address() {
            Some(address) => self.identity.set_payout_address(&address).map(|_| true),
            None => Ok(false),
        }
    }

    pub async fn purchase(&self) -> PurchaseOutcome {
        self.purchase.purchase().await
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn identity(&self) -> &IdentityStore<S, B> {
        &self.identity
    }

    pub fn draw(&self) -> &DrawSynchronizer<B, C> {
        &self.draw
    }

    pub fn purchases(&self) -> &PurchaseCoordinator<S, B> {
        &self.purchase
    }

    pub fn view(&self) -> ViewState {
        let tickets = self.tickets.borrow();
        ViewState {
            drafts: tickets.tickets().to_vec(),
            purchased: self.purchase.purchased_tickets(),
            total_cost: tickets.total_cost(self.conf.ticket_price),
            deposit_address: self.identity.deposit_address(),
            generating_address: self.identity.is_generating(),
            payout_address: self.identity.payout_address(),
            suggested_payout_address: self.identity.suggested_payout_address(),
            purchasing: self.purchase.is_purchasing(),
            can_purchase: self.purchase.can_purchase(),
            time_left: self.draw.time_left(),
            draw_phase: self.draw.phase(),
            current_draw: self.draw.current_draw(),
            previous_draw: self.draw.previous_draw(),
        }
    }
}

impl<B, C> PowerBan<StableStore<SettingsMemory>, B, C>
where
    B: Backend + 'static,
    C: Clock + 'static,
{
    /// Builds the client on the settings store named by `conf.storage_path`.
    pub fn open(conf: ClientConf, backend: B, clock: C) -> Result<Self, StorageError> {
        let storage = conf.open_store()?;
        Ok(PowerBan::new(conf, storage, backend, clock))
    }
}
