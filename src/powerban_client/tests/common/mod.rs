#![allow(dead_code)]

use ic_stable_structures::DefaultMemoryImpl;
use powerban_client::*;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tokio::sync::oneshot;

pub const BASE: Timestamp = 1_735_689_600_000;
pub const DEPOSIT: &str = "ban_1depositaddressforplayerone";
pub const PAYOUT: &str = "ban_3payoutaddressforwinnings";

/// In-process backend whose replies are set by each test.
pub struct MockBackend {
    /// `None` makes identity requests fail.
    pub player_id: RefCell<Option<String>>,
    /// `None` makes deposit address requests fail.
    pub deposit_address: RefCell<Option<String>>,
    /// `None` confirms exactly what was ordered; `Err(reason)` rejects.
    pub purchase_reply: RefCell<Option<Result<Vec<Vec<u8>>, Option<String>>>>,
    /// When set, purchases wait for the sender before replying.
    pub purchase_gate: RefCell<Option<oneshot::Receiver<()>>>,
    /// When false, today's tickets cannot be fetched.
    pub today_available: Cell<bool>,
    pub confirmed: RefCell<Vec<Vec<u8>>>,
    /// Popped by each next-draw request; empty fails the request.
    pub boundaries: RefCell<VecDeque<Timestamp>>,
    /// `None` fails the request.
    pub current: RefCell<Option<Option<CurrentDraw>>>,
    pub previous: RefCell<Option<Option<PreviousDraw>>>,
    pub calls: RefCell<Vec<&'static str>>,
    pub orders: RefCell<Vec<PurchaseOrder>>,
}

impl MockBackend {
    pub fn new() -> Self {
        MockBackend {
            player_id: RefCell::new(Some("player-1".to_string())),
            deposit_address: RefCell::new(Some(DEPOSIT.to_string())),
            purchase_reply: RefCell::new(None),
            purchase_gate: RefCell::new(None),
            today_available: Cell::new(true),
            confirmed: RefCell::new(Vec::new()),
            boundaries: RefCell::new(VecDeque::new()),
            current: RefCell::new(Some(None)),
            previous: RefCell::new(Some(None)),
            calls: RefCell::new(Vec::new()),
            orders: RefCell::new(Vec::new()),
        }
    }

    pub fn push_boundary(&self, boundary: Timestamp) {
        self.boundaries.borrow_mut().push_back(boundary);
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|call| **call == name).count()
    }

    fn record(&self, name: &'static str) {
        self.calls.borrow_mut().push(name);
    }

    fn outage(endpoint: &'static str) -> BackendError {
        BackendError::Status { endpoint, status: 502 }
    }
}

impl Backend for MockBackend {
    async fn create_player(&self) -> Result<UserId, BackendError> {
        self.record("create_player");
        let id = self.player_id.borrow().clone();
        id.map(UserId::new).ok_or_else(|| Self::outage("player"))
    }

    async fn create_deposit_address(&self, _user: &UserId) -> Result<String, BackendError> {
        self.record("create_deposit_address");
        let address = self.deposit_address.borrow().clone();
        address.ok_or_else(|| Self::outage("deposit-address"))
    }

    async fn purchase_tickets(&self, order: &PurchaseOrder) -> Result<Vec<Vec<u8>>, BackendError> {
        self.record("purchase_tickets");
        self.orders.borrow_mut().push(order.clone());

        let gate = self.purchase_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let reply = self.purchase_reply.borrow().clone();
        match reply {
            None => {
                self.confirmed.borrow_mut().extend(order.tickets.clone());
                Ok(order.tickets.clone())
            }
            Some(Ok(tickets)) => {
                self.confirmed.borrow_mut().extend(tickets.clone());
                Ok(tickets)
            }
            Some(Err(Some(reason))) => Err(BackendError::Rejected(reason)),
            Some(Err(None)) => Err(BackendError::Transport(TransportError::Unreachable {
                url: "http://api.test/player/tickets/purchase".to_string(),
                reason: "connection reset".to_string(),
            })),
        }
    }

    async fn today_tickets(&self, _user: &UserId) -> Result<Vec<Vec<u8>>, BackendError> {
        self.record("today_tickets");
        if !self.today_available.get() {
            return Err(Self::outage("tickets"));
        }
        Ok(self.confirmed.borrow().clone())
    }

    async fn next_draw(&self) -> Result<Timestamp, BackendError> {
        self.record("next_draw");
        let next = self.boundaries.borrow_mut().pop_front();
        next.ok_or_else(|| Self::outage("next-draw"))
    }

    async fn current_draw(&self) -> Result<Option<CurrentDraw>, BackendError> {
        self.record("current_draw");
        let reply = self.current.borrow().clone();
        reply.ok_or_else(|| Self::outage("draw-today"))
    }

    async fn previous_draw(&self) -> Result<Option<PreviousDraw>, BackendError> {
        self.record("previous_draw");
        let reply = self.previous.borrow().clone();
        reply.ok_or_else(|| Self::outage("draw-previous"))
    }
}

/// Clock moved by hand.
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<Timestamp>>);

impl ManualClock {
    pub fn at(now: Timestamp) -> Self {
        ManualClock(Rc::new(Cell::new(now)))
    }

    pub fn advance(&self, millis: i64) {
        self.0.set(self.0.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}

/// Wall clock that follows tokio's (possibly paused) time from a fixed epoch.
pub struct TokioClock {
    epoch: Timestamp,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(epoch: Timestamp) -> Self {
        TokioClock {
            epoch,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.epoch + self.start.elapsed().as_millis() as Timestamp
    }
}

pub fn complete_ticket(app: &TestApp, numbers: &[u8]) -> TicketId {
    let id = app.add_ticket();
    app.set_numbers(&id, numbers).unwrap();
    id
}

pub type TestApp = PowerBan<StableStore<DefaultMemoryImpl>, Rc<MockBackend>, ManualClock>;

pub fn app(backend: Rc<MockBackend>, storage: StableStore<DefaultMemoryImpl>) -> TestApp {
    let conf = ClientConf {
        base_api_url: "http://api.test".to_string(),
        ..ClientConf::default()
    };
    PowerBan::with_tickets(conf, storage, backend, ManualClock::at(BASE), TicketSet::with_seed([3u8; 32]))
}
