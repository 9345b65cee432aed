use std::fmt;

/// Numbers a ticket must hold before it can be purchased.
pub const NUMBERS_PER_TICKET: usize = 5;
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 35;

pub type Salt = [u8; 32];

/// Milliseconds since the unix epoch.
pub type Timestamp = i64;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        TicketId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque player token issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DraftTicket {
    pub id: TicketId,
    pub numbers: Vec<u8>,
}

impl DraftTicket {
    pub fn is_complete(&self) -> bool {
        self.numbers.len() == NUMBERS_PER_TICKET
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurchasedTicket {
    pub id: TicketId,
    pub numbers: Vec<u8>,
}

impl PurchasedTicket {
    /// Projects the backend's number-sets, in order, onto `today-{index}` ids.
    pub fn from_number_sets(sets: Vec<Vec<u8>>) -> Vec<PurchasedTicket> {
        sets.into_iter()
            .enumerate()
            .map(|(index, numbers)| PurchasedTicket {
                id: TicketId(format!("today-{index}")),
                numbers,
            })
            .collect()
    }
}

/// Body of a batch purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub user_id: UserId,
    pub tickets: Vec<Vec<u8>>,
    pub win_address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDraw {
    pub draw_date: String,
    #[serde(default)]
    pub jackpot: f64,
    #[serde(default)]
    pub tickets_bought: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerCounts {
    #[serde(default)]
    pub winners: u32,
    #[serde(default)]
    pub match4: u32,
    #[serde(default)]
    pub match3: u32,
    #[serde(default)]
    pub match2: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousDraw {
    pub draw_date: String,
    #[serde(default)]
    pub winning_numbers: Vec<u8>,
    #[serde(default)]
    pub jackpot: f64,
    #[serde(default)]
    pub winners: WinnerCounts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DrawPhase {
    /// No boundary known yet.
    Syncing,
    CountingDown { boundary: Timestamp },
    /// The boundary passed; waiting for the backend to schedule the next draw.
    Drawing,
}

/// Time left until a draw boundary, truncated to whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Negative input clamps to zero.
    pub fn from_millis(remaining: i64) -> Self {
        let remaining = remaining.max(0);
        Countdown {
            hours: remaining / 3_600_000,
            minutes: (remaining % 3_600_000) / 60_000,
            seconds: (remaining % 60_000) / 1_000,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}
