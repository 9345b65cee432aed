use crate::error::TicketError;
use crate::types::*;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

const ID_LEN: usize = 9;
const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Draft tickets for the current session. Numbers are unique, within
/// `MIN_NUMBER..=MAX_NUMBER`, at most `NUMBERS_PER_TICKET`, ascending.
pub struct TicketSet {
    tickets: Vec<DraftTicket>,
    rng: ChaCha20Rng,
}

impl Default for TicketSet {
    fn default() -> Self {
        TicketSet::new()
    }
}

impl TicketSet {
    pub fn new() -> Self {
        TicketSet {
            tickets: Vec::new(),
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: Salt) -> Self {
        TicketSet {
            tickets: Vec::new(),
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    pub fn tickets(&self) -> &[DraftTicket] {
        &self.tickets
    }

    pub fn get(&self, id: &TicketId) -> Option<&DraftTicket> {
        self.tickets.iter().find(|ticket| &ticket.id == id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Appends an empty ticket and returns its id.
    pub fn add_ticket(&mut self) -> TicketId {
        let id = loop {
            let candidate = self.gen_id();
            if self.get(&candidate).is_none() {
                break candidate;
            }
        };
        self.tickets.push(DraftTicket {
            id: id.clone(),
            numbers: Vec::new(),
        });
        id
    }

    /// Returns false when no ticket has that id.
    pub fn remove_ticket(&mut self, id: &TicketId) -> bool {
        let before = self.tickets.len();
        self.tickets.retain(|ticket| &ticket.id != id);
        self.tickets.len() != before
    }

    /// Replaces a ticket's numbers after validating the whole set.
    pub fn set_numbers(&mut self, id: &TicketId, numbers: &[u8]) -> Result<(), TicketError> {
        let numbers = validate(numbers)?;
        self.ticket_mut(id)?.numbers = numbers;
        Ok(())
    }

    /// Removes `number` if selected, otherwise inserts it in order while the
    /// ticket has room. Returns whether the ticket changed.
    pub fn toggle_number(&mut self, id: &TicketId, number: u8) -> Result<bool, TicketError> {
        check_range(number)?;
        let ticket = self.ticket_mut(id)?;
        match ticket.numbers.binary_search(&number) {
            Ok(pos) => {
                ticket.numbers.remove(pos);
                Ok(true)
            }
            Err(_) if ticket.numbers.len() >= NUMBERS_PER_TICKET => Ok(false),
            Err(pos) => {
                ticket.numbers.insert(pos, number);
                Ok(true)
            }
        }
    }

    /// Fills the ticket with `NUMBERS_PER_TICKET` distinct random numbers.
    pub fn quick_pick(&mut self, id: &TicketId) -> Result<Vec<u8>, TicketError> {
        // resolve the ticket first so an unknown id does not consume randomness
        self.ticket_mut(id)?;

        let mut numbers = Vec::with_capacity(NUMBERS_PER_TICKET);
        while numbers.len() < NUMBERS_PER_TICKET {
            let number = draw_number(&mut self.rng);
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }
        numbers.sort_unstable();

        self.ticket_mut(id)?.numbers = numbers.clone();
        Ok(numbers)
    }

    pub fn clear(&mut self) {
        self.tickets.clear();
    }

    pub fn all_complete(&self) -> bool {
        self.tickets.iter().all(DraftTicket::is_complete)
    }

    /// Number-sets in ticket order, as submitted in a purchase.
    pub fn payload(&self) -> Vec<Vec<u8>> {
        self.tickets.iter().map(|ticket| ticket.numbers.clone()).collect()
    }

    pub fn total_cost(&self, ticket_price: u64) -> u64 {
        self.tickets.len() as u64 * ticket_price
    }

    fn ticket_mut(&mut self, id: &TicketId) -> Result<&mut DraftTicket, TicketError> {
        self.tickets
            .iter_mut()
            .find(|ticket| &ticket.id == id)
            .ok_or_else(|| TicketError::UnknownTicket(id.clone()))
    }

    fn gen_id(&mut self) -> TicketId {
        let id: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[(self.rng.next_u32() % 36) as usize] as char)
            .collect();
        TicketId::new(id)
    }
}

fn check_range(number: u8) -> Result<(), TicketError> {
    if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
        return Err(TicketError::OutOfRange(number));
    }
    Ok(())
}

fn validate(numbers: &[u8]) -> Result<Vec<u8>, TicketError> {
    if numbers.len() > NUMBERS_PER_TICKET {
        return Err(TicketError::TooManyNumbers {
            got: numbers.len(),
            max: NUMBERS_PER_TICKET,
        });
    }

    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    for (i, number) in sorted.iter().enumerate() {
        check_range(*number)?;
        if i > 0 && sorted[i - 1] == *number {
            return Err(TicketError::Duplicate(*number));
        }
    }
    Ok(sorted)
}

// uniform over MIN_NUMBER..=MAX_NUMBER, rejecting the biased tail of u32
fn draw_number(rng: &mut ChaCha20Rng) -> u8 {
    let span = (MAX_NUMBER - MIN_NUMBER + 1) as u32;
    let zone = u32::MAX - (u32::MAX % span);
    loop {
        let word = rng.next_u32();
        if word < zone {
            return MIN_NUMBER + (word % span) as u8;
        }
    }
}
