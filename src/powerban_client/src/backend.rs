use crate::error::BackendError;
use crate::types::*;
use std::rc::Rc;

/// Request/response contract of the remote lottery service.
///
/// Futures are polled on a single thread, so implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Issues a fresh player identity.
    async fn create_player(&self) -> Result<UserId, BackendError>;

    /// Issues a one-time deposit address for `user`.
    async fn create_deposit_address(&self, user: &UserId) -> Result<String, BackendError>;

    /// Submits every ticket of `order` as one batch; returns the confirmed number-sets.
    async fn purchase_tickets(&self, order: &PurchaseOrder) -> Result<Vec<Vec<u8>>, BackendError>;

    /// Number-sets `user` has bought for the active draw.
    async fn today_tickets(&self, user: &UserId) -> Result<Vec<Vec<u8>>, BackendError>;

    async fn next_draw(&self) -> Result<Timestamp, BackendError>;

    /// `None` while the backend has no draw open.
    async fn current_draw(&self) -> Result<Option<CurrentDraw>, BackendError>;

    /// `None` until a draw has completed.
    async fn previous_draw(&self) -> Result<Option<PreviousDraw>, BackendError>;
}

impl<B: Backend> Backend for Rc<B> {
    async fn create_player(&self) -> Result<UserId, BackendError> {
        self.as_ref().create_player().await
    }

    async fn create_deposit_address(&self, user: &UserId) -> Result<String, BackendError> {
        self.as_ref().create_deposit_address(user).await
    }

    async fn purchase_tickets(&self, order: &PurchaseOrder) -> Result<Vec<Vec<u8>>, BackendError> {
        self.as_ref().purchase_tickets(order).await
    }

    async fn today_tickets(&self, user: &UserId) -> Result<Vec<Vec<u8>>, BackendError> {
        self.as_ref().today_tickets(user).await
    }

    async fn next_draw(&self) -> Result<Timestamp, BackendError> {
        self.as_ref().next_draw().await
    }

    async fn current_draw(&self) -> Result<Option<CurrentDraw>, BackendError> {
        self.as_ref().current_draw().await
    }

    async fn previous_draw(&self) -> Result<Option<PreviousDraw>, BackendError> {
        self.as_ref().previous_draw().await
    }
}
