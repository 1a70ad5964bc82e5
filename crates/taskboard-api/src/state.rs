use std::sync::Arc;

use taskboard_auth::{Accounts, TokenIssuer};
use taskboard_core::{Board, Store};

#[derive(Clone)]
pub struct ApiState {
    pub board: Board,
    pub accounts: Accounts,
    pub store: Arc<dyn Store>,
}

impl ApiState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, max_export_rows: usize) -> Self {
        Self {
            board: Board::new(store.clone()).with_max_export_rows(max_export_rows),
            accounts: Accounts::new(store.clone(), tokens),
            store,
        }
    }
}
