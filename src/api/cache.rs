//! Per-run result cache.
//!
//! Each data read runs at most once per process: the first result, present
//! or absent, is kept for the rest of the run. Only an internal error
//! leaves a slot unset, so a later call may retry after one.

use tokio::sync::OnceCell;

use super::models::{AccountProfile, PointsSummary, PurchasesSummary};

#[derive(Default)]
pub struct OpCache {
    pub(super) account_info: OnceCell<Option<AccountProfile>>,
    pub(super) points_balance: OnceCell<Option<PointsSummary>>,
    pub(super) purchases_summary: OnceCell<Option<PurchasesSummary>>,
}
