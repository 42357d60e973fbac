use crate::ledger::LedgerOperation;
use crate::order::status::PaymentStatus;
use serde::{Deserialize, Serialize};

/// One entry of an order's deferred ledger operation queue.
///
/// Created before the order starts, never mutated afterwards. Fires exactly
/// once, when the order reaches `condition_status`, in ascending `position`
/// order (`OrderStore::finalize` enforces both).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentOrderItem {
    pub position: u32,
    pub condition_status: PaymentStatus,
    pub operation: LedgerOperation,
}

impl PaymentOrderItem {
    pub fn new(position: u32, condition_status: PaymentStatus, operation: LedgerOperation) -> Self {
        Self {
            position,
            condition_status,
            operation,
        }
    }
}
