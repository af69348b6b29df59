use super::{NeighborBackend, NeighborMatch, NeighborQuery};
use crate::error::{DbError, DbResult};

/// Backend that is always unavailable.
///
/// Every search served through it takes the fallback scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

impl NeighborBackend for DisabledBackend {
    fn query(&self, _query: &NeighborQuery<'_>) -> DbResult<Vec<NeighborMatch>> {
        Err(DbError::BackendDisabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
