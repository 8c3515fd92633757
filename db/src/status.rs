use crate::{
    error::StoreError,
    models::LoanStatus,
    store::Catalog,
    wire::BulkItem,
};
use speedy::{Readable, Writable};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusAction {
    MarkReturned,
    MarkMaintenance,
}

impl StatusAction {
    pub fn target(self) -> LoanStatus {
        match self {
            Self::MarkReturned => LoanStatus::Available,
            Self::MarkMaintenance => LoanStatus::Maintenance,
        }
    }

    pub fn to_str(self) -> &'static str {
        match self {
            Self::MarkReturned => "mark-returned",
            Self::MarkMaintenance => "mark-maintenance",
        }
    }
}

impl FromStr for StatusAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark-returned" => Ok(Self::MarkReturned),
            "mark-maintenance" => Ok(Self::MarkMaintenance),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Readable, Writable)]
pub enum ItemOutcome {
    Updated { previous: LoanStatus },
    NotFound,
    InvalidId,
}

/// Applies `action` to each listed instance independently.
///
/// Unknown or malformed ids are reported per item; any other storage
/// failure aborts the remaining items. Transitions are unconditional, so
/// returning an available copy leaves it available.
pub fn apply<S: AsRef<str>>(
    catalog: &dyn Catalog,
    action: StatusAction,
    ids: &[S],
) -> Result<Vec<BulkItem>, StoreError> {
    let mut report = Vec::with_capacity(ids.len());
    for raw in ids {
        let raw = raw.as_ref();
        let outcome = match Uuid::parse_str(raw) {
            Err(_) => ItemOutcome::InvalidId,
            Ok(id) => match catalog.set_status(id, action.target()) {
                Ok(previous) => ItemOutcome::Updated { previous },
                Err(StoreError::NotFound { .. }) => ItemOutcome::NotFound,
                Err(err) => return Err(err),
            },
        };
        report.push(BulkItem {
            id: raw.to_owned(),
            outcome,
        });
    }
    Ok(report)
}
