use serde::{Deserialize, Serialize};

/// Named holding areas a task document can occupy. The partition a file sits
/// in doubles as the coarse pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    NeedsAction,
    PendingApproval,
    Approved,
    Rejected,
    Done,
}

impl Partition {
    /// Scan order for a driver pass: approved work first, then rejections,
    /// then approval checks, then new documents. Mirrors the priority the
    /// original pipeline used.
    pub const SCAN_ORDER: [Partition; 4] = [
        Partition::Approved,
        Partition::Rejected,
        Partition::PendingApproval,
        Partition::NeedsAction,
    ];

    pub const ALL: [Partition; 5] = [
        Partition::NeedsAction,
        Partition::PendingApproval,
        Partition::Approved,
        Partition::Rejected,
        Partition::Done,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::NeedsAction => "Needs_Action",
            Self::PendingApproval => "Pending_Approval",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Done => "Done",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "Needs_Action" | "needs_action" => Ok(Self::NeedsAction),
            "Pending_Approval" | "pending_approval" => Ok(Self::PendingApproval),
            "Approved" | "approved" => Ok(Self::Approved),
            "Rejected" | "rejected" => Ok(Self::Rejected),
            "Done" | "done" => Ok(Self::Done),
            _ => Err(
                "partition must be one of: Needs_Action, Pending_Approval, Approved, Rejected, Done"
                    .to_string(),
            ),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_dir_and_snake_case_names() {
        assert_eq!(
            Partition::parse("Pending_Approval").expect("parse"),
            Partition::PendingApproval
        );
        assert_eq!(
            Partition::parse("needs_action").expect("parse"),
            Partition::NeedsAction
        );
        assert!(Partition::parse("Archive").is_err());
    }

    #[test]
    fn scan_order_excludes_done() {
        assert!(!Partition::SCAN_ORDER.contains(&Partition::Done));
    }
}
