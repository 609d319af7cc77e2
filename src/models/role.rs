use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

/// Every screen or action a request can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Materials,
    ItemSearch,
    LedgerHistory,
    DailyReport,
    Upload,
    Manage,
    Tanks,
    ExportBalances,
    ExportLedger,
    ExportTanks,
}

/// The complete set of allowed (role, view) pairs. Anything not listed is denied.
pub const CAPABILITIES: &[(Role, View)] = &[
    (Role::Admin, View::Dashboard),
    (Role::Admin, View::Materials),
    (Role::Admin, View::ItemSearch),
    (Role::Admin, View::LedgerHistory),
    (Role::Admin, View::DailyReport),
    (Role::Admin, View::Upload),
    (Role::Admin, View::Manage),
    (Role::Admin, View::Tanks),
    (Role::Admin, View::ExportBalances),
    (Role::Admin, View::ExportLedger),
    (Role::Admin, View::ExportTanks),
    (Role::Viewer, View::Materials),
    (Role::Viewer, View::ItemSearch),
    (Role::Viewer, View::Tanks),
    (Role::Viewer, View::ExportBalances),
    (Role::Viewer, View::ExportTanks),
];

impl Role {
    pub fn can(self, view: View) -> bool {
        CAPABILITIES.iter().any(|&(role, allowed)| role == self && allowed == view)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    /// Where a fresh session of this role lands.
    pub fn home(self) -> &'static str {
        match self {
            Role::Admin => "/dashboard",
            Role::Viewer => "/materials",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_is_read_only() {
        assert!(Role::Viewer.can(View::Materials));
        assert!(Role::Viewer.can(View::ExportBalances));
        assert!(!Role::Viewer.can(View::Upload));
        assert!(!Role::Viewer.can(View::Manage));
        assert!(!Role::Viewer.can(View::LedgerHistory));
        assert!(!Role::Viewer.can(View::ExportLedger));
    }

    #[test]
    fn admin_reaches_everything() {
        for view in [
            View::Dashboard,
            View::Materials,
            View::ItemSearch,
            View::LedgerHistory,
            View::DailyReport,
            View::Upload,
            View::Manage,
            View::Tanks,
            View::ExportBalances,
            View::ExportLedger,
            View::ExportTanks,
        ] {
            assert!(Role::Admin.can(view), "{:?}", view);
        }
    }
}
