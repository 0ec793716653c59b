use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    ManageAdmins,
    ReviewReports,
    UpdateReports,
    ManageTeams,
    ManageStaff,
    ViewDashboard,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Officer,
}

impl AdminRole {
    pub fn validate(&self, permit: &AdminPermission) -> bool {
        match self {
            AdminRole::Owner => true,
            AdminRole::Officer => *permit != AdminPermission::ManageAdmins,
        }
    }
    pub fn title(&self) -> &'static str {
        match self {
            AdminRole::Owner => "RDA Administrator",
            AdminRole::Officer => "RDA Officer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_holds_every_permission() {
        for permit in [
            AdminPermission::ManageAdmins,
            AdminPermission::ReviewReports,
            AdminPermission::UpdateReports,
            AdminPermission::ManageTeams,
            AdminPermission::ManageStaff,
            AdminPermission::ViewDashboard,
        ] {
            assert!(AdminRole::Owner.validate(&permit));
        }
    }

    #[test]
    fn officer_cannot_manage_admins() {
        assert!(!AdminRole::Officer.validate(&AdminPermission::ManageAdmins));
        assert!(AdminRole::Officer.validate(&AdminPermission::ReviewReports));
        assert!(AdminRole::Officer.validate(&AdminPermission::ManageStaff));
    }
}
