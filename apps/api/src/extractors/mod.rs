//! Custom Axum extractors

mod current_user;
mod require_admin;
mod require_team_lead;

pub use current_user::{AuthState, CurrentUser};
pub use require_admin::RequireAdmin;
pub use require_team_lead::RequireTeamLead;
