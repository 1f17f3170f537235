pub mod audit_event;
pub mod role;
pub mod user;

pub use audit_event::{AuditEvent, AuditFilter, NewAuditEvent};
pub use role::{NewRole, Role, SUPERADMIN_ROLE_NAME};
pub use user::{NewUser, User, UserChanges, UserFilter, UserWithRole};
