mod action_id;
mod action_kind;
mod action_payload;
mod action_status;
mod booking_id;
mod folio_id;
mod request_id;
mod staff_role;
mod tenant_id;

pub use action_id::ActionId;
pub use action_kind::ActionKind;
pub use action_payload::ActionPayload;
pub use action_status::ActionStatus;
pub use booking_id::BookingId;
pub use folio_id::FolioId;
pub use request_id::RequestId;
pub use staff_role::StaffRole;
pub use tenant_id::TenantId;
