//! Parish family registry core.
//!
//! A client-resident cache of Family and Member records that enforces the
//! relational invariants a remote record store does not guarantee on its own
//! (name uniqueness, single-owner membership, cascade delete), serves derived
//! views (search, sort, paginate, statistics), and reconciles optimistic
//! local mutations against an asynchronous persistence gateway.

mod error;
mod id;
mod integrity;
mod logging;
mod model;
mod time;

pub mod gateway;
pub mod service;
pub mod stats;
pub mod store;
pub mod views;

pub use error::{AppError, AppResult};
pub use gateway::{PersistenceGateway, SqliteGateway};
pub use integrity::{
    normalized_name, validate_add_membership, validate_create_family, validate_delete_family,
    validate_member_patch, validate_new_member, validate_update_family,
};
pub use logging::init as init_logging;
pub use model::{
    Family, FamilyCreatePayload, FamilyPatch, FamilyWithMembers, MaritalStatus, Member,
    MemberPatch, NewMember, FAMILY_DUPLICATE_NAME, FAMILY_NOT_FOUND, GATEWAY_DECODE, GATEWAY_FAIL,
    GATEWAY_NOT_FOUND, GENERIC_FAIL, GENERIC_FAIL_MESSAGE, MEMBERSHIP_ALREADY_ASSIGNED,
    MEMBERSHIP_DUPLICATE, MEMBERSHIP_NOT_FOUND, MEMBER_NOT_FOUND, ROLE_OPTIONS,
    VALIDATION_EMPTY_FIELD, VALIDATION_INVALID_DATE, VALIDATION_MARITAL_FIELDS,
};
pub use service::{FamilyService, ViewParams};
pub use stats::Statistics;
pub use store::EntityStore;
pub use time::now_ms;
pub use views::{FamilyPage, SortField, SortOrder, DEFAULT_PAGE_SIZE};
