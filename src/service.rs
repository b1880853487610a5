//! UI-facing surface of the registry. Mutations validate against the current
//! snapshot, apply optimistically with a locally generated id, then reconcile
//! against the gateway's answer at resolution time: the durable record is
//! swapped in on success, the pre-mutation image restored on failure. The
//! store lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::try_join;

use crate::gateway::PersistenceGateway;
use crate::id::new_uuid_v7;
use crate::integrity;
use crate::model::{
    Family, FamilyCreatePayload, FamilyPatch, FamilyWithMembers, Member, MemberPatch, NewMember,
    FAMILY_NOT_FOUND, GATEWAY_NOT_FOUND, MEMBERSHIP_NOT_FOUND, MEMBER_NOT_FOUND,
};
use crate::stats::{self, Statistics};
use crate::store::EntityStore;
use crate::time::now_ms;
use crate::views::{self, FamilyPage, SortField, SortOrder, ViewCache, DEFAULT_PAGE_SIZE};
use crate::{AppError, AppResult};

/// Parameters for the paginated family list view.
#[derive(Debug, Clone)]
pub struct ViewParams {
    pub query: String,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort_by: SortField::Name,
            order: SortOrder::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn log_op_start(op: &'static str, family_id: Option<&str>, member_id: Option<&str>) {
    tracing::debug!(
        target: "kanisa",
        area = "registry",
        op,
        family_id,
        member_id,
        "op_enter"
    );
}

fn log_op_success(
    op: &'static str,
    start: Instant,
    family_id: Option<&str>,
    member_id: Option<&str>,
    row_count: usize,
) {
    tracing::info!(
        target: "kanisa",
        area = "registry",
        op,
        family_id,
        member_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        row_count,
        "op_success"
    );
}

fn log_op_error(
    op: &'static str,
    start: Instant,
    err: &AppError,
    family_id: Option<&str>,
    member_id: Option<&str>,
) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if is_validation_error(err.code()) {
        tracing::warn!(
            target: "kanisa",
            area = "registry",
            op,
            family_id,
            member_id,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "op_failure"
        );
    } else {
        tracing::error!(
            target: "kanisa",
            area = "registry",
            op,
            family_id,
            member_id,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "op_failure"
        );
    }
}

fn is_validation_error(code: &str) -> bool {
    code.starts_with("VALIDATION/")
        || code.starts_with("FAMILY/")
        || code.starts_with("MEMBER/")
        || code.starts_with("MEMBERSHIP/")
}

/// Client-resident registry of families and members, kept consistent with an
/// asynchronous persistence gateway under optimistic mutation.
pub struct FamilyService {
    store: Mutex<EntityStore>,
    cache: Mutex<ViewCache>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl FamilyService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            store: Mutex::new(EntityStore::new()),
            cache: Mutex::new(ViewCache::new()),
            gateway,
        }
    }

    fn store(&self) -> MutexGuard<'_, EntityStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bulk-loads both collections concurrently and replaces the snapshot
    /// atomically. On failure the prior snapshot is untouched; this is also
    /// the recovery path after a reported remote failure.
    pub async fn load(&self) -> AppResult<()> {
        let start = Instant::now();
        log_op_start("load", None, None);

        let result = try_join!(self.gateway.list_families(), self.gateway.list_members());
        match result {
            Ok((families, members)) => {
                let count = families.len() + members.len();
                self.store().replace_all(families, members);
                log_op_success("load", start, None, None, count);
                Ok(())
            }
            Err(err) => {
                log_op_error("load", start, &err, None, None);
                Err(err)
            }
        }
    }

    pub async fn create_family(&self, fields: FamilyCreatePayload) -> AppResult<Family> {
        let start = Instant::now();
        log_op_start("family_create", None, None);

        let provisional_id = {
            let mut store = self.store();
            let trimmed = match integrity::validate_create_family(&store, &fields.name) {
                Ok(trimmed) => trimmed.to_string(),
                Err(err) => {
                    log_op_error("family_create", start, &err, None, None);
                    return Err(err);
                }
            };
            let provisional = Family {
                id: new_uuid_v7(),
                name: trimmed,
                parish: fields.parish.clone(),
                province: fields.province.clone(),
                subgroup: fields.subgroup.clone(),
                created_at: now_ms(),
            };
            let id = provisional.id.clone();
            store.insert_family(provisional);
            id
        };

        match self.gateway.create_family(&fields).await {
            Ok(durable) => {
                self.store().replace_family(&provisional_id, durable.clone());
                log_op_success("family_create", start, Some(&durable.id), None, 1);
                Ok(durable)
            }
            Err(err) => {
                self.store().remove_family(&provisional_id);
                log_op_error("family_create", start, &err, Some(&provisional_id), None);
                Err(err)
            }
        }
    }

    pub async fn rename_family(&self, id: &str, name: &str) -> AppResult<Family> {
        let patch = FamilyPatch {
            name: Some(name.to_string()),
            ..Default::default()
        };
        self.update_family(id, patch).await
    }

    pub async fn update_family(&self, id: &str, patch: FamilyPatch) -> AppResult<Family> {
        let start = Instant::now();
        log_op_start("family_update", Some(id), None);

        let pre_image = {
            let mut store = self.store();
            if let Err(err) = integrity::validate_update_family(&store, id, &patch) {
                log_op_error("family_update", start, &err, Some(id), None);
                return Err(err);
            }
            // validate_update_family guarantees the record exists
            let pre_image = store.family(id).cloned().ok_or_else(|| {
                AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
                    .with_context("family_id", id.to_string())
            })?;
            let mut updated = pre_image.clone();
            updated.apply_patch(&patch);
            store.replace_family(id, updated);
            pre_image
        };

        match self.gateway.update_family(id, &patch).await {
            Ok(durable) => {
                self.store().replace_family(id, durable.clone());
                log_op_success("family_update", start, Some(id), None, 1);
                Ok(durable)
            }
            Err(err) => {
                self.store().replace_family(id, pre_image);
                log_op_error("family_update", start, &err, Some(id), None);
                Err(err)
            }
        }
    }

    /// Deletes the family and cascades to every member it owns, locally and
    /// durably. Confirmation is the caller's responsibility.
    pub async fn delete_family(&self, id: &str) -> AppResult<()> {
        let start = Instant::now();
        log_op_start("family_delete", Some(id), None);

        let removal = {
            let mut store = self.store();
            if let Err(err) = integrity::validate_delete_family(&store, id) {
                log_op_error("family_delete", start, &err, Some(id), None);
                return Err(err);
            }
            store.remove_family(id).ok_or_else(|| {
                AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
                    .with_context("family_id", id.to_string())
            })?
        };
        let cascade_count = removal.members.len();

        match self.gateway.delete_family(id).await {
            Ok(()) => {
                log_op_success("family_delete", start, Some(id), None, cascade_count + 1);
                Ok(())
            }
            // A missing durable row already matches the deleted state.
            Err(err) if err.code() == GATEWAY_NOT_FOUND => {
                log_op_success("family_delete", start, Some(id), None, cascade_count + 1);
                Ok(())
            }
            Err(err) => {
                self.store().restore_cascade(removal);
                log_op_error("family_delete", start, &err, Some(id), None);
                Err(err)
            }
        }
    }

    /// Creates a standalone member with no family association.
    pub async fn create_member(&self, fields: NewMember) -> AppResult<Member> {
        self.create_member_inner("member_create", fields, None, None)
            .await
    }

    /// Creates a member directly under a family with the given role.
    pub async fn add_member(
        &self,
        family_id: &str,
        fields: NewMember,
        role: &str,
    ) -> AppResult<Member> {
        self.create_member_inner("member_add", fields, Some(family_id), Some(role))
            .await
    }

    async fn create_member_inner(
        &self,
        op: &'static str,
        fields: NewMember,
        family_id: Option<&str>,
        role: Option<&str>,
    ) -> AppResult<Member> {
        let start = Instant::now();
        log_op_start(op, family_id, None);

        let provisional_id = {
            let mut store = self.store();
            if let Err(err) = integrity::validate_new_member(&fields) {
                log_op_error(op, start, &err, family_id, None);
                return Err(err);
            }
            if let Some(family_id) = family_id {
                if store.family(family_id).is_none() {
                    let err = AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
                        .with_context("family_id", family_id.to_string());
                    log_op_error(op, start, &err, Some(family_id), None);
                    return Err(err);
                }
            }
            let provisional = Member {
                id: new_uuid_v7(),
                family_id: family_id.map(Into::into),
                first_name: fields.first_name.trim().to_string(),
                last_name: fields.last_name.trim().to_string(),
                middle_name: fields.middle_name.clone(),
                date_of_birth: fields.date_of_birth.clone(),
                gender: fields.gender.clone(),
                relation: role.map(Into::into),
                baptism_date: fields.baptism_date.clone(),
                communion_date: fields.communion_date.clone(),
                confirmation_date: fields.confirmation_date.clone(),
                marital_status: fields.marital_status,
                marriage_date: fields.marriage_date.clone(),
                spouse_name: fields.spouse_name.clone(),
                created_at: now_ms(),
            };
            let id = provisional.id.clone();
            store.insert_member(provisional);
            id
        };

        match self.gateway.create_member(&fields, family_id, role).await {
            Ok(durable) => {
                self.store().replace_member(&provisional_id, durable.clone());
                log_op_success(op, start, family_id, Some(&durable.id), 1);
                Ok(durable)
            }
            Err(err) => {
                self.store().remove_member(&provisional_id);
                log_op_error(op, start, &err, family_id, Some(&provisional_id));
                Err(err)
            }
        }
    }

    /// Assigns an existing, unassigned member to a family.
    pub async fn add_membership(
        &self,
        family_id: &str,
        member_id: &str,
        role: &str,
    ) -> AppResult<Member> {
        let start = Instant::now();
        log_op_start("membership_add", Some(family_id), Some(member_id));

        let pre_image = {
            let mut store = self.store();
            if let Err(err) = integrity::validate_add_membership(&store, family_id, member_id) {
                log_op_error("membership_add", start, &err, Some(family_id), Some(member_id));
                return Err(err);
            }
            let pre_image = store.member(member_id).cloned().ok_or_else(|| {
                AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
                    .with_context("member_id", member_id.to_string())
            })?;
            let mut updated = pre_image.clone();
            updated.family_id = Some(family_id.to_string());
            updated.relation = Some(role.to_string());
            store.replace_member(member_id, updated);
            pre_image
        };

        match self
            .gateway
            .assign_member(member_id, family_id, Some(role))
            .await
        {
            Ok(durable) => {
                self.store().replace_member(member_id, durable.clone());
                log_op_success("membership_add", start, Some(family_id), Some(member_id), 1);
                Ok(durable)
            }
            Err(err) => {
                self.store().replace_member(member_id, pre_image);
                log_op_error("membership_add", start, &err, Some(family_id), Some(member_id));
                Err(err)
            }
        }
    }

    /// Clears a member's association with the family; the member survives.
    pub async fn remove_membership(&self, family_id: &str, member_id: &str) -> AppResult<Member> {
        let start = Instant::now();
        log_op_start("membership_remove", Some(family_id), Some(member_id));

        let pre_image = {
            let mut store = self.store();
            let member = match store.member(member_id) {
                Some(member) => member.clone(),
                None => {
                    let err = AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
                        .with_context("member_id", member_id.to_string());
                    log_op_error(
                        "membership_remove",
                        start,
                        &err,
                        Some(family_id),
                        Some(member_id),
                    );
                    return Err(err);
                }
            };
            if member.family_id.as_deref() != Some(family_id) {
                let err = AppError::new(
                    MEMBERSHIP_NOT_FOUND,
                    "Member is not associated with this family.",
                )
                .with_context("family_id", family_id.to_string())
                .with_context("member_id", member_id.to_string());
                log_op_error(
                    "membership_remove",
                    start,
                    &err,
                    Some(family_id),
                    Some(member_id),
                );
                return Err(err);
            }
            let mut updated = member.clone();
            updated.family_id = None;
            updated.relation = None;
            store.replace_member(member_id, updated);
            member
        };

        match self.gateway.unassign_member(member_id).await {
            Ok(durable) => {
                self.store().replace_member(member_id, durable.clone());
                log_op_success(
                    "membership_remove",
                    start,
                    Some(family_id),
                    Some(member_id),
                    1,
                );
                Ok(durable)
            }
            Err(err) => {
                self.store().replace_member(member_id, pre_image);
                log_op_error(
                    "membership_remove",
                    start,
                    &err,
                    Some(family_id),
                    Some(member_id),
                );
                Err(err)
            }
        }
    }

    pub async fn update_member(&self, id: &str, patch: MemberPatch) -> AppResult<Member> {
        let start = Instant::now();
        log_op_start("member_update", None, Some(id));

        let pre_image = {
            let mut store = self.store();
            if let Err(err) = integrity::validate_member_patch(&store, id, &patch) {
                log_op_error("member_update", start, &err, None, Some(id));
                return Err(err);
            }
            let pre_image = store.member(id).cloned().ok_or_else(|| {
                AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
                    .with_context("member_id", id.to_string())
            })?;
            let mut updated = pre_image.clone();
            updated.apply_patch(&patch);
            store.replace_member(id, updated);
            pre_image
        };

        match self.gateway.update_member(id, &patch).await {
            Ok(durable) => {
                self.store().replace_member(id, durable.clone());
                log_op_success("member_update", start, None, Some(id), 1);
                Ok(durable)
            }
            Err(err) => {
                self.store().replace_member(id, pre_image);
                log_op_error("member_update", start, &err, None, Some(id));
                Err(err)
            }
        }
    }

    pub async fn delete_member(&self, id: &str) -> AppResult<()> {
        let start = Instant::now();
        log_op_start("member_delete", None, Some(id));

        let removed = {
            let mut store = self.store();
            match store.remove_member(id) {
                Some(removed) => removed,
                None => {
                    let err = AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
                        .with_context("member_id", id.to_string());
                    log_op_error("member_delete", start, &err, None, Some(id));
                    return Err(err);
                }
            }
        };

        match self.gateway.delete_member(id).await {
            Ok(()) => {
                log_op_success("member_delete", start, None, Some(id), 1);
                Ok(())
            }
            Err(err) if err.code() == GATEWAY_NOT_FOUND => {
                log_op_success("member_delete", start, None, Some(id), 1);
                Ok(())
            }
            Err(err) => {
                let (pos, member) = removed;
                self.store().restore_member(pos, member);
                log_op_error("member_delete", start, &err, None, Some(id));
                Err(err)
            }
        }
    }

    /// Filtered, sorted, paginated family list. Out-of-range pages are
    /// clamped here, per the view engine's contract.
    pub fn families_view(&self, params: &ViewParams) -> FamilyPage {
        let store = self.store();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let rows = cache.filtered_sorted(&store, &params.query, params.sort_by, params.order);

        let total_items = rows.len();
        let total_pages = views::total_pages(total_items, params.page_size);
        let page = views::clamp_page(params.page, total_pages);
        let families = views::paginate(rows, page, params.page_size);

        FamilyPage {
            families,
            page,
            total_pages,
            total_items,
            page_size: params.page_size,
        }
    }

    pub fn statistics(&self) -> Statistics {
        stats::compute(&self.store(), now_ms())
    }

    pub fn families(&self) -> Vec<Family> {
        self.store().families().to_vec()
    }

    pub fn members(&self) -> Vec<Member> {
        self.store().members().to_vec()
    }

    pub fn family_with_members(&self, id: &str) -> AppResult<FamilyWithMembers> {
        let store = self.store();
        let family = store.family(id).cloned().ok_or_else(|| {
            AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
                .with_context("family_id", id.to_string())
        })?;
        let members = store.members_of(id);
        Ok(FamilyWithMembers { family, members })
    }

    pub fn members_of(&self, family_id: &str) -> Vec<Member> {
        self.store().members_of(family_id)
    }

    pub fn unassigned_members(&self) -> Vec<Member> {
        self.store().unassigned_members()
    }

    pub fn member_count_of(&self, family_id: &str) -> usize {
        self.store().member_count_of(family_id)
    }
}
