//! Invariant checks that gate every mutation. All functions are pure over the
//! current store snapshot; a failure blocks the mutation before any optimistic
//! apply, so no partial state is ever written.

use crate::model::{
    FamilyPatch, MaritalStatus, NewMember, FAMILY_DUPLICATE_NAME, FAMILY_NOT_FOUND,
    MEMBERSHIP_ALREADY_ASSIGNED, MEMBERSHIP_DUPLICATE, MEMBER_NOT_FOUND, VALIDATION_EMPTY_FIELD,
    VALIDATION_INVALID_DATE, VALIDATION_MARITAL_FIELDS,
};
use crate::store::EntityStore;
use crate::time::is_valid_date;
use crate::{AppError, AppResult};

/// Trimmed, case-folded form used for the uniqueness comparison.
pub fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn require_non_empty<'a>(value: &'a str, field: &'static str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(
            AppError::new(VALIDATION_EMPTY_FIELD, format!("{field} is required."))
                .with_context("field", field),
        );
    }
    Ok(trimmed)
}

fn require_valid_date(value: &Option<String>, field: &'static str) -> AppResult<()> {
    if let Some(value) = value {
        if !is_valid_date(value) {
            return Err(AppError::new(
                VALIDATION_INVALID_DATE,
                format!("{field} must be a valid YYYY-MM-DD date."),
            )
            .with_context("field", field)
            .with_context("value", value.clone()));
        }
    }
    Ok(())
}

fn duplicate_name_error(name: &str) -> AppError {
    AppError::new(FAMILY_DUPLICATE_NAME, "A family with this name already exists.")
        .with_context("name", name.trim().to_string())
}

/// Returns the trimmed name when it is non-empty and not already taken.
pub fn validate_create_family<'a>(store: &EntityStore, name: &'a str) -> AppResult<&'a str> {
    let trimmed = require_non_empty(name, "family name")?;
    let normalized = normalized_name(trimmed);
    if store
        .families()
        .iter()
        .any(|f| normalized_name(&f.name) == normalized)
    {
        return Err(duplicate_name_error(trimmed));
    }
    Ok(trimmed)
}

/// Uniqueness check excluding the family being updated.
pub fn validate_update_family(store: &EntityStore, id: &str, patch: &FamilyPatch) -> AppResult<()> {
    if store.family(id).is_none() {
        return Err(AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
            .with_context("family_id", id.to_string()));
    }
    if let Some(name) = &patch.name {
        let trimmed = require_non_empty(name, "family name")?;
        let normalized = normalized_name(trimmed);
        if store
            .families()
            .iter()
            .any(|f| f.id != id && normalized_name(&f.name) == normalized)
        {
            return Err(duplicate_name_error(trimmed));
        }
    }
    Ok(())
}

/// Deletion is always permitted for an existing family; the store performs
/// the member cascade as part of the same logical operation.
pub fn validate_delete_family(store: &EntityStore, id: &str) -> AppResult<()> {
    if store.family(id).is_none() {
        return Err(AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
            .with_context("family_id", id.to_string()));
    }
    Ok(())
}

/// Enforces the single-owner cardinality: a member is never in two families
/// at once, and never added to the same family twice.
pub fn validate_add_membership(
    store: &EntityStore,
    family_id: &str,
    member_id: &str,
) -> AppResult<()> {
    if store.family(family_id).is_none() {
        return Err(AppError::new(FAMILY_NOT_FOUND, "Family record not found.")
            .with_context("family_id", family_id.to_string()));
    }
    let Some(member) = store.member(member_id) else {
        return Err(AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
            .with_context("member_id", member_id.to_string()));
    };
    match member.family_id.as_deref() {
        Some(current) if current == family_id => Err(AppError::new(
            MEMBERSHIP_DUPLICATE,
            "Member is already in this family.",
        )
        .with_context("family_id", family_id.to_string())
        .with_context("member_id", member_id.to_string())),
        Some(current) => Err(AppError::new(
            MEMBERSHIP_ALREADY_ASSIGNED,
            "Member already belongs to a different family.",
        )
        .with_context("expected", family_id.to_string())
        .with_context("actual", current.to_string())
        .with_context("member_id", member_id.to_string())),
        None => Ok(()),
    }
}

/// Field-level checks for a new member record.
pub fn validate_new_member(fields: &NewMember) -> AppResult<()> {
    require_non_empty(&fields.first_name, "first name")?;
    require_non_empty(&fields.last_name, "last name")?;
    require_valid_date(&fields.date_of_birth, "date of birth")?;
    require_valid_date(&fields.baptism_date, "baptism date")?;
    require_valid_date(&fields.communion_date, "communion date")?;
    require_valid_date(&fields.confirmation_date, "confirmation date")?;
    require_valid_date(&fields.marriage_date, "marriage date")?;
    validate_marital_fields(
        fields.marital_status,
        &fields.marriage_date,
        &fields.spouse_name,
    )
}

/// Marriage fields are legal only while the status is married.
pub fn validate_marital_fields(
    status: MaritalStatus,
    marriage_date: &Option<String>,
    spouse_name: &Option<String>,
) -> AppResult<()> {
    if status == MaritalStatus::Single && (marriage_date.is_some() || spouse_name.is_some()) {
        return Err(AppError::new(
            VALIDATION_MARITAL_FIELDS,
            "Marriage date and spouse name require married status.",
        ));
    }
    Ok(())
}

/// Field-level checks for a member patch, against the record it will amend.
pub fn validate_member_patch(store: &EntityStore, id: &str, patch: &crate::model::MemberPatch) -> AppResult<()> {
    let Some(member) = store.member(id) else {
        return Err(AppError::new(MEMBER_NOT_FOUND, "Member record not found.")
            .with_context("member_id", id.to_string()));
    };
    if let Some(first_name) = &patch.first_name {
        require_non_empty(first_name, "first name")?;
    }
    if let Some(last_name) = &patch.last_name {
        require_non_empty(last_name, "last name")?;
    }
    require_valid_date(&patch.date_of_birth, "date of birth")?;
    require_valid_date(&patch.baptism_date, "baptism date")?;
    require_valid_date(&patch.communion_date, "communion date")?;
    require_valid_date(&patch.confirmation_date, "confirmation date")?;
    require_valid_date(&patch.marriage_date, "marriage date")?;

    // Transitioning to single clears the marriage fields, so only reject
    // marriage details paired with a single status in the same patch.
    let status = patch.marital_status.unwrap_or(member.marital_status);
    if status == MaritalStatus::Married {
        return Ok(());
    }
    if patch.marital_status == Some(MaritalStatus::Single) {
        // The clear happens in the apply step.
        return Ok(());
    }
    validate_marital_fields(status, &patch.marriage_date, &patch.spouse_name)
}
