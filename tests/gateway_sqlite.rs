use anyhow::Result;
use sqlx::SqlitePool;

use kanisa::{
    FamilyCreatePayload, FamilyPatch, MaritalStatus, MemberPatch, NewMember, PersistenceGateway,
    SqliteGateway, GATEWAY_DECODE, GATEWAY_NOT_FOUND,
};

async fn setup() -> Result<SqliteGateway> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await?;
    SqliteGateway::ensure_schema(&pool).await?;
    Ok(SqliteGateway::new(pool))
}

fn family_fields(name: &str) -> FamilyCreatePayload {
    FamilyCreatePayload {
        name: name.into(),
        parish: Some("Parokia ya Mt. Petro - Oysterbay".into()),
        province: Some("Dar es Salaam".into()),
        subgroup: None,
    }
}

fn member_fields(first: &str, last: &str) -> NewMember {
    NewMember {
        first_name: first.into(),
        last_name: last.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_and_get_family_round_trip() -> Result<()> {
    let gateway = setup().await?;

    let created = gateway.create_family(&family_fields("Mwakalinga Family")).await?;
    assert!(!created.id.is_empty());
    assert!(created.created_at > 0);
    assert_eq!(created.name, "Mwakalinga Family");
    assert_eq!(created.province.as_deref(), Some("Dar es Salaam"));

    let fetched = gateway.get_family(&created.id).await?.expect("family exists");
    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn get_family_miss_is_typed_not_an_error() -> Result<()> {
    let gateway = setup().await?;
    assert!(gateway.get_family("no-such-id").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn list_families_is_newest_first() -> Result<()> {
    let gateway = setup().await?;
    let first = gateway.create_family(&family_fields("Ngoma Family")).await?;
    let second = gateway.create_family(&family_fields("Kimaro Family")).await?;

    let families = gateway.list_families().await?;
    assert_eq!(families.len(), 2);
    assert_eq!(families[0].id, second.id);
    assert_eq!(families[1].id, first.id);
    Ok(())
}

#[tokio::test]
async fn update_family_applies_patch_fields_only() -> Result<()> {
    let gateway = setup().await?;
    let created = gateway.create_family(&family_fields("Ngoma Family")).await?;

    let patch = FamilyPatch {
        name: Some("  Ngoma Household  ".into()),
        ..Default::default()
    };
    let updated = gateway.update_family(&created.id, &patch).await?;
    assert_eq!(updated.name, "Ngoma Household");
    // Untouched fields survive the patch.
    assert_eq!(updated.province.as_deref(), Some("Dar es Salaam"));
    assert_eq!(updated.created_at, created.created_at);
    Ok(())
}

#[tokio::test]
async fn update_missing_family_reports_not_found() -> Result<()> {
    let gateway = setup().await?;
    let err = gateway
        .update_family("no-such-id", &FamilyPatch::default())
        .await
        .expect_err("missing family");
    assert_eq!(err.code(), GATEWAY_NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_family_cascades_to_member_rows() -> Result<()> {
    let gateway = setup().await?;
    let family = gateway.create_family(&family_fields("Mwakalinga Family")).await?;
    for (first, last) in [("John", "Mwakalinga"), ("Mary", "Mwakalinga"), ("David", "Mwakalinga")] {
        gateway
            .create_member(&member_fields(first, last), Some(&family.id), Some("Child"))
            .await?;
    }
    let outsider = gateway
        .create_member(&member_fields("Alice", "Ngoma"), None, None)
        .await?;

    gateway.delete_family(&family.id).await?;

    assert!(gateway.get_family(&family.id).await?.is_none());
    assert!(gateway.list_members_by_family(&family.id).await?.is_empty());
    // Members of other (or no) families are untouched.
    let remaining = gateway.list_members().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, outsider.id);
    Ok(())
}

#[tokio::test]
async fn delete_missing_family_reports_not_found() -> Result<()> {
    let gateway = setup().await?;
    let err = gateway
        .delete_family("no-such-id")
        .await
        .expect_err("missing family");
    assert_eq!(err.code(), GATEWAY_NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn undecodable_column_surfaces_a_decode_error() -> Result<()> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    SqliteGateway::ensure_schema(&pool).await?;
    // A blob of invalid UTF-8 where a name should be.
    sqlx::query(
        "INSERT INTO families (id, name, parish, province, subgroup, created_at) \
         VALUES ('fam-1', X'FF', NULL, NULL, NULL, 0)",
    )
    .execute(&pool)
    .await?;

    let gateway = SqliteGateway::new(pool);
    let err = gateway.list_families().await.expect_err("name is not text");
    assert_eq!(err.code(), GATEWAY_DECODE);
    Ok(())
}

#[tokio::test]
async fn member_patch_clears_marriage_fields_on_single() -> Result<()> {
    let gateway = setup().await?;
    let fields = NewMember {
        first_name: "Mary".into(),
        last_name: "Ngoma".into(),
        marital_status: MaritalStatus::Married,
        marriage_date: Some("2019-08-10".into()),
        spouse_name: Some("Joseph".into()),
        ..Default::default()
    };
    let created = gateway.create_member(&fields, None, None).await?;
    assert_eq!(created.marital_status, MaritalStatus::Married);

    let patch = MemberPatch {
        marital_status: Some(MaritalStatus::Single),
        ..Default::default()
    };
    let updated = gateway.update_member(&created.id, &patch).await?;
    assert_eq!(updated.marital_status, MaritalStatus::Single);
    assert!(updated.marriage_date.is_none());
    assert!(updated.spouse_name.is_none());
    Ok(())
}

#[tokio::test]
async fn assign_and_unassign_member_round_trip() -> Result<()> {
    let gateway = setup().await?;
    let family = gateway.create_family(&family_fields("Ngoma Family")).await?;
    let member = gateway
        .create_member(&member_fields("Alice", "Ngoma"), None, None)
        .await?;

    let assigned = gateway
        .assign_member(&member.id, &family.id, Some("Mother"))
        .await?;
    assert_eq!(assigned.family_id.as_deref(), Some(family.id.as_str()));
    assert_eq!(assigned.relation.as_deref(), Some("Mother"));
    assert_eq!(gateway.list_members_by_family(&family.id).await?.len(), 1);

    let unassigned = gateway.unassign_member(&member.id).await?;
    assert!(unassigned.family_id.is_none());
    assert!(unassigned.relation.is_none());
    assert!(gateway.list_members_by_family(&family.id).await?.is_empty());
    Ok(())
}
