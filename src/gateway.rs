//! The remote persistence contract the registry core depends on, plus the
//! SQLite reference implementation. The core treats any implementation as an
//! untrusted, possibly slow, possibly failing collaborator: every call can
//! reject, and rejection after an optimistic apply triggers the service's
//! compensating rollback.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::id::new_uuid_v7;
use crate::model::{
    Family, FamilyCreatePayload, FamilyPatch, MaritalStatus, Member, MemberPatch, NewMember,
    GATEWAY_DECODE, GATEWAY_FAIL, GATEWAY_NOT_FOUND,
};
use crate::time::now_ms;
use crate::{AppError, AppResult};

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_families(&self) -> AppResult<Vec<Family>>;
    /// Typed miss: an unknown id is `Ok(None)`, not an error.
    async fn get_family(&self, id: &str) -> AppResult<Option<Family>>;
    /// The durable store assigns `id` and `created_at`.
    async fn create_family(&self, fields: &FamilyCreatePayload) -> AppResult<Family>;
    async fn update_family(&self, id: &str, patch: &FamilyPatch) -> AppResult<Family>;
    /// Deletes the family and every member row it owns.
    async fn delete_family(&self, id: &str) -> AppResult<()>;

    async fn list_members(&self) -> AppResult<Vec<Member>>;
    async fn list_members_by_family(&self, family_id: &str) -> AppResult<Vec<Member>>;
    async fn create_member(
        &self,
        fields: &NewMember,
        family_id: Option<&str>,
        relation: Option<&str>,
    ) -> AppResult<Member>;
    async fn update_member(&self, id: &str, patch: &MemberPatch) -> AppResult<Member>;
    async fn delete_member(&self, id: &str) -> AppResult<()>;

    /// Membership changes are separate from field patches: a patch can never
    /// move a member between families.
    async fn assign_member(
        &self,
        member_id: &str,
        family_id: &str,
        relation: Option<&str>,
    ) -> AppResult<Member>;
    async fn unassign_member(&self, member_id: &str) -> AppResult<Member>;
}

fn wrap_unexpected(err: AppError, operation: &'static str) -> AppError {
    AppError::new(GATEWAY_FAIL, "The record store rejected the request.")
        .with_context("operation", operation)
        .with_cause(err)
}

fn not_found(entity: &'static str, id: &str) -> AppError {
    AppError::new(GATEWAY_NOT_FOUND, format!("{entity} not found in the record store."))
        .with_context("id", id.to_string())
}

const FAMILY_COLUMNS: &str = "id, name, parish, province, subgroup, created_at";
const MEMBER_COLUMNS: &str = "id, family_id, first_name, last_name, middle_name, date_of_birth, \
     gender, relation, baptism_date, communion_date, confirmation_date, marital_status, \
     marriage_date, spouse_name, created_at";

fn decode_err(err: sqlx::Error, column: &'static str) -> AppError {
    AppError::new(GATEWAY_DECODE, "Could not decode a record-store row.")
        .with_context("column", column)
        .with_cause(AppError::from(err))
}

fn column<'r, T>(row: &'r SqliteRow, name: &'static str) -> AppResult<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|err| decode_err(err, name))
}

fn deserialize_family(row: SqliteRow) -> AppResult<Family> {
    Ok(Family {
        id: column(&row, "id")?,
        name: column(&row, "name")?,
        parish: column(&row, "parish")?,
        province: column(&row, "province")?,
        subgroup: column(&row, "subgroup")?,
        created_at: column(&row, "created_at")?,
    })
}

fn deserialize_member(row: SqliteRow) -> AppResult<Member> {
    let status_str: String = column(&row, "marital_status")?;
    let marital_status = MaritalStatus::parse(&status_str).ok_or_else(|| {
        AppError::new(GATEWAY_DECODE, "Invalid marital status in member row")
            .with_context("value", status_str.clone())
    })?;

    Ok(Member {
        id: column(&row, "id")?,
        family_id: column(&row, "family_id")?,
        first_name: column(&row, "first_name")?,
        last_name: column(&row, "last_name")?,
        middle_name: column(&row, "middle_name")?,
        date_of_birth: column(&row, "date_of_birth")?,
        gender: column(&row, "gender")?,
        relation: column(&row, "relation")?,
        baptism_date: column(&row, "baptism_date")?,
        communion_date: column(&row, "communion_date")?,
        confirmation_date: column(&row, "confirmation_date")?,
        marital_status,
        marriage_date: column(&row, "marriage_date")?,
        spouse_name: column(&row, "spouse_name")?,
        created_at: column(&row, "created_at")?,
    })
}

/// Durable store backed by SQLite. Stands in for the hosted record service in
/// local deployments and tests.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(pool: &SqlitePool) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS families (\
                 id TEXT PRIMARY KEY,\
                 name TEXT NOT NULL,\
                 parish TEXT,\
                 province TEXT,\
                 subgroup TEXT,\
                 created_at INTEGER NOT NULL\
             )",
        )
        .execute(pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "ensure_schema"))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS members (\
                 id TEXT PRIMARY KEY,\
                 family_id TEXT REFERENCES families(id),\
                 first_name TEXT NOT NULL,\
                 last_name TEXT NOT NULL,\
                 middle_name TEXT,\
                 date_of_birth TEXT,\
                 gender TEXT,\
                 relation TEXT,\
                 baptism_date TEXT,\
                 communion_date TEXT,\
                 confirmation_date TEXT,\
                 marital_status TEXT NOT NULL DEFAULT 'single',\
                 marriage_date TEXT,\
                 spouse_name TEXT,\
                 created_at INTEGER NOT NULL\
             )",
        )
        .execute(pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "ensure_schema"))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_family ON members(family_id)")
            .execute(pool)
            .await
            .map_err(|err| wrap_unexpected(err.into(), "ensure_schema"))?;

        Ok(())
    }

    async fn fetch_family(&self, id: &str, operation: &'static str) -> AppResult<Option<Family>> {
        let row = sqlx::query(&format!("SELECT {FAMILY_COLUMNS} FROM families WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| wrap_unexpected(err.into(), operation))?;
        row.map(deserialize_family).transpose()
    }

    async fn fetch_member(&self, id: &str, operation: &'static str) -> AppResult<Option<Member>> {
        let row = sqlx::query(&format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| wrap_unexpected(err.into(), operation))?;
        row.map(deserialize_member).transpose()
    }

    async fn write_member(&self, member: &Member, operation: &'static str) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO members \
             (id, family_id, first_name, last_name, middle_name, date_of_birth, gender, relation, \
              baptism_date, communion_date, confirmation_date, marital_status, marriage_date, \
              spouse_name, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&member.id)
        .bind(&member.family_id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.middle_name)
        .bind(&member.date_of_birth)
        .bind(&member.gender)
        .bind(&member.relation)
        .bind(&member.baptism_date)
        .bind(&member.communion_date)
        .bind(&member.confirmation_date)
        .bind(member.marital_status.as_str())
        .bind(&member.marriage_date)
        .bind(&member.spouse_name)
        .bind(member.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), operation))?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn list_families(&self) -> AppResult<Vec<Family>> {
        let rows = sqlx::query(&format!(
            "SELECT {FAMILY_COLUMNS} FROM families ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "families_list"))?;
        rows.into_iter().map(deserialize_family).collect()
    }

    async fn get_family(&self, id: &str) -> AppResult<Option<Family>> {
        self.fetch_family(id, "families_get").await
    }

    async fn create_family(&self, fields: &FamilyCreatePayload) -> AppResult<Family> {
        let family = Family {
            id: new_uuid_v7(),
            name: fields.name.trim().to_string(),
            parish: fields.parish.clone(),
            province: fields.province.clone(),
            subgroup: fields.subgroup.clone(),
            created_at: now_ms(),
        };

        sqlx::query(
            "INSERT INTO families (id, name, parish, province, subgroup, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&family.id)
        .bind(&family.name)
        .bind(&family.parish)
        .bind(&family.province)
        .bind(&family.subgroup)
        .bind(family.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "families_create"))?;

        Ok(family)
    }

    async fn update_family(&self, id: &str, patch: &FamilyPatch) -> AppResult<Family> {
        let mut family = self
            .fetch_family(id, "families_update_lookup")
            .await?
            .ok_or_else(|| not_found("Family", id))?;
        family.apply_patch(patch);

        sqlx::query(
            "UPDATE families SET name = ?2, parish = ?3, province = ?4, subgroup = ?5 WHERE id = ?1",
        )
        .bind(&family.id)
        .bind(&family.name)
        .bind(&family.parish)
        .bind(&family.province)
        .bind(&family.subgroup)
        .execute(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "families_update"))?;

        Ok(family)
    }

    async fn delete_family(&self, id: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| wrap_unexpected(err.into(), "families_delete_begin"))?;

        sqlx::query("DELETE FROM members WHERE family_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|err| wrap_unexpected(err.into(), "families_delete_members"))?;

        let result = sqlx::query("DELETE FROM families WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|err| wrap_unexpected(err.into(), "families_delete"))?;

        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(not_found("Family", id));
        }

        tx.commit()
            .await
            .map_err(|err| wrap_unexpected(err.into(), "families_delete_commit"))?;
        Ok(())
    }

    async fn list_members(&self) -> AppResult<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "members_list"))?;
        rows.into_iter().map(deserialize_member).collect()
    }

    async fn list_members_by_family(&self, family_id: &str) -> AppResult<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE family_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "members_list_by_family"))?;
        rows.into_iter().map(deserialize_member).collect()
    }

    async fn create_member(
        &self,
        fields: &NewMember,
        family_id: Option<&str>,
        relation: Option<&str>,
    ) -> AppResult<Member> {
        let member = Member {
            id: new_uuid_v7(),
            family_id: family_id.map(Into::into),
            first_name: fields.first_name.trim().to_string(),
            last_name: fields.last_name.trim().to_string(),
            middle_name: fields.middle_name.clone(),
            date_of_birth: fields.date_of_birth.clone(),
            gender: fields.gender.clone(),
            relation: relation.map(Into::into),
            baptism_date: fields.baptism_date.clone(),
            communion_date: fields.communion_date.clone(),
            confirmation_date: fields.confirmation_date.clone(),
            marital_status: fields.marital_status,
            marriage_date: fields.marriage_date.clone(),
            spouse_name: fields.spouse_name.clone(),
            created_at: now_ms(),
        };
        self.write_member(&member, "members_create").await?;
        Ok(member)
    }

    async fn update_member(&self, id: &str, patch: &MemberPatch) -> AppResult<Member> {
        let mut member = self
            .fetch_member(id, "members_update_lookup")
            .await?
            .ok_or_else(|| not_found("Member", id))?;
        member.apply_patch(patch);
        self.write_member(&member, "members_update").await?;
        Ok(member)
    }

    async fn delete_member(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| wrap_unexpected(err.into(), "members_delete"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("Member", id));
        }
        Ok(())
    }

    async fn assign_member(
        &self,
        member_id: &str,
        family_id: &str,
        relation: Option<&str>,
    ) -> AppResult<Member> {
        let mut member = self
            .fetch_member(member_id, "members_assign_lookup")
            .await?
            .ok_or_else(|| not_found("Member", member_id))?;
        member.family_id = Some(family_id.to_string());
        member.relation = relation.map(Into::into);
        self.write_member(&member, "members_assign").await?;
        Ok(member)
    }

    async fn unassign_member(&self, member_id: &str) -> AppResult<Member> {
        let mut member = self
            .fetch_member(member_id, "members_unassign_lookup")
            .await?
            .ok_or_else(|| not_found("Member", member_id))?;
        member.family_id = None;
        member.relation = None;
        self.write_member(&member, "members_unassign").await?;
        Ok(member)
    }
}
