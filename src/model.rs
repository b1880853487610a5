use serde::{Deserialize, Serialize};

pub const VALIDATION_EMPTY_FIELD: &str = "VALIDATION/EMPTY_FIELD";
pub const VALIDATION_INVALID_DATE: &str = "VALIDATION/INVALID_DATE";
pub const VALIDATION_MARITAL_FIELDS: &str = "VALIDATION/MARITAL_FIELDS";

pub const FAMILY_DUPLICATE_NAME: &str = "FAMILY/DUPLICATE_NAME";
pub const FAMILY_NOT_FOUND: &str = "FAMILY/NOT_FOUND";
pub const MEMBER_NOT_FOUND: &str = "MEMBER/NOT_FOUND";
pub const MEMBERSHIP_DUPLICATE: &str = "MEMBERSHIP/DUPLICATE";
pub const MEMBERSHIP_NOT_FOUND: &str = "MEMBERSHIP/NOT_FOUND";
pub const MEMBERSHIP_ALREADY_ASSIGNED: &str = "MEMBERSHIP/ALREADY_ASSIGNED";

pub const GATEWAY_FAIL: &str = "GATEWAY/FAIL";
pub const GATEWAY_NOT_FOUND: &str = "GATEWAY/NOT_FOUND";
pub const GATEWAY_DECODE: &str = "GATEWAY/DECODE";
pub const GENERIC_FAIL: &str = "GENERIC/FAIL";
pub const GENERIC_FAIL_MESSAGE: &str = "Something went wrong. Please try again.";

pub const ROLE_OPTIONS: &[&str] = &["Father", "Mother", "Child", "Guardian", "Other"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Family {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    /// Small-community label; "jumuiya" in the dashboard's parlance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
}

impl Default for MaritalStatus {
    fn default() -> Self {
        MaritalStatus::Single
    }
}

impl MaritalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "single",
            MaritalStatus::Married => "married",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(MaritalStatus::Single),
            "married" => Some(MaritalStatus::Married),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Member {
    pub id: String,
    /// Owning family, if any. A member belongs to at most one family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Role label inside the family ("Father", "Child", free text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baptism_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communion_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_date: Option<String>,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    /// Present only while `marital_status` is married.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marriage_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse_name: Option<String>,
    pub created_at: i64,
}

impl Family {
    /// Folds a patch into the record. Names are stored trimmed.
    pub fn apply_patch(&mut self, patch: &FamilyPatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(parish) = &patch.parish {
            self.parish = Some(parish.clone());
        }
        if let Some(province) = &patch.province {
            self.province = Some(province.clone());
        }
        if let Some(subgroup) = &patch.subgroup {
            self.subgroup = Some(subgroup.clone());
        }
    }
}

impl Member {
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Folds a patch into the record. Clearing the marital status back to
    /// single also clears the marriage date and spouse name.
    pub fn apply_patch(&mut self, patch: &MemberPatch) {
        if let Some(first_name) = &patch.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &patch.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(middle_name) = &patch.middle_name {
            self.middle_name = Some(middle_name.clone());
        }
        if let Some(date_of_birth) = &patch.date_of_birth {
            self.date_of_birth = Some(date_of_birth.clone());
        }
        if let Some(gender) = &patch.gender {
            self.gender = Some(gender.clone());
        }
        if let Some(relation) = &patch.relation {
            self.relation = Some(relation.clone());
        }
        if let Some(baptism_date) = &patch.baptism_date {
            self.baptism_date = Some(baptism_date.clone());
        }
        if let Some(communion_date) = &patch.communion_date {
            self.communion_date = Some(communion_date.clone());
        }
        if let Some(confirmation_date) = &patch.confirmation_date {
            self.confirmation_date = Some(confirmation_date.clone());
        }
        if let Some(status) = patch.marital_status {
            self.marital_status = status;
        }
        if let Some(marriage_date) = &patch.marriage_date {
            self.marriage_date = Some(marriage_date.clone());
        }
        if let Some(spouse_name) = &patch.spouse_name {
            self.spouse_name = Some(spouse_name.clone());
        }
        if self.marital_status == MaritalStatus::Single {
            self.marriage_date = None;
            self.spouse_name = None;
        }
    }
}

/// Fields accepted when creating a family. The store or gateway assigns
/// `id` and `created_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FamilyCreatePayload {
    pub name: String,
    #[serde(default)]
    pub parish: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
}

/// Partial family update. Only these fields are legal to patch; anything
/// else is rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parish: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
}

impl FamilyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parish.is_none()
            && self.province.is_none()
            && self.subgroup.is_none()
    }
}

/// Fields accepted when creating a member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMember {
    #[serde(alias = "firstName")]
    pub first_name: String,
    #[serde(alias = "lastName")]
    pub last_name: String,
    #[serde(default, alias = "middleName")]
    pub middle_name: Option<String>,
    #[serde(default, alias = "dateOfBirth")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, alias = "baptismDate")]
    pub baptism_date: Option<String>,
    #[serde(default, alias = "communionDate")]
    pub communion_date: Option<String>,
    #[serde(default, alias = "confirmationDate")]
    pub confirmation_date: Option<String>,
    #[serde(default, alias = "maritalStatus")]
    pub marital_status: MaritalStatus,
    #[serde(default, alias = "marriageDate")]
    pub marriage_date: Option<String>,
    #[serde(default, alias = "spouseName")]
    pub spouse_name: Option<String>,
}

/// Partial member update. Unknown fields are rejected at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberPatch {
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "middleName")]
    pub middle_name: Option<String>,
    #[serde(default, alias = "dateOfBirth")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default, alias = "baptismDate")]
    pub baptism_date: Option<String>,
    #[serde(default, alias = "communionDate")]
    pub communion_date: Option<String>,
    #[serde(default, alias = "confirmationDate")]
    pub confirmation_date: Option<String>,
    #[serde(default, alias = "maritalStatus")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default, alias = "marriageDate")]
    pub marriage_date: Option<String>,
    #[serde(default, alias = "spouseName")]
    pub spouse_name: Option<String>,
}

/// A family together with its member records, for the detail drawer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FamilyWithMembers {
    #[serde(flatten)]
    pub family: Family,
    pub members: Vec<Member>,
}
