use std::collections::HashMap;

use crate::model::{Family, Member};

/// In-memory snapshot of the loaded registry. Single source of truth for the
/// presentation layer; the durable copy lives behind the persistence gateway.
///
/// Every mutation bumps `revision`, which memoized views key on.
#[derive(Debug, Default)]
pub struct EntityStore {
    families: Vec<Family>,
    members: Vec<Member>,
    member_counts: HashMap<String, usize>,
    revision: u64,
}

/// Pre-image of a cascade removal, kept so a failed remote delete can be
/// compensated by restoring the records at their original positions.
#[derive(Debug, Clone)]
pub struct CascadeRemoval {
    pub family_pos: usize,
    pub family: Family,
    pub members: Vec<(usize, Member)>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn family(&self, id: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.id == id)
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn member_count_of(&self, family_id: &str) -> usize {
        self.member_counts.get(family_id).copied().unwrap_or(0)
    }

    pub fn members_of(&self, family_id: &str) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.family_id.as_deref() == Some(family_id))
            .cloned()
            .collect()
    }

    pub fn unassigned_members(&self) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.family_id.is_none())
            .cloned()
            .collect()
    }

    /// Atomic bulk replacement after a successful load. A later load fully
    /// supersedes an earlier one.
    pub fn replace_all(&mut self, families: Vec<Family>, members: Vec<Member>) {
        self.families = families;
        self.members = members;
        self.rebuild_counts();
        self.touch();
    }

    /// New records go first, matching the dashboard's newest-first display.
    pub fn insert_family(&mut self, family: Family) {
        self.member_counts.entry(family.id.clone()).or_insert(0);
        self.families.insert(0, family);
        self.touch();
    }

    /// Replaces the family with the given id in place. Returns false when the
    /// id is no longer present (a later load superseded the record).
    pub fn replace_family(&mut self, id: &str, family: Family) -> bool {
        let Some(pos) = self.families.iter().position(|f| f.id == id) else {
            return false;
        };
        if family.id != id {
            // Provisional id swapped for the durable one; carry members over.
            let count = self.member_counts.remove(id).unwrap_or(0);
            self.member_counts.insert(family.id.clone(), count);
            for member in &mut self.members {
                if member.family_id.as_deref() == Some(id) {
                    member.family_id = Some(family.id.clone());
                }
            }
        }
        self.families[pos] = family;
        self.touch();
        true
    }

    /// Removes the family and every member it owns. Cascade is part of the
    /// same logical operation; the pre-image supports rollback.
    pub fn remove_family(&mut self, id: &str) -> Option<CascadeRemoval> {
        let family_pos = self.families.iter().position(|f| f.id == id)?;
        let family = self.families.remove(family_pos);
        self.member_counts.remove(id);

        let mut removed = Vec::new();
        let mut idx = 0;
        self.members.retain(|m| {
            let owned = m.family_id.as_deref() == Some(id);
            if owned {
                removed.push((idx, m.clone()));
            }
            idx += 1;
            !owned
        });

        self.touch();
        Some(CascadeRemoval {
            family_pos,
            family,
            members: removed,
        })
    }

    /// Restores a cascade pre-image after a failed remote delete. Records a
    /// superseding load already brought back are skipped; the snapshot wins
    /// over a stale rollback.
    pub fn restore_cascade(&mut self, removal: CascadeRemoval) {
        let mut changed = false;
        if self.family(&removal.family.id).is_none() {
            let pos = removal.family_pos.min(self.families.len());
            self.member_counts.entry(removal.family.id.clone()).or_insert(0);
            self.families.insert(pos, removal.family);
            changed = true;
        }
        for (idx, member) in removal.members {
            if self.member(&member.id).is_some() {
                continue;
            }
            let pos = idx.min(self.members.len());
            if let Some(family_id) = member.family_id.as_deref() {
                *self.member_counts.entry(family_id.to_string()).or_insert(0) += 1;
            }
            self.members.insert(pos, member);
            changed = true;
        }
        if changed {
            self.touch();
        }
    }

    pub fn insert_member(&mut self, member: Member) {
        if let Some(family_id) = member.family_id.as_deref() {
            *self.member_counts.entry(family_id.to_string()).or_insert(0) += 1;
        }
        self.members.insert(0, member);
        self.touch();
    }

    /// Replaces the member with the given id in place, keeping the count
    /// index consistent when the owning family changes.
    pub fn replace_member(&mut self, id: &str, member: Member) -> bool {
        let Some(pos) = self.members.iter().position(|m| m.id == id) else {
            return false;
        };
        let old_family = self.members[pos].family_id.clone();
        if old_family != member.family_id {
            if let Some(family_id) = old_family.as_deref() {
                if let Some(count) = self.member_counts.get_mut(family_id) {
                    *count = count.saturating_sub(1);
                }
            }
            if let Some(family_id) = member.family_id.as_deref() {
                *self.member_counts.entry(family_id.to_string()).or_insert(0) += 1;
            }
        }
        self.members[pos] = member;
        self.touch();
        true
    }

    pub fn remove_member(&mut self, id: &str) -> Option<(usize, Member)> {
        let pos = self.members.iter().position(|m| m.id == id)?;
        let member = self.members.remove(pos);
        if let Some(family_id) = member.family_id.as_deref() {
            if let Some(count) = self.member_counts.get_mut(family_id) {
                *count = count.saturating_sub(1);
            }
        }
        self.touch();
        Some((pos, member))
    }

    /// Reinserts a previously removed member at its original position, unless
    /// a superseding load already brought the record back.
    pub fn restore_member(&mut self, pos: usize, member: Member) {
        if self.member(&member.id).is_some() {
            return;
        }
        if let Some(family_id) = member.family_id.as_deref() {
            *self.member_counts.entry(family_id.to_string()).or_insert(0) += 1;
        }
        let pos = pos.min(self.members.len());
        self.members.insert(pos, member);
        self.touch();
    }

    fn rebuild_counts(&mut self) {
        self.member_counts.clear();
        for family in &self.families {
            self.member_counts.insert(family.id.clone(), 0);
        }
        for member in &self.members {
            if let Some(family_id) = member.family_id.as_deref() {
                *self.member_counts.entry(family_id.to_string()).or_insert(0) += 1;
            }
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
