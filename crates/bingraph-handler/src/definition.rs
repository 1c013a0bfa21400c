use serde::{Deserialize, Serialize};

use bingraph_binary::{BinaryResult, EntityRecord, LIST_MAXIMUM_LENGTH};
use bingraph_types::{ObjectId, TypeId};

use crate::member::{MemberKind, TypeMember};

/// Sum of member minimum lengths.
pub fn members_length_minimum(members: &[TypeMember]) -> u64 {
    members.iter().map(TypeMember::persisted_length_minimum).sum()
}

/// Sum of member maximum lengths, saturating at the list maximum.
pub fn members_length_maximum(members: &[TypeMember]) -> u64 {
    members
        .iter()
        .map(TypeMember::persisted_length_maximum)
        .fold(0u64, |acc, len| acc.saturating_add(len))
        .min(LIST_MAXIMUM_LENGTH)
}

/// The persisted shape of one type: its id, name and ordered members.
///
/// A definition outlives the handler that produced it. Once a record has
/// been written under a [`TypeId`], the definition registered for that id
/// is what a later process uses to interpret it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub type_id: TypeId,
    pub type_name: String,
    pub members: Vec<TypeMember>,
}

impl TypeDefinition {
    pub fn new(type_id: TypeId, type_name: impl Into<String>, members: Vec<TypeMember>) -> Self {
        Self {
            type_id,
            type_name: type_name.into(),
            members,
        }
    }

    pub fn persisted_length_minimum(&self) -> u64 {
        members_length_minimum(&self.members)
    }

    pub fn persisted_length_maximum(&self) -> u64 {
        members_length_maximum(&self.members)
    }

    pub fn has_persisted_references(&self) -> bool {
        self.members.iter().any(TypeMember::has_references)
    }

    pub fn has_variable_length(&self) -> bool {
        self.members.iter().any(TypeMember::is_variable_length)
    }

    /// Find a member by name.
    pub fn member(&self, name: &str) -> Option<(usize, &TypeMember)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, member)| member.name == name)
    }

    /// Returns `true` if `other` lays out its members identically.
    pub fn same_layout(&self, other: &[TypeMember]) -> bool {
        self.members == other
    }

    /// Payload offsets of every member, or `None` if any member is variable
    /// length and offsets depend on the record.
    pub fn fixed_offsets(&self) -> Option<Vec<u64>> {
        if self.has_variable_length() {
            return None;
        }
        let mut offset = 0;
        Some(
            self.members
                .iter()
                .map(|member| {
                    let at = offset;
                    offset += member.persisted_length_minimum();
                    at
                })
                .collect(),
        )
    }

    /// Payload offsets of every member within `record`, walking list
    /// headers for variable-length members.
    pub fn member_offsets(&self, record: &EntityRecord<'_>) -> BinaryResult<Vec<u64>> {
        walk_offsets(&self.members, record)
    }

    /// Visit every reference held by `record` under this definition.
    pub fn iterate_record_references(
        &self,
        record: &EntityRecord<'_>,
        visit: &mut dyn FnMut(ObjectId),
    ) -> BinaryResult<()> {
        iterate_member_references(&self.members, record, visit)
    }
}

/// Offsets of `members` within `record`, in declaration order.
pub fn walk_offsets(members: &[TypeMember], record: &EntityRecord<'_>) -> BinaryResult<Vec<u64>> {
    walk(members, record).map(|(offsets, _)| offsets)
}

/// Payload bytes `members` occupy within `record`. Every list is checked
/// against the payload on the way.
pub fn walked_length(members: &[TypeMember], record: &EntityRecord<'_>) -> BinaryResult<u64> {
    walk(members, record).map(|(_, end)| end)
}

fn walk(members: &[TypeMember], record: &EntityRecord<'_>) -> BinaryResult<(Vec<u64>, u64)> {
    let mut offsets = Vec::with_capacity(members.len());
    let mut offset = 0u64;
    for member in members {
        offsets.push(offset);
        let length = match member.element_width() {
            Some(width) => record.list_length(offset, width)?,
            None => member.persisted_length_minimum(),
        };
        offset = offset.saturating_add(length);
    }
    Ok((offsets, offset))
}

/// Visit every reference `members` hold within `record`.
pub fn iterate_member_references(
    members: &[TypeMember],
    record: &EntityRecord<'_>,
    visit: &mut dyn FnMut(ObjectId),
) -> BinaryResult<()> {
    if !members.iter().any(TypeMember::has_references) {
        return Ok(());
    }
    let offsets = walk_offsets(members, record)?;
    for (member, offset) in members.iter().zip(offsets) {
        visit_member_references(member, offset, record, visit)?;
    }
    Ok(())
}

/// Visit the references of the single `member` stored at `offset`.
pub fn visit_member_references(
    member: &TypeMember,
    offset: u64,
    record: &EntityRecord<'_>,
    visit: &mut dyn FnMut(ObjectId),
) -> BinaryResult<()> {
    match &member.kind {
        MemberKind::Reference => visit(record.read_object_id(offset)?),
        MemberKind::References => {
            record.iterate_references(offset, visit)?;
        }
        MemberKind::Complex { .. } => {
            let ref_offsets = member.element_reference_offsets();
            if ref_offsets.is_empty() {
                return Ok(());
            }
            let width = member.element_width().unwrap_or(0);
            record.list_length(offset, width)?;
            for index in 0..record.list_element_count(offset)? {
                let element = offset + 8 + index * width;
                for ref_offset in &ref_offsets {
                    visit(record.read_object_id(element + ref_offset)?);
                }
            }
        }
        _ => {}
    }
    Ok(())
}
