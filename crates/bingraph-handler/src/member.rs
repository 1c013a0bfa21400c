use serde::{Deserialize, Serialize};

use bingraph_binary::{PrimitiveType, LIST_HEADER_LENGTH, LIST_MAXIMUM_LENGTH, OBJECT_ID_LENGTH};

/// How a member is laid out in a record payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberKind {
    /// A fixed-length value.
    Primitive { primitive: PrimitiveType },
    /// A single object reference.
    Reference,
    /// A character sequence, stored as a list of UTF-8 bytes.
    Chars,
    /// A byte list.
    Bytes,
    /// A list of fixed-length values.
    PrimitiveList { element: PrimitiveType },
    /// A list of object references.
    References,
    /// A list of compound elements, each made of fixed-length members.
    Complex { elements: Vec<TypeMember> },
}

/// One persisted field of a type shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMember {
    pub name: String,
    /// Declared type name. For primitives this is the primitive's name.
    pub type_name: String,
    pub kind: MemberKind,
}

impl TypeMember {
    pub fn primitive(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            type_name: primitive.name().to_string(),
            kind: MemberKind::Primitive { primitive },
        }
    }

    pub fn reference(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: MemberKind::Reference,
        }
    }

    pub fn chars(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "chars".into(),
            kind: MemberKind::Chars,
        }
    }

    pub fn bytes(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "bytes".into(),
            kind: MemberKind::Bytes,
        }
    }

    pub fn primitive_list(name: impl Into<String>, element: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            type_name: format!("[{}]", element.name()),
            kind: MemberKind::PrimitiveList { element },
        }
    }

    pub fn references(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "[reference]".into(),
            kind: MemberKind::References,
        }
    }

    pub fn complex(name: impl Into<String>, elements: Vec<TypeMember>) -> Self {
        Self {
            name: name.into(),
            type_name: "[complex]".into(),
            kind: MemberKind::Complex { elements },
        }
    }

    /// The primitive kind of a fixed-length value member.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match &self.kind {
            MemberKind::Primitive { primitive } => Some(*primitive),
            _ => None,
        }
    }

    /// Returns `true` for a single reference field.
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, MemberKind::Reference)
    }

    /// Returns `true` if the member holds any references, directly or in
    /// its list elements.
    pub fn has_references(&self) -> bool {
        match &self.kind {
            MemberKind::Reference | MemberKind::References => true,
            MemberKind::Complex { elements } => elements.iter().any(TypeMember::has_references),
            _ => false,
        }
    }

    /// Returns `true` for list members.
    pub fn is_variable_length(&self) -> bool {
        !matches!(
            self.kind,
            MemberKind::Primitive { .. } | MemberKind::Reference
        )
    }

    /// Width of one list element, `None` for fixed-length members.
    pub fn element_width(&self) -> Option<u64> {
        match &self.kind {
            MemberKind::Primitive { .. } | MemberKind::Reference => None,
            MemberKind::Chars | MemberKind::Bytes => Some(1),
            MemberKind::PrimitiveList { element } => Some(element.byte_size()),
            MemberKind::References => Some(OBJECT_ID_LENGTH),
            MemberKind::Complex { elements } => Some(
                elements
                    .iter()
                    .map(TypeMember::persisted_length_minimum)
                    .sum(),
            ),
        }
    }

    /// Smallest number of bytes the member can occupy.
    pub fn persisted_length_minimum(&self) -> u64 {
        match &self.kind {
            MemberKind::Primitive { primitive } => primitive.byte_size(),
            MemberKind::Reference => OBJECT_ID_LENGTH,
            _ => LIST_HEADER_LENGTH,
        }
    }

    /// Largest number of bytes the member can occupy.
    pub fn persisted_length_maximum(&self) -> u64 {
        if self.is_variable_length() {
            LIST_MAXIMUM_LENGTH
        } else {
            self.persisted_length_minimum()
        }
    }

    /// Offsets of the reference members inside one complex list element.
    pub fn element_reference_offsets(&self) -> Vec<u64> {
        let MemberKind::Complex { elements } = &self.kind else {
            return Vec::new();
        };
        let mut offset = 0;
        let mut offsets = Vec::new();
        for element in elements {
            if element.is_reference() {
                offsets.push(offset);
            }
            offset += element.persisted_length_minimum();
        }
        offsets
    }
}
