use super::*;
use log::error;

impl Format {
    /// Check the schema for consistency.
    ///
    /// Ranges must not be inverted and no two TLVs at the same nesting level
    /// may share a tag, including TLVs of flattened members. A format that
    /// fails this check is a programming error.
    pub fn is_valid(&self) -> bool {
        match self {
            Format::Separator | Format::Enum(_) | Format::Value(_) => true,
            Format::UInt8(f) => is_range_valid(f.min, f.max),
            Format::UInt16(f) => is_range_valid(f.min, f.max),
            Format::UInt32(f) => is_range_valid(f.min, f.max),
            Format::UInt64(f) => is_range_valid(f.min, f.max),
            Format::Int8(f) => is_range_valid(f.min, f.max),
            Format::Int16(f) => is_range_valid(f.min, f.max),
            Format::Int32(f) => is_range_valid(f.min, f.max),
            Format::Int64(f) => is_range_valid(f.min, f.max),
            Format::Data(f) => is_range_valid(f.min_len, f.max_len),
            Format::String(f) => is_range_valid(f.min_len, f.max_len),
            Format::Sequence(f) => is_sequence_valid(f),
            Format::Struct(f) => is_struct_valid(f),
            Format::Union(f) => is_union_valid(f),
        }
    }
}

fn is_range_valid<T: PartialOrd + std::fmt::Display>(min: T, max: T) -> bool {
    if min > max {
        error!("Inverted range: {} > {}.", min, max);
        return false;
    }
    true
}

// Separators only make sense between sequence items
fn is_child_valid(tag: u8, name: &str, format: &Format) -> bool {
    if let Format::Separator = format {
        error!("[{:02X} {}] Separator format outside of a sequence.", tag, name);
        return false;
    }
    format.is_valid()
}

fn is_sequence_valid(f: &SequenceFormat) -> bool {
    let item = &f.item;
    let separator = &f.separator;
    if !is_child_valid(item.tag, item.name, item.format) {
        return false;
    }
    if !matches!(separator.format, Format::Separator) {
        error!(
            "[{:02X} {}] Sequence separator does not use the separator format.",
            separator.tag, separator.name
        );
        return false;
    }
    if item.flat {
        if !matches!(item.format, Format::Union(_)) {
            error!("[{}] Flattened sequence item is not a union.", item.name);
            return false;
        }
        if item.format.uses_tag(separator.tag) {
            error!(
                "[{}] Flattened sequence item uses the separator tag [{:02X}].",
                item.name, separator.tag
            );
            return false;
        }
    } else if item.tag == separator.tag {
        error!(
            "[{:02X} {}] Sequence item uses the separator tag.",
            item.tag, item.name
        );
        return false;
    }
    true
}

fn member_tags(member: &StructMember) -> TagSet {
    if member.flat {
        member.format.tags()
    } else {
        let mut tags = TagSet::default();
        tags.insert(member.tag);
        tags
    }
}

fn is_struct_valid(f: &StructFormat) -> bool {
    for (i, member) in f.members.iter().enumerate() {
        if !is_child_valid(member.tag, member.name, member.format) {
            return false;
        }
        if member.flat {
            if !matches!(member.format, Format::Struct(_) | Format::Union(_)) {
                error!("[{}] Flattened member is not a struct or union.", member.name);
                return false;
            }
            if member.optional {
                error!("[{}] Flattened member is optional.", member.name);
                return false;
            }
        }

        let tags = member_tags(member);
        if let Some(other) = f.members[..i]
            .iter()
            .find(|other| member_tags(other).intersects(&tags))
        {
            error!(
                "[{}] Member TLV types collide with [{}].",
                member.name, other.name
            );
            return false;
        }
    }
    true
}

fn is_union_valid(f: &UnionFormat) -> bool {
    for (i, variant) in f.variants.iter().enumerate() {
        if !is_child_valid(variant.tag, variant.name, variant.format) {
            return false;
        }
        if let Some(other) = f.variants[..i].iter().find(|other| other.tag == variant.tag) {
            error!(
                "[{:02X} {}] Variant TLV type collides with [{}].",
                variant.tag, variant.name, other.name
            );
            return false;
        }
    }
    true
}
