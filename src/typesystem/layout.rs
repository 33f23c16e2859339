//! Instance and static field layout.
//!
//! Fields are sorted by size (stable, so equally sized fields keep declaration order) and packed
//! at increasing offsets. The running offset is re-aligned to a field's alignment whenever the
//! field is larger than its predecessor, or when the offset does not satisfy the field's
//! alignment. Fields of one size class therefore form a group that starts aligned to its own
//! size. The total is rounded up to the largest alignment seen.

use log::debug;

use crate::{
    metadata::signatures::SignatureParser,
    typesystem::{
        align_up, ClassId, FieldId, LoadLevel, TypeDesc, TypeSystem, VarDesc, POINTER_SIZE,
    },
    Result,
};

/// Size and alignment of one field to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    /// Bytes the field occupies
    pub size: usize,
    /// Required alignment of the field's offset
    pub alignment: usize,
}

/// Result of [`pack_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedLayout {
    /// Offset of every slot, in the order the slots were passed
    pub offsets: Vec<usize>,
    /// Total size, rounded up to `alignment`
    pub size: usize,
    /// Largest alignment of all slots (at least `base_alignment`)
    pub alignment: usize,
}

/// Place `slots` starting at `start`
///
/// ## Arguments
/// * 'start'           - First usable offset, the parent's instance size for derived classes
/// * 'base_alignment'  - Alignment already required by the parent
/// * 'slots'           - The fields to place, in declaration order
#[must_use]
pub fn pack_fields(start: usize, base_alignment: usize, slots: &[FieldSlot]) -> PackedLayout {
    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.sort_by_key(|&index| slots[index].size);

    let mut offsets = vec![0; slots.len()];
    let mut offset = start;
    let mut previous_size = 0;
    let mut alignment = base_alignment.max(1);

    for index in order {
        let slot = slots[index];
        let slot_alignment = slot.alignment.max(1);

        if slot.size > previous_size || offset % slot_alignment != 0 {
            offset = align_up(offset, slot_alignment);
        }

        offsets[index] = offset;
        offset += slot.size;
        previous_size = slot.size;
        alignment = alignment.max(slot_alignment);
    }

    PackedLayout {
        offsets,
        size: align_up(offset, alignment),
        alignment,
    }
}

impl TypeSystem {
    /// Size and alignment of a slot of type `ty`
    ///
    /// # Errors
    /// Returns [`crate::execution::ExecutionError::ClassNotLoaded`] for a value type whose
    /// instance layout is not computed yet.
    pub fn slot_layout(&self, ty: &TypeDesc) -> Result<(usize, usize)> {
        if ty.is_pointer_sized() {
            return Ok((POINTER_SIZE, POINTER_SIZE));
        }

        if let Some(size) = ty.element.primitive_size() {
            return Ok((size, size.max(1)));
        }

        let class = ty.class.and_then(|id| self.class(id));
        match class {
            Some(class) if class.load_level >= LoadLevel::InstanceFieldsLoaded => {
                Ok((class.instance_size, class.alignment))
            }
            Some(class) => Err(crate::execution::ExecutionError::ClassNotLoaded(
                class.full_name(),
            )
            .into()),
            None => Err(malformed_error!("Value type slot without a resolved class")),
        }
    }

    /// Compute the instance layout of `id`, and of its parents and value type fields first
    pub(crate) fn layout_instance(&mut self, id: ClassId) -> Result<()> {
        let Some(class) = self.classes.get_mut(id.index()) else {
            return Err(malformed_error!("Layout requested for unknown {}", id));
        };

        match class.load_level {
            LoadLevel::InstanceFieldsInProgress => {
                return Err(malformed_error!(
                    "Cyclic layout, {} contains itself",
                    class.full_name()
                ));
            }
            LoadLevel::InstanceFieldsLoaded | LoadLevel::StaticFieldsLoaded => return Ok(()),
            LoadLevel::NotLoaded => class.load_level = LoadLevel::InstanceFieldsInProgress,
        }

        let parent = class.parent;
        let is_value_type = class.is_value_type;
        let field_range = class.fields;

        let (start, base_alignment) = match parent {
            Some(parent) => {
                self.layout_instance(parent)?;
                let parent = &self.classes[parent.index()];
                (parent.instance_size, parent.alignment)
            }
            None => (0, 1),
        };

        let field_ids: Vec<FieldId> = field_range
            .iter()
            .map(FieldId::new)
            .filter(|field| !self.fields[field.index()].is_static())
            .collect();
        let (types, slots) = self.field_slots(&field_ids)?;

        let packed = pack_fields(start, base_alignment, &slots);
        for (index, field) in field_ids.iter().enumerate() {
            self.fields[field.index()].var = VarDesc {
                offset: packed.offsets[index],
                size: slots[index].size,
                ty: types[index],
            };
        }

        let class = &mut self.classes[id.index()];
        class.instance_size = if is_value_type && packed.size == 0 {
            1
        } else {
            packed.size
        };
        class.alignment = packed.alignment;
        class.load_level = LoadLevel::InstanceFieldsLoaded;

        debug!(
            "instance layout {} - {} bytes, align {}, {} fields",
            class.full_name(),
            class.instance_size,
            class.alignment,
            field_ids.len()
        );

        Ok(())
    }

    /// Compute the static layout of `id` and allocate its storage
    pub(crate) fn layout_statics(&mut self, id: ClassId) -> Result<()> {
        self.layout_instance(id)?;

        let class = &self.classes[id.index()];
        if class.load_level >= LoadLevel::StaticFieldsLoaded {
            return Ok(());
        }

        let field_ids: Vec<FieldId> = class
            .fields
            .iter()
            .map(FieldId::new)
            .filter(|field| self.fields[field.index()].has_static_storage())
            .collect();
        let (types, slots) = self.field_slots(&field_ids)?;

        let packed = pack_fields(0, 1, &slots);
        for (index, field) in field_ids.iter().enumerate() {
            self.fields[field.index()].var = VarDesc {
                offset: packed.offsets[index],
                size: slots[index].size,
                ty: types[index],
            };
        }

        let class = &mut self.classes[id.index()];
        class.static_size = if field_ids.is_empty() { 0 } else { packed.size };
        if class.static_size > 0 {
            let storage = class.statics.get_mut().map_err(|_| crate::Error::LockError)?;
            *storage = vec![0; class.static_size];
        }
        class.load_level = LoadLevel::StaticFieldsLoaded;

        Ok(())
    }

    /// Resolve the types of `fields` and make sure their value type classes are laid out
    fn field_slots(&mut self, fields: &[FieldId]) -> Result<(Vec<TypeDesc>, Vec<FieldSlot>)> {
        let mut types = Vec::with_capacity(fields.len());
        let mut slots = Vec::with_capacity(fields.len());

        for field in fields {
            let desc = &self.fields[field.index()];
            let signature = SignatureParser::new(&desc.signature).parse_field_signature()?;
            let ty = self.type_desc(desc.module, &signature)?;

            if ty.is_inline_value_type() {
                if let Some(class) = ty.class {
                    self.layout_instance(class)?;
                }
            }

            let (size, alignment) = self.slot_layout(&ty)?;
            types.push(ty);
            slots.push(FieldSlot { size, alignment });
        }

        Ok((types, slots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(sizes: &[usize]) -> Vec<FieldSlot> {
        sizes
            .iter()
            .map(|&size| FieldSlot {
                size,
                alignment: size,
            })
            .collect()
    }

    fn sorted_offsets(layout: &PackedLayout) -> Vec<usize> {
        let mut offsets = layout.offsets.clone();
        offsets.sort_unstable();
        offsets
    }

    #[test]
    fn mixed_sizes_are_order_independent() {
        let orders: [&[usize]; 4] = [
            &[1, 1, 2, 4, 8],
            &[8, 4, 2, 1, 1],
            &[4, 1, 8, 1, 2],
            &[1, 8, 2, 1, 4],
        ];

        for order in orders {
            let layout = pack_fields(0, 1, &slots(order));
            assert_eq!(sorted_offsets(&layout), vec![0, 1, 2, 4, 8]);
            assert_eq!(layout.size, 16);
            assert_eq!(layout.alignment, 8);

            for (index, &size) in order.iter().enumerate() {
                assert_eq!(layout.offsets[index] % size, 0);
            }
        }
    }

    #[test]
    fn padding_between_groups() {
        let layout = pack_fields(0, 1, &slots(&[1, 8]));
        assert_eq!(layout.offsets, vec![0, 8]);
        assert_eq!(layout.size, 16);

        let layout = pack_fields(0, 1, &slots(&[2, 2, 2]));
        assert_eq!(layout.offsets, vec![0, 2, 4]);
        assert_eq!(layout.size, 6);
        assert_eq!(layout.alignment, 2);
    }

    #[test]
    fn derived_layout_starts_after_parent() {
        let layout = pack_fields(12, 4, &slots(&[4, 8]));
        assert_eq!(layout.offsets, vec![12, 16]);
        assert_eq!(layout.size, 24);
        assert_eq!(layout.alignment, 8);
    }

    #[test]
    fn misaligned_group_is_realigned() {
        let layout = pack_fields(
            0,
            1,
            &[
                FieldSlot {
                    size: 2,
                    alignment: 1,
                },
                FieldSlot {
                    size: 8,
                    alignment: 8,
                },
                FieldSlot {
                    size: 8,
                    alignment: 1,
                },
            ],
        );
        assert_eq!(layout.offsets, vec![0, 8, 16]);
        assert_eq!(layout.size, 24);
    }

    #[test]
    fn empty() {
        let layout = pack_fields(0, 1, &[]);
        assert!(layout.offsets.is_empty());
        assert_eq!(layout.size, 0);
        assert_eq!(layout.alignment, 1);
    }
}
