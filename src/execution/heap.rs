//! Object Allocator: a bump allocator over one byte arena.
//!
//! Every object starts with an [`OBJECT_HEADER_SIZE`] byte header whose first four bytes hold the
//! owning [`ClassId`], followed by the instance storage laid out per the class' field offsets.
//! Objects are placed at 8-byte aligned offsets and the returned [`ObjectRef`] is that offset.
//! The first header slot of the arena is never handed out, so no object has the null reference.
//!
//! Storage is zero filled on allocation and never reclaimed.

use widestring::U16String;

use crate::{
    execution::{ExecutionError, ObjectRef},
    typesystem::{align_up, ClassId, EEClass, LoadLevel},
    Result,
};

/// Size of the per object header
pub const OBJECT_HEADER_SIZE: usize = 8;

/// Alignment of every object
const OBJECT_ALIGNMENT: usize = 8;

/// Bytes in front of the characters of a string object
const STRING_LENGTH_SIZE: usize = 4;

/// The managed heap of one [`crate::execution::Engine`].
pub struct ObjectHeap {
    data: Vec<u8>,
    capacity: usize,
    objects: usize,
}

impl ObjectHeap {
    /// Create an empty heap that can grow up to `capacity` bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ObjectHeap {
            data: vec![0; OBJECT_HEADER_SIZE],
            capacity,
            objects: 0,
        }
    }

    /// Allocate an instance of `class`
    ///
    /// ## Arguments
    /// * 'class'   - The class descriptor, its instance layout must be computed
    /// * 'id'      - The id stamped into the header
    ///
    /// # Errors
    /// Returns [`ExecutionError::ClassNotLoaded`] if the class' instance layout is not computed,
    /// and [`ExecutionError::OutOfMemory`] when the heap is exhausted.
    pub fn allocate(&mut self, class: &EEClass, id: ClassId) -> Result<ObjectRef> {
        if class.load_level < LoadLevel::InstanceFieldsLoaded {
            return Err(ExecutionError::ClassNotLoaded(class.full_name()).into());
        }

        self.reserve(id, class.instance_size)
    }

    /// Allocate a string object holding `chars`
    ///
    /// The payload is the character count as `u32` followed by the UTF-16 code units.
    ///
    /// # Errors
    /// Returns [`ExecutionError::OutOfMemory`] when the heap is exhausted.
    pub fn allocate_string(&mut self, class: ClassId, chars: &[u16]) -> Result<ObjectRef> {
        let object = self.reserve(class, STRING_LENGTH_SIZE + chars.len() * 2)?;

        let mut payload = Vec::with_capacity(STRING_LENGTH_SIZE + chars.len() * 2);
        payload.extend_from_slice(&(chars.len() as u32).to_le_bytes());
        for char in chars {
            payload.extend_from_slice(&char.to_le_bytes());
        }
        self.write(object, 0, &payload)?;

        Ok(object)
    }

    /// Decode a string object allocated by [`ObjectHeap::allocate_string`]
    ///
    /// # Errors
    /// Returns [`ExecutionError::NullReference`] for `null` and
    /// [`ExecutionError::InvalidReference`] for references outside the heap.
    pub fn read_string(&self, object: ObjectRef) -> Result<U16String> {
        let length = self.read(object, 0, STRING_LENGTH_SIZE)?;
        let length = u32::from_le_bytes([length[0], length[1], length[2], length[3]]) as usize;

        let chars: Vec<u16> = self
            .read(object, STRING_LENGTH_SIZE, length * 2)?
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(U16String::from_vec(chars))
    }

    /// The class stamped into the header of `object`
    ///
    /// # Errors
    /// Returns [`ExecutionError::NullReference`] for `null` and
    /// [`ExecutionError::InvalidReference`] for references outside the heap.
    pub fn class_of(&self, object: ObjectRef) -> Result<ClassId> {
        let start = self.header(object)?;
        let header = &self.data[start..start + 4];

        Ok(ClassId::new(u32::from_le_bytes([
            header[0], header[1], header[2], header[3],
        ])))
    }

    /// Borrow `len` bytes of instance storage at `offset`
    ///
    /// # Errors
    /// Returns [`ExecutionError::NullReference`] for `null` and
    /// [`ExecutionError::InvalidReference`] if the range is outside the heap.
    pub fn read(&self, object: ObjectRef, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.storage(object, offset, len)?;
        Ok(&self.data[range])
    }

    /// Overwrite instance storage at `offset` with `bytes`
    ///
    /// # Errors
    /// Returns [`ExecutionError::NullReference`] for `null` and
    /// [`ExecutionError::InvalidReference`] if the range is outside the heap.
    pub fn write(&mut self, object: ObjectRef, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.storage(object, offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Bytes used by the arena, the reserved slot included
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.data.len()
    }

    /// Number of objects allocated so far
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects
    }

    fn reserve(&mut self, class: ClassId, payload: usize) -> Result<ObjectRef> {
        let offset = align_up(self.data.len(), OBJECT_ALIGNMENT);
        let end = offset + OBJECT_HEADER_SIZE + payload;
        if end > self.capacity || u32::try_from(offset).is_err() {
            return Err(ExecutionError::OutOfMemory {
                requested: OBJECT_HEADER_SIZE + payload,
                capacity: self.capacity,
            }
            .into());
        }

        self.data.resize(end, 0);
        self.data[offset..offset + 4].copy_from_slice(&class.value().to_le_bytes());
        self.objects += 1;

        Ok(ObjectRef::new(offset as u32))
    }

    fn header(&self, object: ObjectRef) -> Result<usize> {
        if object.is_null() {
            return Err(ExecutionError::NullReference.into());
        }

        let start = object.value() as usize;
        if start % OBJECT_ALIGNMENT != 0 || start + OBJECT_HEADER_SIZE > self.data.len() {
            return Err(ExecutionError::InvalidReference(object.value()).into());
        }

        Ok(start)
    }

    fn storage(
        &self,
        object: ObjectRef,
        offset: usize,
        len: usize,
    ) -> Result<std::ops::Range<usize>> {
        let start = self.header(object)? + OBJECT_HEADER_SIZE + offset;
        let end = start + len;
        if end > self.data.len() {
            return Err(ExecutionError::InvalidReference(object.value()).into());
        }

        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::EEClass;

    fn loaded_class(instance_size: usize) -> EEClass {
        let mut class = EEClass::synthetic("Tests", "Point");
        class.instance_size = instance_size;
        class.load_level = LoadLevel::InstanceFieldsLoaded;
        class
    }

    #[test]
    fn allocate_stamps_header() {
        let mut heap = ObjectHeap::with_capacity(1024);
        let class = loaded_class(12);

        let first = heap.allocate(&class, ClassId::new(7)).unwrap();
        let second = heap.allocate(&class, ClassId::new(9)).unwrap();

        assert!(!first.is_null());
        assert_eq!(first.value() % 8, 0);
        assert_eq!(second.value() % 8, 0);
        assert!(second.value() >= first.value() + 20);
        assert_eq!(heap.class_of(first).unwrap(), ClassId::new(7));
        assert_eq!(heap.class_of(second).unwrap(), ClassId::new(9));
        assert_eq!(heap.object_count(), 2);
        assert_eq!(heap.read(first, 0, 12).unwrap(), &[0; 12]);
    }

    #[test]
    fn read_write_fields() {
        let mut heap = ObjectHeap::with_capacity(1024);
        let object = heap.allocate(&loaded_class(8), ClassId::new(1)).unwrap();

        heap.write(object, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(heap.read(object, 0, 8).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(heap.write(object, 8, &[1]).is_err());
    }

    #[test]
    fn unloaded_class_is_rejected() {
        let mut heap = ObjectHeap::with_capacity(1024);
        let class = EEClass::synthetic("Tests", "Lazy");

        assert!(matches!(
            heap.allocate(&class, ClassId::new(0)),
            Err(crate::Error::Execution(ExecutionError::ClassNotLoaded(_)))
        ));
    }

    #[test]
    fn capacity_and_invalid_references() {
        let mut heap = ObjectHeap::with_capacity(32);
        heap.allocate(&loaded_class(8), ClassId::new(1)).unwrap();
        assert!(matches!(
            heap.allocate(&loaded_class(8), ClassId::new(1)),
            Err(crate::Error::Execution(ExecutionError::OutOfMemory { .. }))
        ));

        assert!(matches!(
            heap.class_of(ObjectRef::NULL),
            Err(crate::Error::Execution(ExecutionError::NullReference))
        ));
        assert!(matches!(
            heap.class_of(ObjectRef::new(0x1000)),
            Err(crate::Error::Execution(ExecutionError::InvalidReference(0x1000)))
        ));
    }

    #[test]
    fn strings() {
        let mut heap = ObjectHeap::with_capacity(1024);
        let text = U16String::from_str("Hello");
        let object = heap.allocate_string(ClassId::new(3), text.as_slice()).unwrap();

        assert_eq!(heap.class_of(object).unwrap(), ClassId::new(3));
        assert_eq!(heap.read_string(object).unwrap(), text);

        let empty = heap.allocate_string(ClassId::new(3), &[]).unwrap();
        assert!(heap.read_string(empty).unwrap().is_empty());
    }
}
