//! Descriptor Table
//!
//! A fixed number of slots, each either free or holding an open handle. The
//! descriptor value handed out is the slot index, and a slot never moves while
//! it is open.

use std::fmt;

use crate::errors::{Error, Result};
use crate::inode::InodeRef;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fd(pub usize);

impl Fd {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub(crate) inode: InodeRef,
    /// Never past the end of the inode's data
    pub(crate) cursor: usize,
}

impl Descriptor {
    pub fn inode(&self) -> InodeRef {
        self.inode
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[derive(Debug)]
pub struct Table {
    slots: Box<[Option<Descriptor>]>,
}

impl Table {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of open descriptors
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Free every slot
    pub(crate) fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Bind the lowest free slot to `inode`, with the cursor at the start
    pub(crate) fn alloc(&mut self, inode: InodeRef) -> Result<Fd> {
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::NoCapacity {
                capacity: self.slots.len(),
            })?;
        self.slots[idx] = Some(Descriptor { inode, cursor: 0 });
        Ok(Fd(idx))
    }

    pub fn get(&self, fd: Fd) -> Result<&Descriptor> {
        self.slots
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidDescriptor { fd })
    }

    pub(crate) fn get_mut(&mut self, fd: Fd) -> Result<&mut Descriptor> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidDescriptor { fd })
    }

    /// Free the slot at `fd`; freeing a free slot is not an error
    pub(crate) fn release(&mut self, fd: Fd) -> Result<()> {
        let slot = self
            .slots
            .get_mut(fd.0)
            .ok_or(Error::InvalidDescriptor { fd })?;
        *slot = None;
        Ok(())
    }
}
