//! Inode Table
//!
//! One inode per archive entry, in archive order. The table is filled once per
//! archive load and never reordered, so an [`InodeRef`] stays valid until the
//! next load.

use bstr::{BStr, BString, ByteSlice};
use chrono::{DateTime, TimeZone, Utc};

use std::convert::TryFrom;
use std::fmt;

use crate::{Mode, TypeFlag};

/// Index of an inode in its table
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InodeRef(pub(crate) usize);

impl InodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The bytes of an entry
pub enum Data<'a> {
    /// A window into an archive held in memory, which must outlive the inode
    Borrowed(&'a mut [u8]),
    /// A copy read out of a stream
    Owned(Box<[u8]>),
}

impl Data<'_> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Data::Borrowed(data) => data,
            Data::Owned(data) => data,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Data::Borrowed(data) => data,
            Data::Owned(data) => data,
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, Data::Borrowed(_))
    }

    pub(crate) fn len(&self) -> usize {
        self.as_slice().len()
    }
}

impl fmt::Debug for Data<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = if self.is_borrowed() {
            "Borrowed"
        } else {
            "Owned"
        };
        f.debug_struct(kind).field("len", &self.len()).finish()
    }
}

/// Everything the header says about an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub(crate) name: BString,
    pub(crate) size: usize,
    pub(crate) kind: TypeFlag,
    pub(crate) mode: Mode,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) mtime: u64,
    pub(crate) link_name: BString,
}

impl Metadata {
    /// The path exactly as stored in the header
    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn kind(&self) -> TypeFlag {
        self.kind
    }

    /// The mode field as stored
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Permission bits combined with the file type implied by the type flag
    pub fn permissions(&self) -> Mode {
        (self.mode & Mode::PERM_MASK) | self.kind.mode_type()
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// Raw modification time, in seconds since the epoch
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.mtime).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    pub fn link_name(&self) -> &BStr {
        self.link_name.as_bstr()
    }
}

#[derive(Debug)]
pub struct Inode<'a> {
    meta: Metadata,
    data: Data<'a>,
}

impl<'a> Inode<'a> {
    pub(crate) fn new(meta: Metadata, data: Data<'a>) -> Self {
        debug_assert_eq!(meta.size, data.len());
        Self { meta, data }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn size(&self) -> usize {
        self.meta.size
    }

    pub fn data(&self) -> &Data<'a> {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Data<'a> {
        &mut self.data
    }
}

/// Fixed capacity, insertion ordered inode storage
#[derive(Debug)]
pub struct Table<'a> {
    inodes: Vec<Inode<'a>>,
    capacity: usize,
}

impl<'a> Table<'a> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inodes: Vec::new(),
            capacity,
        }
    }

    /// Drop every inode, releasing owned data
    pub(crate) fn reset(&mut self) {
        self.inodes = Vec::new();
    }

    /// Panics if the table is full; callers check `is_full` first
    pub(crate) fn push(&mut self, inode: Inode<'a>) -> InodeRef {
        assert!(!self.is_full(), "inode table is full");
        self.inodes.push(inode);
        InodeRef(self.inodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.inodes.len() >= self.capacity
    }

    /// The first inode named exactly `name`
    ///
    /// Later entries with the same name are never returned.
    pub fn lookup(&self, name: &[u8]) -> Option<InodeRef> {
        self.inodes
            .iter()
            .position(|inode| inode.meta.name.as_slice() == name)
            .map(InodeRef)
    }

    pub fn get(&self, inode: InodeRef) -> Option<&Inode<'a>> {
        self.inodes.get(inode.0)
    }

    pub(crate) fn get_mut(&mut self, inode: InodeRef) -> Option<&mut Inode<'a>> {
        self.inodes.get_mut(inode.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inode<'a>> + '_ {
        self.inodes.iter()
    }
}
