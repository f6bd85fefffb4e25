//! Region classifier — protection, mapping flags and VMA status text.
//!
//! The restore side parses these strings token by token, so each set is
//! kept as an ordered token list and rendered joined with `" | "`.

use std::fmt;

/// A flag that renders as one fixed token.
pub trait FlagToken: Copy {
    fn token(&self) -> &'static str;
}

/// An ordered list of flag tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagText<T: FlagToken> {
    flags: Vec<T>,
}

impl<T: FlagToken> FlagText<T> {
    fn empty() -> Self {
        FlagText { flags: Vec::new() }
    }

    /// Append a token at the end.
    pub fn push(&mut self, flag: T) {
        self.flags.push(flag);
    }
}

impl<T: FlagToken> fmt::Display for FlagText<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, flag) in self.flags.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(flag.token())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtFlag {
    Read,
    Write,
    Exec,
}

impl FlagToken for ProtFlag {
    fn token(&self) -> &'static str {
        match self {
            ProtFlag::Read => "PROT_READ",
            ProtFlag::Write => "PROT_WRITE",
            ProtFlag::Exec => "PROT_EXEC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFlag {
    Shared,
    Private,
    Anon,
    GrowsDown,
}

impl FlagToken for MapFlag {
    fn token(&self) -> &'static str {
        match self {
            MapFlag::Shared => "MAP_SHARED",
            MapFlag::Private => "MAP_PRIVATE",
            MapFlag::Anon => "MAP_ANON",
            MapFlag::GrowsDown => "MAP_GROWSDOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFlag {
    AreaRegular,
    FileShared,
    FilePrivate,
    AreaHeap,
    AreaVdso,
    AnonPrivate,
    AreaVvar,
}

impl FlagToken for StatusFlag {
    fn token(&self) -> &'static str {
        match self {
            StatusFlag::AreaRegular => "VMA_AREA_REGULAR",
            StatusFlag::FileShared => "VMA_FILE_SHARED",
            StatusFlag::FilePrivate => "VMA_FILE_PRIVATE",
            StatusFlag::AreaHeap => "VMA_AREA_HEAP",
            StatusFlag::AreaVdso => "VMA_AREA_VDSO",
            StatusFlag::AnonPrivate => "VMA_ANON_PRIVATE",
            StatusFlag::AreaVvar => "VMA_AREA_VVAR",
        }
    }
}

pub type Protection = FlagText<ProtFlag>;
pub type MapFlags = FlagText<MapFlag>;
pub type VmaStatus = FlagText<StatusFlag>;

pub const HEAP_NAME: &str = "[heap]";
pub const STACK_NAME: &str = "[stack]";
pub const VDSO_NAME: &str = "[vdso]";

/// Page-cache style shared mappings, e.g. fontconfig caches.
pub fn is_cache_file(name: &str) -> bool {
    name.contains(".cache")
}

/// No backing file: empty name or a bracketed pseudo-name.
pub fn is_anonymous(name: &str) -> bool {
    name.is_empty() || name.contains('[')
}

impl Protection {
    /// Read, write, exec in that order; absent bits are left out.
    pub fn from_access(access: &str) -> Self {
        let mut prot = Self::empty();
        if access.contains('r') {
            prot.push(ProtFlag::Read);
        }
        if access.contains('w') {
            prot.push(ProtFlag::Write);
        }
        if access.contains('x') {
            prot.push(ProtFlag::Exec);
        }
        prot
    }
}

impl MapFlags {
    pub fn for_name(name: &str) -> Self {
        let mut flags = Self::empty();

        if is_cache_file(name) {
            flags.push(MapFlag::Shared);
            return flags;
        }

        flags.push(MapFlag::Private);
        if is_anonymous(name) {
            flags.push(MapFlag::Anon);
        }
        if name == STACK_NAME {
            flags.push(MapFlag::GrowsDown);
        }
        flags
    }
}

impl VmaStatus {
    /// The checks after the cache case are independent: `[heap]` gets both
    /// `VMA_AREA_HEAP` and `VMA_ANON_PRIVATE`.
    pub fn for_name(name: &str) -> Self {
        let mut status = Self::empty();
        status.push(StatusFlag::AreaRegular);

        if is_cache_file(name) {
            status.push(StatusFlag::FileShared);
            return status;
        }

        if !is_anonymous(name) {
            status.push(StatusFlag::FilePrivate);
        }
        if name == HEAP_NAME {
            status.push(StatusFlag::AreaHeap);
        }
        if name == VDSO_NAME {
            status.push(StatusFlag::AreaVdso);
        }
        if is_anonymous(name) {
            status.push(StatusFlag::AnonPrivate);
        }
        status
    }
}
