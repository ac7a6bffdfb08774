use std::fmt;
use std::time::SystemTime;

use bitflags::bitflags;

use crate::object::{MODE_EXECUTABLE, TreeEntry};

bitflags! {
    /// Unix-style mode bits: the directory type bit plus permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileMode: u32 {
        const DIR = 0o040000;

        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;
    }
}

impl FileMode {
    pub const PERM: FileMode = FileMode::from_bits_retain(0o777);

    /// Derive the mode from a git mode string. Unknown strings are treated
    /// as ordinary files.
    pub fn from_git(mode: &str, is_dir: bool) -> Self {
        if is_dir {
            return FileMode::DIR | FileMode::from_bits_retain(0o755);
        }
        match mode {
            MODE_EXECUTABLE => FileMode::from_bits_retain(0o755),
            _ => FileMode::from_bits_retain(0o644),
        }
    }

    pub fn perm(self) -> FileMode {
        self & FileMode::PERM
    }

    pub fn file_type(self) -> FileMode {
        self & FileMode::DIR
    }

    pub fn is_dir(self) -> bool {
        self.contains(FileMode::DIR)
    }
}

impl fmt::Display for FileMode {
    /// `ls -l` style, e.g. `drwxr-xr-x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(10);
        out.push(if self.is_dir() { 'd' } else { '-' });
        let bits = self.bits();
        for shift in [6, 3, 0] {
            let triple = (bits >> shift) & 0o7;
            out.push(if triple & 0o4 != 0 { 'r' } else { '-' });
            out.push(if triple & 0o2 != 0 { 'w' } else { '-' });
            out.push(if triple & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

/// File information derived from a tree entry alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    size: u64,
    mode: FileMode,
}

impl Metadata {
    pub fn from_entry(entry: &TreeEntry) -> Self {
        let is_dir = entry.is_dir();
        Self {
            name: entry.path.clone(),
            size: if is_dir { 0 } else { entry.size },
            mode: FileMode::from_git(&entry.mode, is_dir),
        }
    }

    /// Leaf name, not the full path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn file_type(&self) -> FileMode {
        self.mode.file_type()
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Commit times are not tracked; every entry reports the epoch.
    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
}

/// One batch of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirPage {
    pub entries: Vec<Metadata>,
    /// No entries remain after this batch.
    pub end: bool,
}
