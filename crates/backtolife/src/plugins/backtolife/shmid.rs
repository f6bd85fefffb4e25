//! Shared-object allocator — `shmid` values for file-backed VMAs.
//!
//! Every VMA backed by the same file gets the same id. The program image
//! takes the highest open descriptor number of the process and every other
//! file is numbered above it, so ids never collide with the descriptor
//! range the restore side also uses for file ids.

use crate::plugins::backtolife::classify::is_anonymous;
use crate::process::ProcessAccess;
use std::collections::HashMap;
use tracing::debug;

/// Name → id table for one dump.
#[derive(Debug, Default)]
pub struct SharedObjectTable {
    ids: HashMap<String, u64>,
}

impl SharedObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for the VMA backed by `current`.
    ///
    /// Anonymous and pseudo regions get 0. The program image is re-read
    /// from the descriptor table on every hit, so its entry always holds
    /// the latest max fd.
    pub fn allocate(&mut self, program: &str, current: &str, process: &dyn ProcessAccess) -> u64 {
        if is_anonymous(current) {
            return 0;
        }

        if current == program {
            let max_fd = u64::from(process.max_fd());
            self.ids.insert(program.to_string(), max_fd);
            return max_fd;
        }

        if let Some(&id) = self.ids.get(current) {
            return id;
        }

        let id = self.ids.len() as u64 + self.get(program).unwrap_or(0);
        debug!("shmid {} -> {}", id, current);
        self.ids.insert(current.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.ids.get(name).copied()
    }

    /// `exe_file_id` of the mm image: the program's id, 0 if it never got one.
    pub fn exe_file_id(&self, program: &str) -> u64 {
        self.get(program).unwrap_or(0)
    }
}
