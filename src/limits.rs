// process wide open-file limit. Raised once, before any shard is opened, and handed to the
// shard cache so it never holds more handles than the process is allowed.

use log::{debug, warn};

/// Descriptors kept free for the corpus reader, logging and the standard streams.
pub const HEADROOM: u64 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileLimit {
    pub soft: u64,
    pub hard: u64,
}

impl FileLimit {

    /// A limit that was not read from the operating system.
    pub fn fixed(soft: u64) -> FileLimit {
        FileLimit { soft, hard: soft }
    }

    /// Number of shard handles that fit under the soft limit.
    pub fn usable_handles(&self) -> usize {
        let usable = self.soft.saturating_sub(HEADROOM).max(1);
        usize::try_from(usable).unwrap_or(usize::MAX)
    }

    #[cfg(unix)]
    pub fn current() -> FileLimit {
        use nix::sys::resource::{getrlimit, Resource};
        match getrlimit(Resource::RLIMIT_NOFILE) {
            Ok((soft, hard)) => FileLimit { soft: soft as u64, hard: hard as u64 },
            Err(e) => {
                warn!("cannot read the open file limit: {}", e);
                FileLimit::fixed(u64::MAX)
            }
        }
    }

    #[cfg(not(unix))]
    pub fn current() -> FileLimit {
        FileLimit::fixed(u64::MAX)
    }

    /// Raises the soft (and if permitted the hard) limit to `handles + HEADROOM` and returns
    /// the limit that is in effect afterwards.
    #[cfg(unix)]
    pub fn raise(handles: usize) -> FileLimit {
        use nix::sys::resource::{setrlimit, Resource};

        let wanted = (handles as u64).saturating_add(HEADROOM);
        let before = FileLimit::current();
        if before.soft >= wanted {
            return before;
        }

        let raised = setrlimit(Resource::RLIMIT_NOFILE, wanted as _, wanted.max(before.hard) as _)
            .or_else(|_| setrlimit(Resource::RLIMIT_NOFILE, wanted.min(before.hard) as _, before.hard as _));
        if let Err(e) = raised {
            warn!("cannot raise the open file limit to {}: {}", wanted, e);
        }

        let after = FileLimit::current();
        if after.soft < wanted {
            warn!("open file limit is {}, shard cache will hold at most {} files", after.soft, after.usable_handles());
        }
        debug!("open file limit raised from {} to {}", before.soft, after.soft);
        after
    }

    #[cfg(not(unix))]
    pub fn raise(_handles: usize) -> FileLimit {
        FileLimit::current()
    }
}
