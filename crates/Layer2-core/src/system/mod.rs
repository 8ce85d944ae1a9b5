//! Host introspection - `/info`, `/ps`, `/net`, `/disk` 스냅샷

mod info;

pub use info::{
    format_size, progress_bar, DiskSnapshot, InterfaceEntry, MountEntry, NetworkSnapshot,
    ProcessEntry, ProcessSnapshot, SystemSnapshot, TOP_PROCESSES,
};
