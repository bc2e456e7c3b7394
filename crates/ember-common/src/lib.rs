//! Shared types for the ember cross-thread layer.
//!
//! This crate exists so the shared-memory core, the task supervisor and the
//! host embedding both can agree on:
//! - the scalar channel layout (slot enumeration, ring geometry),
//! - the wire shapes that cross versioned regions and worker ports,
//! - the debug command and remote key tables.

mod commands;
mod layout;
mod messages;

pub use commands::{remote_key_code, BufferType, DebugCommand, MediaEvent, RemoteType};
pub use layout::{
    channel_len, data_buffer_index, key_ring_base, DataSlot, DATA_BUFFER_LEN, KEY_RING_SLOTS,
    KEY_SLOT_STRIDE, UNSET,
};
pub use messages::{
    AppPayload, ExtensionInfo, KeyEvent, PkgFilePath, RegistryData, TaskData, TaskPayload,
    TaskState, ThreadUpdate, UpdateAction, UpdateScope,
};

/// Hard cap on concurrently live task workers.
pub const MAX_TASKS: usize = 10;

/// Default geometry for a per-task versioned region.
pub const REGION_INITIAL_SIZE: usize = 32 * 1024;
pub const REGION_MAX_SIZE: usize = 3 * 1024 * 1024;

/// Geometry for the device registry region.
pub const REGISTRY_INITIAL_SIZE: usize = 32 * 1024;
pub const REGISTRY_MAX_SIZE: usize = 64 * 1024;
