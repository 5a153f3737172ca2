//! Type registries backing the compact argument encoding
//!
//! Three registries live here, all process-global:
//!
//! - interned strings, shared by structured-data keys and per-argument format
//!   specifiers so the hot path can refer to them by a one-byte table index;
//! - enum types, mapping a `TypeId` to a small handle the worker can resolve
//!   back to variant names without any runtime reflection;
//! - unmanaged blob types, fixed-size `Copy` values encoded inline and
//!   rendered by a registered function.
//!
//! Registration allocates; it is meant to happen during initialization (or
//! once per type when `AutoRegisterEnums` is on). Lookups take a read lock
//! and never allocate.

use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

// ---------------------------------------------------------------------------
// Interned strings
// ---------------------------------------------------------------------------

fn string_registry() -> &'static RwLock<HashSet<Arc<str>>> {
    static REGISTRY: OnceLock<RwLock<HashSet<Arc<str>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashSet::new()))
}

/// Intern a string, returning the shared instance.
///
/// The first call for a given content allocates; later calls only clone the
/// stored `Arc`.
pub fn intern(s: &str) -> Arc<str> {
    if let Some(existing) = string_registry().read().get(s) {
        return Arc::clone(existing);
    }
    let mut registry = string_registry().write();
    if let Some(existing) = registry.get(s) {
        return Arc::clone(existing);
    }
    let interned: Arc<str> = Arc::from(s);
    registry.insert(Arc::clone(&interned));
    interned
}

// ---------------------------------------------------------------------------
// Enum types
// ---------------------------------------------------------------------------

/// An enum type whose values can be encoded as a compact handle + number.
///
/// Implementations are expected to be `#[repr(...)]`-stable: `to_u64` and
/// `describe` must agree on the numeric mapping.
pub trait LoggableEnum: 'static {
    fn type_name() -> &'static str;
    /// Variant name for a numeric value, if the value is a known variant.
    fn describe(value: u64) -> Option<&'static str>;
    fn to_u64(&self) -> u64;
}

#[derive(Clone, Copy)]
pub(crate) struct EnumInfo {
    pub type_name: &'static str,
    pub describe: fn(u64) -> Option<&'static str>,
}

struct EnumRegistry {
    handles: HashMap<TypeId, u32>,
    infos: Vec<EnumInfo>,
}

fn enum_registry() -> &'static RwLock<EnumRegistry> {
    static REGISTRY: OnceLock<RwLock<EnumRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        RwLock::new(EnumRegistry {
            handles: HashMap::new(),
            infos: Vec::new(),
        })
    })
}

static AUTO_REGISTER_ENUMS: AtomicBool = AtomicBool::new(false);

pub(crate) fn set_auto_register_enums(enabled: bool) {
    AUTO_REGISTER_ENUMS.store(enabled, Ordering::Relaxed);
}

pub(crate) fn auto_register_enums() -> bool {
    AUTO_REGISTER_ENUMS.load(Ordering::Relaxed)
}

/// Register an enum type ahead of time and return its handle.
///
/// Idempotent: re-registering returns the existing handle.
pub fn register_enum<T: LoggableEnum>() -> u32 {
    let type_id = TypeId::of::<T>();
    if let Some(&handle) = enum_registry().read().handles.get(&type_id) {
        return handle;
    }
    let mut registry = enum_registry().write();
    if let Some(&handle) = registry.handles.get(&type_id) {
        return handle;
    }
    let handle = registry.infos.len() as u32;
    registry.infos.push(EnumInfo {
        type_name: T::type_name(),
        describe: T::describe,
    });
    registry.handles.insert(type_id, handle);
    handle
}

/// Handle for an already-registered enum type; `None` if never registered.
pub(crate) fn enum_handle<T: LoggableEnum>() -> Option<u32> {
    enum_registry().read().handles.get(&TypeId::of::<T>()).copied()
}

pub(crate) fn enum_info(handle: u32) -> Option<EnumInfo> {
    enum_registry().read().infos.get(handle as usize).copied()
}

// ---------------------------------------------------------------------------
// Unmanaged blob types
// ---------------------------------------------------------------------------

/// A fixed-size `Copy` value encoded as an inline blob.
///
/// The encoded form must be exactly `SIZE` bytes and `describe` must be able
/// to render it from those bytes alone.
pub trait UnmanagedValue: Copy + 'static {
    const SIZE: usize;
    fn type_name() -> &'static str;
    fn encode(&self, buf: &mut [u8]);
    fn describe(bytes: &[u8], out: &mut String) -> std::fmt::Result;
}

#[derive(Clone, Copy)]
pub(crate) struct UnmanagedInfo {
    pub type_name: &'static str,
    pub size: u16,
    pub describe: fn(&[u8], &mut String) -> std::fmt::Result,
}

struct UnmanagedRegistry {
    handles: HashMap<TypeId, u32>,
    infos: Vec<UnmanagedInfo>,
}

fn unmanaged_registry() -> &'static RwLock<UnmanagedRegistry> {
    static REGISTRY: OnceLock<RwLock<UnmanagedRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        RwLock::new(UnmanagedRegistry {
            handles: HashMap::new(),
            infos: Vec::new(),
        })
    })
}

/// Register an unmanaged blob type and return its handle. Idempotent.
pub fn register_unmanaged<T: UnmanagedValue>() -> u32 {
    let type_id = TypeId::of::<T>();
    if let Some(&handle) = unmanaged_registry().read().handles.get(&type_id) {
        return handle;
    }
    let mut registry = unmanaged_registry().write();
    if let Some(&handle) = registry.handles.get(&type_id) {
        return handle;
    }
    let handle = registry.infos.len() as u32;
    registry.infos.push(UnmanagedInfo {
        type_name: T::type_name(),
        size: T::SIZE as u16,
        describe: T::describe,
    });
    registry.handles.insert(type_id, handle);
    handle
}

pub(crate) fn unmanaged_handle<T: UnmanagedValue>() -> Option<u32> {
    unmanaged_registry()
        .read()
        .handles
        .get(&TypeId::of::<T>())
        .copied()
}

pub(crate) fn unmanaged_info(handle: u32) -> Option<UnmanagedInfo> {
    unmanaged_registry().read().infos.get(handle as usize).copied()
}

/// Hex dump fallback for blobs whose type handle is unknown to the decoder.
pub(crate) fn describe_raw(bytes: &[u8], out: &mut String) -> std::fmt::Result {
    out.push_str("0x");
    for byte in bytes {
        write!(out, "{:02x}", byte)?;
    }
    Ok(())
}
