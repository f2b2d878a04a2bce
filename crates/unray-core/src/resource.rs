//! Reference-counted cache of GPU resources.
//!
//! A [`ResourceManager`] maps a stable [`ResourceKey`] (field name plus shape
//! and dtype) to a lazily created GPU resource. Repeated requests for the
//! same key update the resource in place instead of reallocating it, and
//! the resource is released through its backend as soon as the last
//! consumer drops it. Release is explicit because native GPU handles must
//! be freed deterministically.
//!
//! The manager itself never touches a graphics API: each resource kind
//! plugs in a [`ResourceBackend`] with create/update/evict callbacks. A
//! backend may refuse a spec it cannot hold; [`ResourceBackend::validate`]
//! lets callers find out before anything is allocated.

use std::collections::HashMap;
use std::fmt;

use crate::data::{DType, TypedArray};

/// Create/update/evict callbacks for one kind of GPU resource.
pub trait ResourceBackend {
    /// Description of the resource content.
    type Spec;
    /// The resource handle owned by the cache.
    type Resource;
    /// Failure to allocate or write a resource.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Checks that `spec` can be held without allocating anything.
    fn validate(&self, spec: &Self::Spec) -> Result<(), Self::Error> {
        let _ = spec;
        Ok(())
    }

    /// Allocates a new resource holding `spec`.
    fn create(&mut self, spec: &Self::Spec) -> Result<Self::Resource, Self::Error>;

    /// Replaces the content of an existing resource in place.
    fn update(&mut self, resource: &mut Self::Resource, spec: &Self::Spec)
        -> Result<(), Self::Error>;

    /// Releases a resource whose last reference was dropped.
    fn evict(&mut self, resource: Self::Resource) {
        drop(resource);
    }
}

/// Identity of a cached resource, stable for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a cached resource holds of its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Data texture of `shape` texels.
    Array {
        dtype: DType,
        item_size: u32,
        shape: [u32; 2],
    },
    /// Lookup table of `len` scalars.
    Lut { item_size: u32, len: usize },
    /// Back-to-front cell ordering.
    Ordering { num_cells: usize },
}

/// Content key of a cached resource.
///
/// Two requests share a resource exactly when their keys are equal, so the
/// kind carries every property that forces a reallocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub field: String,
    pub kind: ResourceKind,
}

impl ResourceKey {
    pub fn new(field: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResourceKind::Array {
                dtype,
                item_size,
                shape,
            } => write!(
                f,
                "'{}' {dtype:?}x{item_size} {}x{}",
                self.field, shape[0], shape[1]
            ),
            ResourceKind::Lut { item_size, len } => {
                write!(f, "'{}' lut {len}/{item_size}", self.field)
            }
            ResourceKind::Ordering { num_cells } => {
                write!(f, "'{}' ordering of {num_cells}", self.field)
            }
        }
    }
}

struct Entry<R> {
    key: ResourceKey,
    resource: R,
    count: usize,
}

/// Keyed, reference-counted resource cache.
///
/// Single threaded: one compile pass owns the manager mutably for its whole
/// duration, so each key has a single writer.
pub struct ResourceManager<B: ResourceBackend> {
    backend: B,
    entries: HashMap<ResourceId, Entry<B::Resource>>,
    keys: HashMap<ResourceKey, ResourceId>,
    next_id: u64,
}

impl<B: ResourceBackend> ResourceManager<B> {
    /// Creates an empty manager around a backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            entries: HashMap::new(),
            keys: HashMap::new(),
            next_id: 0,
        }
    }

    /// Creates or updates the resource stored under `key`.
    ///
    /// If `key` is known its resource is updated in place, otherwise a new
    /// resource is created. When the result differs from `previous`, the
    /// result gains a reference and `previous` loses one, so a consumer
    /// that switches resources never leaks the one it dropped.
    ///
    /// Callers must key distinctly per logical shape: an in-place update
    /// never reallocates.
    ///
    /// # Errors
    ///
    /// Returns the backend error if creating or updating fails. Reference
    /// counts are unchanged in that case.
    pub fn update(
        &mut self,
        key: &ResourceKey,
        spec: &B::Spec,
        previous: Option<ResourceId>,
    ) -> Result<ResourceId, B::Error> {
        let existing = self.keys.get(key).copied();
        let id = match existing.and_then(|id| self.entries.get_mut(&id).map(|e| (id, e))) {
            Some((id, entry)) => {
                self.backend.update(&mut entry.resource, spec)?;
                id
            }
            None => {
                let resource = self.backend.create(spec)?;
                let id = ResourceId(self.next_id);
                self.next_id += 1;
                log::debug!("created resource {id} for key {key}");
                self.entries.insert(
                    id,
                    Entry {
                        key: key.clone(),
                        resource,
                        count: 0,
                    },
                );
                self.keys.insert(key.clone(), id);
                id
            }
        };

        if previous != Some(id) {
            self.increment(id);
            if let Some(prev) = previous {
                self.decrement(prev);
            }
        }
        Ok(id)
    }

    /// Adds a reference to a resource and returns the new count.
    pub fn increment(&mut self, id: ResourceId) -> usize {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.count += 1;
                entry.count
            }
            None => {
                log::warn!("increment of unknown resource {id}");
                0
            }
        }
    }

    /// Drops a reference and returns the remaining count.
    ///
    /// At zero the resource is removed from the cache and handed to the
    /// backend's `evict`.
    pub fn decrement(&mut self, id: ResourceId) -> usize {
        let Some(entry) = self.entries.get_mut(&id) else {
            log::warn!("decrement of unknown resource {id}");
            return 0;
        };
        entry.count = entry.count.saturating_sub(1);
        if entry.count > 0 {
            return entry.count;
        }
        if let Some(entry) = self.entries.remove(&id) {
            self.keys.remove(&entry.key);
            log::debug!("evicting resource {id} for key {}", entry.key);
            self.backend.evict(entry.resource);
        }
        0
    }

    /// Evicts every cached resource regardless of reference counts.
    pub fn clear(&mut self) {
        self.keys.clear();
        for (_, entry) in self.entries.drain() {
            self.backend.evict(entry.resource);
        }
    }

    /// Gets a resource by id.
    pub fn get(&self, id: ResourceId) -> Option<&B::Resource> {
        self.entries.get(&id).map(|e| &e.resource)
    }

    /// Gets a mutable resource by id.
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut B::Resource> {
        self.entries.get_mut(&id).map(|e| &mut e.resource)
    }

    /// Returns the reference count of a resource (0 if unknown).
    pub fn count(&self, id: ResourceId) -> usize {
        self.entries.get(&id).map_or(0, |e| e.count)
    }

    /// Returns the id stored under a key.
    pub fn id_for_key(&self, key: &ResourceKey) -> Option<ResourceId> {
        self.keys.get(key).copied()
    }

    /// Returns the key a resource was created under.
    pub fn key(&self, id: ResourceId) -> Option<&ResourceKey> {
        self.entries.get(&id).map(|e| &e.key)
    }

    /// Returns the number of live resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no resources are alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: ResourceBackend> Drop for ResourceManager<B> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("dropping resource manager with {} live resources", self.entries.len());
            self.clear();
        }
    }
}

/// Content of a 2D data texture packing `shape[0] * shape[1]` items.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayTextureSpec {
    pub array: TypedArray,
    /// Texel element type the shader samples.
    pub dtype: DType,
    /// Scalars per item (texel channels).
    pub item_size: u32,
    pub shape: [u32; 2],
}

/// Content of a 1D lookup table texture.
#[derive(Debug, Clone, PartialEq)]
pub struct LutTextureSpec {
    pub array: TypedArray,
    pub item_size: u32,
}

impl LutTextureSpec {
    /// Returns the texture shape `[len / item_size, 1]`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn shape(&self) -> [u32; 2] {
        [(self.array.len() / self.item_size as usize) as u32, 1]
    }
}

/// Content of a per-instance vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBufferSpec {
    pub data: Vec<u32>,
    pub item_size: u32,
}

/// The texture pool a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexturePool {
    /// Data textures sized by the texture shape planner.
    Array,
    /// Lookup table textures.
    Lut,
}

/// A texture reference held by a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub pool: TexturePool,
    pub id: ResourceId,
}

/// The resource managers of one rendering session.
pub struct ResourceManagers<A, L, B>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    pub array_textures: ResourceManager<A>,
    pub lut_textures: ResourceManager<L>,
    pub buffers: ResourceManager<B>,
}

impl<A, L, B> ResourceManagers<A, L, B>
where
    A: ResourceBackend<Spec = ArrayTextureSpec>,
    L: ResourceBackend<Spec = LutTextureSpec>,
    B: ResourceBackend<Spec = InstanceBufferSpec>,
{
    /// Creates empty managers around the three backends.
    pub fn new(array_textures: A, lut_textures: L, buffers: B) -> Self {
        Self {
            array_textures: ResourceManager::new(array_textures),
            lut_textures: ResourceManager::new(lut_textures),
            buffers: ResourceManager::new(buffers),
        }
    }

    /// Drops one reference to a texture in the pool it came from.
    pub fn release_texture(&mut self, handle: TextureHandle) -> usize {
        match handle.pool {
            TexturePool::Array => self.array_textures.decrement(handle.id),
            TexturePool::Lut => self.lut_textures.decrement(handle.id),
        }
    }

    /// Returns the total number of live resources.
    pub fn len(&self) -> usize {
        self.array_textures.len() + self.lut_textures.len() + self.buffers.len()
    }

    /// Returns true if no resources are alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
