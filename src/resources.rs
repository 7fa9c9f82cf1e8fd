//! Device buffers with scoped ownership.
//!
//! Every buffer is owned by a Rust value and released when that value is dropped, whatever
//! the path that led there.

use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use bytemuck::Pod;
use image::Rgba32FImage;

use crate::utils::counter::counter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: &'static str,
    /// Number of elements, never 0
    pub count: usize,
    /// Size of an element in bytes
    pub stride: usize,
}

impl BufferDesc {
    pub fn byte_size(&self) -> usize {
        self.count * self.stride
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("buffer `{label}` holds {expected} bytes, {got} were given")]
    SizeMismatch {
        label: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("out of device memory: {requested} bytes requested for `{label}`, {available} available")]
    OutOfMemory {
        label: &'static str,
        requested: usize,
        available: usize,
    },
}

/// Memory and copies of a compute device
pub trait Device: Send + Sync {
    fn name(&self) -> &str;
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferId, ResourceError>;
    fn destroy_buffer(&self, id: BufferId);
    /// `bytes` must cover the whole buffer
    fn write_buffer(&self, id: BufferId, bytes: &[u8]) -> Result<(), ResourceError>;
    /// `out` must cover the whole buffer
    fn read_buffer(&self, id: BufferId, out: &mut [u8]) -> Result<(), ResourceError>;
    /// Both buffers must have the same size
    fn copy_buffer(&self, src: BufferId, dst: BufferId) -> Result<(), ResourceError>;
    fn live_buffers(&self) -> usize;
}

/// Owned device buffer of `count` elements of type `T`. Released on drop.
pub struct GpuBuffer<T: Pod> {
    device: Arc<dyn Device>,
    id: BufferId,
    desc: BufferDesc,
    _marker: PhantomData<T>,
}

impl<T: Pod> GpuBuffer<T> {
    /// A buffer of `max(1, count)` elements
    pub fn new(device: Arc<dyn Device>, label: &'static str, count: usize) -> Result<Self, ResourceError> {
        let desc = BufferDesc {
            label,
            count: count.max(1),
            stride: std::mem::size_of::<T>(),
        };
        let id = device.create_buffer(&desc)?;
        counter!("Buffers created");
        log::trace!("created buffer `{label}` ({} x {} bytes)", desc.count, desc.stride);
        Ok(Self {
            device,
            id,
            desc,
            _marker: PhantomData,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn count(&self) -> usize {
        self.desc.count
    }

    pub fn stride(&self) -> usize {
        self.desc.stride
    }

    pub fn label(&self) -> &'static str {
        self.desc.label
    }

    /// Overwrite the start of the buffer with `data`, the rest is zeroed
    pub fn write(&self, data: &[T]) -> Result<(), ResourceError> {
        if data.len() > self.count() {
            return Err(ResourceError::SizeMismatch {
                label: self.label(),
                expected: self.desc.byte_size(),
                got: std::mem::size_of_val(data),
            });
        }
        if data.len() == self.count() {
            return self.device.write_buffer(self.id, bytemuck::cast_slice(data));
        }
        let mut padded = vec![T::zeroed(); self.count()];
        padded[..data.len()].copy_from_slice(data);
        self.device.write_buffer(self.id, bytemuck::cast_slice(&padded))
    }

    pub fn read(&self) -> Result<Vec<T>, ResourceError> {
        let mut out = vec![T::zeroed(); self.count()];
        self.device
            .read_buffer(self.id, bytemuck::cast_slice_mut(&mut out))?;
        Ok(out)
    }

    pub fn clear(&self) -> Result<(), ResourceError> {
        self.write(&[])
    }

    pub fn copy_from(&self, src: &GpuBuffer<T>) -> Result<(), ResourceError> {
        if src.count() != self.count() {
            return Err(ResourceError::SizeMismatch {
                label: self.label(),
                expected: self.desc.byte_size(),
                got: src.desc.byte_size(),
            });
        }
        self.device.copy_buffer(src.id, self.id)
    }
}

impl<T: Pod> Drop for GpuBuffer<T> {
    fn drop(&mut self) {
        log::trace!("released buffer `{}`", self.desc.label);
        self.device.destroy_buffer(self.id);
    }
}

impl<T: Pod> std::fmt::Debug for GpuBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .finish()
    }
}

/// A lazily created buffer mirroring a list of values.
///
/// The device buffer is recreated only when the element count changes.
pub struct StructuredBuffer<T: Pod> {
    label: &'static str,
    buffer: Option<GpuBuffer<T>>,
    len: usize,
}

impl<T: Pod> StructuredBuffer<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            buffer: None,
            len: 0,
        }
    }

    /// Returns true if the device buffer was (re)created
    pub fn upload(&mut self, device: &Arc<dyn Device>, data: &[T]) -> Result<bool, ResourceError> {
        let count = data.len().max(1);
        let recreate = match &self.buffer {
            Some(buffer) => buffer.count() != count || buffer.stride() != std::mem::size_of::<T>(),
            None => true,
        };
        if recreate {
            // The previous buffer is released before allocating the new one
            self.buffer = None;
            self.len = 0;
            self.buffer = Some(GpuBuffer::new(device.clone(), self.label, count)?);
        }
        if let Some(buffer) = &self.buffer {
            buffer.write(data)?;
        }
        self.len = data.len();
        Ok(recreate)
    }

    pub fn buffer(&self) -> Option<&GpuBuffer<T>> {
        self.buffer.as_ref()
    }

    /// Number of meaningful elements. The device buffer holds at least one element.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn release(&mut self) {
        self.buffer = None;
        self.len = 0;
    }
}

pub type Texel = [f32; 4];

/// An RGBA 32 bits float image living on the device.
///
/// Rows are stored bottom up: texel `(x, y)` is at `y * width + x`, `y = 0` being the bottom row.
#[derive(Debug)]
pub struct RenderTarget {
    buffer: GpuBuffer<Texel>,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(device: Arc<dyn Device>, label: &'static str, width: u32, height: u32) -> Result<Self, ResourceError> {
        Ok(Self {
            buffer: GpuBuffer::new(device, label, width as usize * height as usize)?,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn buffer(&self) -> &GpuBuffer<Texel> {
        &self.buffer
    }

    pub fn clear(&self) -> Result<(), ResourceError> {
        self.buffer.clear()
    }

    pub fn copy_from(&self, src: &RenderTarget) -> Result<(), ResourceError> {
        self.buffer.copy_from(&src.buffer)
    }

    pub fn write_texels(&self, texels: &[Texel]) -> Result<(), ResourceError> {
        self.buffer.write(texels)
    }

    pub fn read_texels(&self) -> Result<Vec<Texel>, ResourceError> {
        self.buffer.read()
    }

    /// Download into an image whose first row is the top row
    pub fn read_image(&self) -> Result<Rgba32FImage, ResourceError> {
        let texels = self.read_texels()?;
        let (w, h) = (self.width, self.height);
        Ok(Rgba32FImage::from_fn(w, h, |x, row| {
            let y = h - 1 - row;
            image::Rgba(texels[(y * w + x) as usize])
        }))
    }
}

/// A render target created on first use and recreated when the size changes
pub struct TargetSlot {
    label: &'static str,
    target: Option<RenderTarget>,
}

impl TargetSlot {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            target: None,
        }
    }

    /// Returns true if the target was (re)created, its content is then cleared
    pub fn ensure(&mut self, device: &Arc<dyn Device>, width: u32, height: u32) -> Result<bool, ResourceError> {
        if matches!(&self.target, Some(t) if t.size() == (width, height)) {
            return Ok(false);
        }
        if let Some(old) = &self.target {
            log::debug!(
                "resizing `{}` from {}x{} to {width}x{height}",
                self.label,
                old.width(),
                old.height()
            );
        }
        self.target = None;
        let target = RenderTarget::new(device.clone(), self.label, width, height)?;
        target.clear()?;
        self.target = Some(target);
        Ok(true)
    }

    pub fn get(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    pub fn release(&mut self) {
        self.target = None;
    }
}

struct CpuBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

/// Device backed by host memory, used by the CPU kernels and in tests.
#[derive(Default)]
pub struct CpuDevice {
    buffers: Mutex<HashMap<BufferId, CpuBuffer>>,
    next_id: AtomicU64,
    /// Maximum number of bytes allocated at once, unbounded if None
    budget: Option<usize>,
}

impl CpuDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Default::default()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BufferId, CpuBuffer>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for CpuDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferId, ResourceError> {
        let mut buffers = self.lock();
        if let Some(budget) = self.budget {
            let used: usize = buffers.values().map(|b| b.data.len()).sum();
            let available = budget.saturating_sub(used);
            if desc.byte_size() > available {
                return Err(ResourceError::OutOfMemory {
                    label: desc.label,
                    requested: desc.byte_size(),
                    available,
                });
            }
        }
        let id = BufferId(self.next_id.fetch_add(1, Ordering::Relaxed));
        buffers.insert(
            id,
            CpuBuffer {
                desc: desc.clone(),
                data: vec![0; desc.byte_size()],
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) {
        if self.lock().remove(&id).is_none() {
            log::warn!("destroying unknown buffer {id:?}");
        }
    }

    fn write_buffer(&self, id: BufferId, bytes: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.lock();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::UnknownBuffer(id))?;
        if buffer.data.len() != bytes.len() {
            return Err(ResourceError::SizeMismatch {
                label: buffer.desc.label,
                expected: buffer.data.len(),
                got: bytes.len(),
            });
        }
        buffer.data.copy_from_slice(bytes);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, out: &mut [u8]) -> Result<(), ResourceError> {
        let buffers = self.lock();
        let buffer = buffers.get(&id).ok_or(ResourceError::UnknownBuffer(id))?;
        if buffer.data.len() != out.len() {
            return Err(ResourceError::SizeMismatch {
                label: buffer.desc.label,
                expected: buffer.data.len(),
                got: out.len(),
            });
        }
        out.copy_from_slice(&buffer.data);
        Ok(())
    }

    fn copy_buffer(&self, src: BufferId, dst: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.lock();
        let data = buffers
            .get(&src)
            .ok_or(ResourceError::UnknownBuffer(src))?
            .data
            .clone();
        let target = buffers.get_mut(&dst).ok_or(ResourceError::UnknownBuffer(dst))?;
        if target.data.len() != data.len() {
            return Err(ResourceError::SizeMismatch {
                label: target.desc.label,
                expected: target.data.len(),
                got: data.len(),
            });
        }
        target.data = data;
        Ok(())
    }

    fn live_buffers(&self) -> usize {
        self.lock().len()
    }
}
