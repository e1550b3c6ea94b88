//! Chunked storage for many small records that each carry a variable-length payload.
//!
//! Every record is a typed header plus a run of raw payload bytes. Small records are carved
//! from large chunks and live until the arena is dropped; a record whose cost reaches half a
//! chunk gets a dedicated block that can be released on its own. Records are addressed by
//! [`RecordId`], which stays valid while chunks are added, so callers never hold addresses.
//! Released block slots are reused under a new generation, so a stale id never reaches the
//! record that took its place.
//!
//! A document that is loaded once and rarely edited can ask for a single bulk block sized by a
//! dry-run estimate; every record of the load then lands in that one allocation.

use std::fmt;
use std::mem;

use crate::error::{Error, Result};

/// Default size of the chunks small records are carved from, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Stable address of a record inside an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Record carved from a shared chunk; never freed individually.
    Chunk {
        /// Index of the chunk in allocation order.
        chunk: usize,
        /// Index of the record within its chunk.
        slot: usize,
    },
    /// Record living in its own block.
    Dedicated {
        /// Index of the block slot.
        block: usize,
        /// Reuse count of the slot when the record was allocated.
        generation: u32,
    },
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chunk { chunk, slot } => write!(f, "{chunk}:{slot}"),
            Self::Dedicated { block, generation } => write!(f, "d{block}.{generation}"),
        }
    }
}

/// Snapshot of how much memory an arena holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of chunks, including a bulk block.
    pub chunks: usize,
    /// Bytes reserved across all chunks.
    pub chunk_bytes: usize,
    /// Bytes of chunk space handed out to records.
    pub used_bytes: usize,
    /// Dedicated blocks that have not been released.
    pub dedicated_blocks: usize,
    /// Payload bytes held by live dedicated blocks.
    pub dedicated_bytes: usize,
}

struct Slot<T> {
    header: T,
    offset: usize,
    capacity: usize,
}

struct Chunk<T> {
    budget: usize,
    used: usize,
    bulk: bool,
    bytes: Vec<u8>,
    slots: Vec<Slot<T>>,
}

impl<T> Chunk<T> {
    fn reserve(budget: usize, bulk: bool) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(budget)
            .map_err(|source| Error::OutOfMemory {
                requested: budget,
                source,
            })?;

        Ok(Self {
            budget,
            used: 0,
            bulk,
            bytes,
            slots: Vec::new(),
        })
    }

    fn remaining(&self) -> usize {
        self.budget - self.used
    }

    /// Caller guarantees `cost <= self.remaining()`, so `bytes` never reallocates.
    fn carve(&mut self, header: T, payload: usize, cost: usize) -> usize {
        let offset = self.bytes.len();
        self.bytes.resize(offset + payload, 0);
        self.used += cost;
        self.slots.push(Slot {
            header,
            offset,
            capacity: payload,
        });
        self.slots.len() - 1
    }
}

struct Block<T> {
    header: T,
    bytes: Vec<u8>,
}

struct BlockSlot<T> {
    generation: u32,
    block: Option<Block<T>>,
}

/// Record storage handing out chunk-carved or dedicated allocations.
pub struct Arena<T> {
    chunk_size: usize,
    chunks: Vec<Chunk<T>>,
    blocks: Vec<BlockSlot<T>>,
    free_blocks: Vec<usize>,
}

impl<T> Arena<T> {
    #[must_use]
    /// Creates an empty arena that opens chunks of `chunk_size` bytes on demand.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunks: Vec::new(),
            blocks: Vec::new(),
            free_blocks: Vec::new(),
        }
    }

    /// Creates an arena whose first chunk is a bulk block of exactly `bytes` bytes.
    ///
    /// The bulk block accepts records of any size while it has room, which lets a whole
    /// document load land in one allocation when `bytes` came from a matching estimate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the block cannot be reserved.
    pub fn with_bulk_capacity(chunk_size: usize, bytes: usize) -> Result<Self> {
        let mut arena = Self::new(chunk_size);
        if bytes > 0 {
            arena.chunks.push(Chunk::reserve(bytes, true)?);
        }
        Ok(arena)
    }

    #[must_use]
    /// Space a record with `payload` bytes consumes in a chunk, header and padding included.
    pub fn record_cost(payload: usize) -> usize {
        (mem::size_of::<T>() + payload).next_multiple_of(mem::align_of::<T>())
    }

    #[must_use]
    /// Size of the chunks opened for small records.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stores `header` together with `payload` zeroed bytes and returns the record's address.
    ///
    /// Records costing less than half a chunk share chunks; an allocation never straddles two
    /// chunks, so a record that does not fit the open chunk starts a new one. Larger records
    /// get a dedicated block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if a new chunk or block cannot be reserved.
    pub fn allocate(&mut self, header: T, payload: usize) -> Result<RecordId> {
        let cost = Self::record_cost(payload);

        let open = self.chunks.len().checked_sub(1);
        if let Some(chunk) = open {
            if self.chunks[chunk].bulk && self.chunks[chunk].remaining() >= cost {
                let slot = self.chunks[chunk].carve(header, payload, cost);
                return Ok(RecordId::Chunk { chunk, slot });
            }
        }

        if cost.saturating_mul(2) < self.chunk_size {
            let has_room = matches!(self.chunks.last(), Some(c) if c.remaining() >= cost);
            if !has_room {
                self.chunks.push(Chunk::reserve(self.chunk_size, false)?);
            }
            let chunk = self.chunks.len() - 1;
            let slot = self.chunks[chunk].carve(header, payload, cost);
            return Ok(RecordId::Chunk { chunk, slot });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(payload)
            .map_err(|source| Error::OutOfMemory {
                requested: payload,
                source,
            })?;
        bytes.resize(payload, 0);
        let block = Some(Block { header, bytes });
        if let Some(index) = self.free_blocks.pop() {
            let slot = &mut self.blocks[index];
            slot.block = block;
            return Ok(RecordId::Dedicated {
                block: index,
                generation: slot.generation,
            });
        }
        self.blocks.push(BlockSlot {
            generation: 0,
            block,
        });
        Ok(RecordId::Dedicated {
            block: self.blocks.len() - 1,
            generation: 0,
        })
    }

    /// Frees a dedicated block. Chunk records are only freed with the arena.
    ///
    /// Returns `true` if memory was given back.
    pub fn release(&mut self, id: RecordId) -> bool {
        match id {
            RecordId::Chunk { .. } => false,
            RecordId::Dedicated { block, generation } => {
                let Some(slot) = self.blocks.get_mut(block) else {
                    return false;
                };
                if slot.generation != generation || slot.block.take().is_none() {
                    return false;
                }
                slot.generation = slot.generation.wrapping_add(1);
                self.free_blocks.push(block);
                true
            }
        }
    }

    #[must_use]
    /// Whether `id` addresses a record that has not been released.
    pub fn contains(&self, id: RecordId) -> bool {
        self.header(id).is_some()
    }

    #[must_use]
    /// Header of a record.
    pub fn header(&self, id: RecordId) -> Option<&T> {
        self.record(id).map(|(header, _)| header)
    }

    /// Mutable header of a record.
    pub fn header_mut(&mut self, id: RecordId) -> Option<&mut T> {
        self.record_mut(id).map(|(header, _)| header)
    }

    #[must_use]
    /// Full payload of a record (its allocated capacity, not just the bytes in use).
    pub fn payload(&self, id: RecordId) -> Option<&[u8]> {
        self.record(id).map(|(_, payload)| payload)
    }

    #[must_use]
    /// Header and payload of a record.
    pub fn record(&self, id: RecordId) -> Option<(&T, &[u8])> {
        match id {
            RecordId::Chunk { chunk, slot } => {
                let chunk = self.chunks.get(chunk)?;
                let slot = chunk.slots.get(slot)?;
                let payload = &chunk.bytes[slot.offset..slot.offset + slot.capacity];
                Some((&slot.header, payload))
            }
            RecordId::Dedicated { block, generation } => {
                let slot = self.blocks.get(block)?;
                if slot.generation != generation {
                    return None;
                }
                let block = slot.block.as_ref()?;
                Some((&block.header, block.bytes.as_slice()))
            }
        }
    }

    /// Mutable header and payload of a record.
    pub fn record_mut(&mut self, id: RecordId) -> Option<(&mut T, &mut [u8])> {
        match id {
            RecordId::Chunk { chunk, slot } => {
                let chunk = self.chunks.get_mut(chunk)?;
                let slot = chunk.slots.get_mut(slot)?;
                let payload = &mut chunk.bytes[slot.offset..slot.offset + slot.capacity];
                Some((&mut slot.header, payload))
            }
            RecordId::Dedicated { block, generation } => {
                let slot = self.blocks.get_mut(block)?;
                if slot.generation != generation {
                    return None;
                }
                let block = slot.block.as_mut()?;
                Some((&mut block.header, block.bytes.as_mut_slice()))
            }
        }
    }

    #[must_use]
    /// Reports chunk and block usage.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            chunks: self.chunks.len(),
            ..ArenaStats::default()
        };
        for chunk in &self.chunks {
            stats.chunk_bytes += chunk.budget;
            stats.used_bytes += chunk.used;
        }
        for block in self.blocks.iter().filter_map(|slot| slot.block.as_ref()) {
            stats.dedicated_blocks += 1;
            stats.dedicated_bytes += block.bytes.len();
        }
        stats
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
#[path = "tests/arena.rs"]
mod tests;
