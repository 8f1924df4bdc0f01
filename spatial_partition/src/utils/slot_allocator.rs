/// Allocates and recycles unique `u32` indices.
///
/// Backs the node arena: slot indices stay stable while a node lives and
/// are recycled after it is pruned. A caller may ask for a specific free
/// slot, which the node arena uses to keep every child's slot above its
/// parent's.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new();
/// let a = alloc.alloc();  // 0
/// let b = alloc.alloc();  // 1
/// alloc.free(a);           // 0 is now available
/// let c = alloc.alloc();  // 0 (recycled)
/// ```
pub struct SlotAllocator {
    free_list: Vec<u32>,
    next_id: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            next_id: 0,
            len: 0,
        }
    }

    /// Allocate the next available slot index
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        self.free_list.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        })
    }

    /// Allocate a never-used slot, ignoring the free list
    pub fn alloc_fresh(&mut self) -> u32 {
        self.len += 1;
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocate `hint` if it is free, otherwise behave like `alloc`
    pub fn alloc_hint(&mut self, hint: Option<u32>) -> u32 {
        if let Some(pos) = hint.and_then(|h| self.free_list.iter().position(|&id| id == h)) {
            self.len += 1;
            return self.free_list.swap_remove(pos);
        }
        self.alloc()
    }

    /// Return a slot index to the pool for reuse
    pub fn free(&mut self, id: u32) {
        debug_assert!(id < self.next_id, "freeing an unallocated slot: {}", id);
        debug_assert!(!self.free_list.contains(&id), "double free of slot {}", id);
        self.len -= 1;
        self.free_list.push(id);
    }

    /// Smallest free (recycled) slot strictly greater than `index`
    pub fn first_free_after(&self, index: u32) -> Option<u32> {
        self.free_list.iter().copied().filter(|&id| id > index).min()
    }

    /// Whether `id` was allocated once and is now waiting for reuse
    pub fn is_free(&self, id: u32) -> bool {
        self.free_list.contains(&id)
    }

    /// Whether `id` is currently allocated
    pub fn is_allocated(&self, id: u32) -> bool {
        id < self.next_id && !self.free_list.contains(&id)
    }

    /// Highest index ever allocated + 1.
    ///
    /// Minimum capacity the backing storage must have to hold every
    /// allocated index.
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forget every slot, including the high water mark
    pub fn clear(&mut self) {
        self.free_list.clear();
        self.next_id = 0;
        self.len = 0;
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
