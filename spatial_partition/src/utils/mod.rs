//! Small allocation utilities shared by the tree.

mod slot_allocator;

pub use slot_allocator::SlotAllocator;
