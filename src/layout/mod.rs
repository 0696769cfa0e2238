pub mod packer;

pub use packer::{pack, pack_by_owner, OwnerLane, PackedWeek, Placement, SlotGrid};
