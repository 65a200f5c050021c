pub mod block;

pub use block::BlockRecord;
