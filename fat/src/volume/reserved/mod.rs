mod bpb;

pub use self::bpb::{Bpb, FatType};
