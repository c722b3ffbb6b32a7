pub use crate::binaries::BinaryData;
pub use crate::kv::{KVError, KeyValue, Value};
pub use crate::vmt::{
    Channel, MaterialDescription, Slot, TextureSlotRef, TextureSource, VMTError, VMT,
};
pub use crate::vtf::{
    consts::{CompiledVtfFlags, ImageFormat},
    DecodedImage, Pixels, VTFError, VTF,
};
