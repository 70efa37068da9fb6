/// Byte-level codec primitives shared by the framing and event layers.
pub mod codec;
