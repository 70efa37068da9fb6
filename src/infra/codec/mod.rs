/// Checksum primitives: ASCII XOR frame checksum and Fletcher-16.
pub mod checksum;
/// Binary payload formatter: big-endian scalars, GPS points, identifier
/// strings and raw byte runs, plus the `%N?` directive interpreter.
pub mod payload;
/// ASCII payload codecs: hex, base64 and (write-only) CSV.
pub mod text;
