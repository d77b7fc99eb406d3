pub mod header;
pub mod io;
pub mod quantize;

pub use header::{render_header, render_header_with};
pub use quantize::{
    QuantizedStream, Quantizer, StreamLayout, StreamMeta, sampling_rate_u32, storage_bits,
};
