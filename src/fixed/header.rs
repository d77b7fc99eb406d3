//! C header rendering of a quantized stream.
//!
//! Layout: include guard, `stream_data_t` and `stream_meta_t` typedefs (each
//! behind its own guard so several headers can be included together), the
//! `<name>_meta` initializer, then the `<name>[]` word array.

use std::fmt::Write;

use super::quantize::{QuantizedStream, storage_bits};
use crate::error::{LinkError, LinkResult};
use crate::utils::consts::HEADER_ELEMENTS_PER_LINE;

pub fn render_header(stream: &QuantizedStream, arr_name: &str) -> LinkResult<String> {
    render_header_with(stream, arr_name, HEADER_ELEMENTS_PER_LINE)
}

pub fn render_header_with(
    stream: &QuantizedStream,
    arr_name: &str,
    elements_per_line: usize,
) -> LinkResult<String> {
    if !is_c_identifier(arr_name) {
        return Err(LinkError::invalid(format!(
            "'{arr_name}' is not a valid C identifier"
        )));
    }
    let per_line = elements_per_line.max(1);
    let guard = format!("{}_H", arr_name.to_uppercase());
    let meta = &stream.meta;

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("#ifndef {guard}"));
    lines.push(format!("#define {guard}"));
    lines.push(String::new());
    lines.push("#include <stdint.h>".into());
    lines.push(String::new());

    lines.push("#ifndef STREAM_DATA_TYPE".into());
    lines.push("#define STREAM_DATA_TYPE".into());
    lines.push(format!(
        "typedef uint{}_t stream_data_t;",
        storage_bits(meta.signal_resolution)
    ));
    lines.push("#endif".into());
    lines.push(String::new());

    lines.push("#ifndef STREAM_METADATA_TYPE".into());
    lines.push("#define STREAM_METADATA_TYPE".into());
    lines.push("typedef struct {".into());
    lines.push("    uint32_t sampling_rate;".into());
    lines.push("    uint32_t signal_resolution;".into());
    lines.push("    float carrier_freq;".into());
    lines.push("    float samples_per_symbol;".into());
    lines.push("    uint32_t n_samples;".into());
    lines.push("    float scale;".into());
    lines.push("} stream_meta_t;".into());
    lines.push("#endif".into());
    lines.push(String::new());

    lines.push(format!("static const stream_meta_t {arr_name}_meta = {{"));
    lines.push(format!("    .sampling_rate = {},", meta.sampling_rate));
    lines.push(format!("    .signal_resolution = {},", meta.signal_resolution));
    lines.push(format!("    .carrier_freq = {:?},", meta.carrier_freq));
    lines.push(format!("    .samples_per_symbol = {:?},", meta.samples_per_symbol));
    lines.push(format!("    .n_samples = {},", meta.n_samples));
    lines.push(format!("    .scale = {:?},", meta.scale));
    lines.push("};".into());
    lines.push(String::new());

    lines.push(format!("static const stream_data_t {arr_name}[] = {{"));
    let chunks: Vec<&[u32]> = stream.words.chunks(per_line).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        let mut line = String::from("    ");
        for (k, word) in chunk.iter().enumerate() {
            if k > 0 {
                line.push_str(", ");
            }
            // writing into a String cannot fail
            let _ = write!(line, "{word}");
        }
        if i + 1 < chunks.len() {
            line.push(',');
        }
        lines.push(line);
    }
    lines.push("};".into());
    lines.push(String::new());
    lines.push(format!("#endif /* {guard} */"));
    lines.push(String::new());

    Ok(lines.join("\n"))
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
