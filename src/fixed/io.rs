use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::info;

use super::header::render_header;
use super::quantize::{QuantizedStream, storage_bits};
use crate::error::LinkResult;
use crate::modem::SampleStream;

fn ensure_parent(path: &Path) -> LinkResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn create(path: &Path) -> LinkResult<BufWriter<File>> {
    ensure_parent(path)?;
    Ok(BufWriter::new(File::create(path)?))
}

pub fn write_header(
    stream: &QuantizedStream,
    arr_name: &str,
    path: &Path,
) -> LinkResult<()> {
    let text = render_header(stream, arr_name)?;
    let mut file = create(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    info!(
        "Wrote header {} ({} words, {}-bit)",
        path.display(),
        stream.words.len(),
        stream.meta.signal_resolution
    );
    Ok(())
}

/// Little-endian words at the storage width of the stream's resolution.
pub fn encode_raw(stream: &QuantizedStream) -> LinkResult<Vec<u8>> {
    let bits = storage_bits(stream.meta.signal_resolution);
    let mut buf = Vec::with_capacity(stream.words.len() * bits as usize / 8);
    for &word in &stream.words {
        match bits {
            8 => buf.write_u8(word as u8)?,
            16 => buf.write_u16::<LittleEndian>(word as u16)?,
            _ => buf.write_u32::<LittleEndian>(word)?,
        }
    }
    Ok(buf)
}

pub fn write_raw(stream: &QuantizedStream, path: &Path) -> LinkResult<()> {
    let bytes = encode_raw(stream)?;
    let mut file = create(path)?;
    file.write_all(&bytes)?;
    file.flush()?;
    info!("Wrote {} raw bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub fn write_json(stream: &QuantizedStream, path: &Path) -> LinkResult<()> {
    let mut file = create(path)?;
    serde_json::to_writer_pretty(&mut file, stream)?;
    file.flush()?;
    info!("Wrote stream dump {}", path.display());
    Ok(())
}

/// 32-bit float WAV: mono for real passband, stereo (I, Q) for baseband.
pub fn write_wav(
    stream: &SampleStream,
    sample_rate: u32,
    path: &Path,
) -> LinkResult<()> {
    ensure_parent(path)?;
    let spec = hound::WavSpec {
        channels: if stream.is_complex() { 2 } else { 1 },
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    match stream {
        SampleStream::Real(samples) => {
            for &sample in samples {
                writer.write_sample(sample as f32)?;
            }
        }
        SampleStream::Complex(samples) => {
            for sample in samples {
                writer.write_sample(sample.re as f32)?;
                writer.write_sample(sample.im as f32)?;
            }
        }
    }
    writer.finalize()?;
    info!(
        "Wrote {} samples to {} ({} Hz)",
        stream.len(),
        path.display(),
        sample_rate
    );
    Ok(())
}
