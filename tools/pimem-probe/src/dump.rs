use pimem_regions::{AccessError, Region};
use std::fmt::Write;

const BYTES_PER_LINE: usize = 8;

/// Render the first `len` bytes of a mapped region; `0` dumps all of it.
///
/// Every byte is read through [`Region::reg8`].
pub fn dump<R: Region + ?Sized>(region: &R, len: usize) -> Result<String, AccessError> {
    let base = region.virtual_address().ok_or(AccessError::NotMapped)?.addr();
    let len = if len == 0 { region.size() as usize } else { len };
    render(base, len, |offset| region.reg8(offset).map(|r| r.read()))
}

fn render(
    base: usize,
    len: usize,
    mut read: impl FnMut(usize) -> Result<u8, AccessError>,
) -> Result<String, AccessError> {
    let mut out = String::new();
    // Writing into a String is infallible.
    let _ = writeln!(out, "memdump {len} bytes starting at {base:#X}");
    for offset in 0..len {
        if offset % BYTES_PER_LINE == 0 {
            let _ = write!(out, "{:#X}: ", base + offset);
        }
        let _ = write!(out, "{:08b} ", read(offset)?);
        if (offset + 1) % BYTES_PER_LINE == 0 {
            let _ = writeln!(out, "({})", offset + 1);
        }
    }
    out.push('\n');
    Ok(out)
}
