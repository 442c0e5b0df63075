//! In-memory font binaries for tests
//!
//! The fixture face has 1000 units per em, ascender 800 and descender -200,
//! and two glyphs: an empty `.notdef` and a solid box spanning x 100..500,
//! y 0..700 with a 600 unit advance. Every printable ASCII character except
//! the space maps to the box, so text shapes and fills like a real font.

/// Advance width of every glyph, in font units
pub const FIXTURE_ADVANCE: u16 = 600;

/// Family name stored in the fixture's `name` table
pub const FIXTURE_FAMILY: &str = "Imprint Fixture";

/// A small valid TrueType face named [`FIXTURE_FAMILY`]
pub fn minimal_font() -> Vec<u8> {
    named_font(FIXTURE_FAMILY)
}

/// The fixture face with `family` in its `name` table
pub fn named_font(family: &str) -> Vec<u8> {
    let mut head = vec![0u8; 54];
    put_u32(&mut head, 0, 0x0001_0000); // version
    put_u32(&mut head, 12, 0x5F0F_3CF5); // magic
    put_u16(&mut head, 18, 1000); // unitsPerEm
    put_u16(&mut head, 40, 500); // xMax
    put_u16(&mut head, 42, 700); // yMax
    put_u16(&mut head, 50, 0); // indexToLocFormat (short)

    let mut hhea = vec![0u8; 36];
    put_u32(&mut hhea, 0, 0x0001_0000);
    put_u16(&mut hhea, 4, 800); // ascender
    put_u16(&mut hhea, 6, (-200i16) as u16); // descender
    put_u16(&mut hhea, 10, FIXTURE_ADVANCE); // advanceWidthMax
    put_u16(&mut hhea, 34, 2); // numberOfHMetrics

    let mut maxp = vec![0u8; 6];
    put_u32(&mut maxp, 0, 0x0000_5000);
    put_u16(&mut maxp, 4, 2); // numGlyphs

    let glyf = box_glyph(100, 0, 500, 700);
    let mut loca = vec![0u8; 6];
    put_u16(&mut loca, 4, (glyf.len() / 2) as u16); // glyph 0 empty, glyph 1 the box

    let mut hmtx = vec![0u8; 8];
    put_u16(&mut hmtx, 0, FIXTURE_ADVANCE);
    put_u16(&mut hmtx, 4, FIXTURE_ADVANCE);
    put_u16(&mut hmtx, 6, 100); // lsb

    build_sfnt(&[
        (*b"cmap", ascii_cmap()),
        (*b"glyf", glyf),
        (*b"head", head),
        (*b"hhea", hhea),
        (*b"hmtx", hmtx),
        (*b"loca", loca),
        (*b"maxp", maxp),
        (*b"name", name_table(family)),
    ])
}

/// One closed rectangular contour, on-curve points, 16-bit deltas
fn box_glyph(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [1, x_min, y_min, x_max, y_max] {
        out.extend_from_slice(&v.to_be_bytes()); // numberOfContours, bbox
    }
    out.extend_from_slice(&3u16.to_be_bytes()); // endPtsOfContours
    out.extend_from_slice(&0u16.to_be_bytes()); // instructionLength
    out.extend_from_slice(&[0x01; 4]); // flags: on curve
    for dx in [x_min, x_max - x_min, 0, x_min - x_max] {
        out.extend_from_slice(&dx.to_be_bytes());
    }
    for dy in [y_min, 0, y_max - y_min, 0] {
        out.extend_from_slice(&dy.to_be_bytes());
    }
    out
}

/// Format 4 subtable (Windows BMP) mapping U+0021..U+007E to glyph 1
fn ascii_cmap() -> Vec<u8> {
    const FIRST: u16 = 0x20;
    const LAST: u16 = 0x7E;
    let glyph_ids: Vec<u16> = (FIRST..=LAST).map(|c| u16::from(c != FIRST)).collect();

    let seg_count = 2u16;
    let mut sub = Vec::new();
    let length = 16 + 8 * seg_count as usize + 2 * glyph_ids.len();
    for v in [4, length as u16, 0, seg_count * 2, 4, 1, 0] {
        sub.extend_from_slice(&v.to_be_bytes()); // header, searchRange..rangeShift
    }
    for v in [LAST, 0xFFFF, 0, FIRST, 0xFFFF, 0, 1] {
        sub.extend_from_slice(&v.to_be_bytes()); // endCode, pad, startCode, idDelta
    }
    // idRangeOffset: segment 0 points at glyphIdArray, the terminator at nothing
    sub.extend_from_slice(&(seg_count * 2).to_be_bytes());
    sub.extend_from_slice(&0u16.to_be_bytes());
    for id in glyph_ids {
        sub.extend_from_slice(&id.to_be_bytes());
    }

    let mut out = Vec::new();
    for v in [0u16, 1, 3, 1] {
        out.extend_from_slice(&v.to_be_bytes()); // version, numTables, platform, encoding
    }
    out.extend_from_slice(&12u32.to_be_bytes());
    out.extend_from_slice(&sub);
    out
}

/// Format 0 `name` table with family (1) and PostScript (6) names
fn name_table(family: &str) -> Vec<u8> {
    let family: Vec<u8> = family.encode_utf16().flat_map(u16::to_be_bytes).collect();
    let postscript: Vec<u8> = family_to_postscript(&family);
    let records = [(1u16, &family), (6u16, &postscript)];

    let mut out = Vec::new();
    let string_offset = 6 + 12 * records.len() as u16;
    for v in [0, records.len() as u16, string_offset] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    let mut offset = 0u16;
    for (name_id, bytes) in records {
        for v in [3, 1, 0x0409, name_id, bytes.len() as u16, offset] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        offset += bytes.len() as u16;
    }
    for (_, bytes) in records {
        out.extend_from_slice(bytes);
    }
    out
}

/// PostScript names carry no spaces
fn family_to_postscript(utf16_be: &[u8]) -> Vec<u8> {
    utf16_be
        .chunks(2)
        .filter(|unit| **unit != [0u8, b' '])
        .flatten()
        .copied()
        .collect()
}

/// Assemble an sfnt container; `tables` must be sorted by tag
fn build_sfnt(tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let mut entry_selector = 0u16;
    while (1u16 << (entry_selector + 1)) <= num_tables {
        entry_selector += 1;
    }
    let search_range = (1u16 << entry_selector) * 16;

    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&(num_tables * 16 - search_range).to_be_bytes());

    let mut offset = 12 + 16 * tables.len();
    for (tag, data) in tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&checksum(data).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += padded(data.len());
    }

    for (_, data) in tables {
        out.extend_from_slice(data);
        out.resize(out.len() + padded(data.len()) - data.len(), 0);
    }
    out
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
}
