//! Bedrock 调色板存储：sub-chunk（格式 8/9）与 Data3D
//!
//! 方块下标为 XZY 顺序（`x * 256 + z * 16 + y`），模型内部为 YZX，
//! 编解码时在这里转换。

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fastnbt::Value;
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::model::{BlockState, PropValue, SECTION_VOLUME};
use crate::nbt::{self, Compound};
use crate::nbt_le;
use crate::schema::catalog::SUBCHUNK_VERSION;

/// 合法的每格位数
const VALID_BITS: [u8; 8] = [1, 2, 3, 4, 5, 6, 8, 16];

/// Data3D 中表示"与下方存储相同"的头字节
const COPY_BELOW: u8 = 0xFF;

pub const HEIGHTMAP_LEN: usize = 256;

pub fn bits_per_entry(palette_len: usize) -> u8 {
    VALID_BITS
        .into_iter()
        .find(|&bits| palette_len <= 1usize << bits)
        .unwrap_or(16)
}

fn xzy_index(yzx: usize) -> usize {
    let (y, z, x) = (yzx / 256, (yzx / 16) % 16, yzx % 16);
    x * 256 + z * 16 + y
}

/// YZX 顺序的下标写成 32 位字，条目不跨字
fn write_words(out: &mut Vec<u8>, indices: &[u16], bits: u8) -> Result<()> {
    let per_word = 32 / bits as usize;
    let mask = (1u32 << bits) - 1;
    let mut ordered = vec![0u16; SECTION_VOLUME];
    for (i, &v) in indices.iter().enumerate() {
        ordered[xzy_index(i)] = v;
    }
    for chunk in ordered.chunks(per_word) {
        let mut word = 0u32;
        for (slot, &v) in chunk.iter().enumerate() {
            word |= (v as u32 & mask) << (slot * bits as usize);
        }
        out.write_u32::<LittleEndian>(word)?;
    }
    Ok(())
}

/// 读取 32 位字，返回 YZX 顺序的下标
fn read_words(cursor: &mut Cursor<&[u8]>, bits: u8) -> Result<Vec<u16>> {
    if !VALID_BITS.contains(&bits) {
        bail!("Invalid bits per entry {}", bits);
    }
    let per_word = 32 / bits as usize;
    let mask = (1u32 << bits) - 1;
    let words = SECTION_VOLUME.div_ceil(per_word);
    let mut ordered = Vec::with_capacity(words * per_word);
    for _ in 0..words {
        let word = cursor
            .read_u32::<LittleEndian>()
            .context("Palette storage is truncated")?;
        for slot in 0..per_word {
            ordered.push(((word >> (slot * bits as usize)) & mask) as u16);
        }
    }
    Ok((0..SECTION_VOLUME).map(|i| ordered[xzy_index(i)]).collect())
}

fn read_count(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    let count = cursor
        .read_i32::<LittleEndian>()
        .context("Palette size is truncated")?;
    if !(0..=SECTION_VOLUME as i32).contains(&count) {
        bail!("Palette size {} out of range", count);
    }
    Ok(count as usize)
}

// ============== 方块状态 ==============

pub fn decode_block_state(map: &Compound) -> Result<BlockState> {
    let Some(name) = nbt::get_str(map, "name") else {
        bail!("Block palette entry without name");
    };
    let mut properties = BTreeMap::new();
    if let Some(states) = nbt::get_compound(map, "states") {
        for (k, v) in states {
            let value = match v {
                Value::String(s) => PropValue::Str(s.clone()),
                Value::Byte(b) => PropValue::Byte(*b),
                other => match nbt::as_i64(other) {
                    Some(i) => PropValue::Int(i as i32),
                    None => continue,
                },
            };
            properties.insert(k.clone(), value);
        }
    }
    let name = if name.contains(':') {
        name.to_string()
    } else {
        format!("minecraft:{}", name)
    };
    Ok(BlockState { name, properties })
}

pub fn encode_block_state(state: &BlockState, block_version: i32) -> Compound {
    let states: Compound = state
        .properties
        .iter()
        .map(|(k, v)| {
            let value = match v {
                PropValue::Str(s) => nbt::string(s),
                PropValue::Int(i) => Value::Int(*i),
                PropValue::Byte(b) => Value::Byte(*b),
            };
            (k.clone(), value)
        })
        .collect();
    let mut map = Compound::new();
    map.insert("name".to_string(), nbt::string(&state.name));
    map.insert("states".to_string(), Value::Compound(states));
    map.insert("version".to_string(), Value::Int(block_version));
    map
}

// ============== sub-chunk ==============

/// 解码 sub-chunk 的第一层存储，返回 (调色板, YZX 下标)
pub fn decode_subchunk(data: &[u8]) -> Result<(Vec<BlockState>, Vec<u16>)> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8().context("Empty sub-chunk")?;
    if version != 8 && version != 9 {
        bail!("Unsupported sub-chunk format {}", version);
    }
    let layers = cursor.read_u8().context("Sub-chunk is truncated")?;
    if version == 9 {
        cursor.read_i8().context("Sub-chunk is truncated")?;
    }
    if layers == 0 {
        return Ok((vec![BlockState::air()], vec![0; SECTION_VOLUME]));
    }

    let header = cursor.read_u8().context("Sub-chunk is truncated")?;
    if header & 1 != 0 {
        bail!("Runtime palette in persisted sub-chunk");
    }
    let bits = header >> 1;
    let indices = if bits == 0 {
        vec![0; SECTION_VOLUME]
    } else {
        read_words(&mut cursor, bits)?
    };
    let count = read_count(&mut cursor)?;
    let mut palette = Vec::with_capacity(count);
    for _ in 0..count {
        let entry = nbt_le::read_root(&mut cursor)?;
        palette.push(decode_block_state(&entry)?);
    }
    if palette.is_empty() {
        bail!("Sub-chunk palette is empty");
    }
    if indices.iter().any(|&i| i as usize >= palette.len()) {
        bail!("Sub-chunk index out of palette range");
    }
    Ok((palette, indices))
}

/// 编码为格式 9、单层存储
pub fn encode_subchunk(y: i8, palette: &[BlockState], indices: &[u16], block_version: i32) -> Result<Vec<u8>> {
    let bits = bits_per_entry(palette.len());
    let mut out = Vec::new();
    out.write_u8(SUBCHUNK_VERSION)?;
    out.write_u8(1)?;
    out.write_i8(y)?;
    out.write_u8(bits << 1)?;
    write_words(&mut out, indices, bits)?;
    out.write_i32::<LittleEndian>(palette.len() as i32)?;
    for state in palette {
        nbt_le::write_root(&mut out, &encode_block_state(state, block_version))?;
    }
    Ok(out)
}

// ============== Data3D ==============

/// 一个 section 的生物群系存储：数字 ID 调色板 + 逐格（16³，YZX）下标
pub type BiomeStorage = (Vec<i32>, Vec<u16>);

/// 解码 Data3D：256 个 i16 高度 + 按 section 自下而上的生物群系存储
pub fn decode_data3d(data: &[u8]) -> Result<(Vec<i16>, Vec<BiomeStorage>)> {
    let mut cursor = Cursor::new(data);
    let mut heights = vec![0i16; HEIGHTMAP_LEN];
    cursor
        .read_i16_into::<LittleEndian>(&mut heights)
        .context("Data3D heightmap is truncated")?;

    let mut storages: Vec<BiomeStorage> = Vec::new();
    while (cursor.position() as usize) < data.len() {
        let header = cursor.read_u8()?;
        if header == COPY_BELOW {
            let Some(below) = storages.last().cloned() else {
                bail!("Data3D starts with a copy marker");
            };
            storages.push(below);
            continue;
        }
        let bits = header >> 1;
        let storage = if bits == 0 {
            let id = cursor.read_i32::<LittleEndian>().context("Data3D is truncated")?;
            (vec![id], vec![0; SECTION_VOLUME])
        } else {
            let indices = read_words(&mut cursor, bits)?;
            let count = read_count(&mut cursor)?;
            let mut palette = vec![0i32; count];
            cursor
                .read_i32_into::<LittleEndian>(&mut palette)
                .context("Data3D palette is truncated")?;
            if palette.is_empty() || indices.iter().any(|&i| i as usize >= palette.len()) {
                bail!("Data3D index out of palette range");
            }
            (palette, indices)
        };
        storages.push(storage);
    }
    Ok((heights, storages))
}

pub fn encode_data3d(heights: &[i16], storages: &[BiomeStorage]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEIGHTMAP_LEN * 2 + storages.len() * 8);
    for &h in heights.iter().take(HEIGHTMAP_LEN) {
        out.write_i16::<LittleEndian>(h)?;
    }
    let mut previous: Option<&BiomeStorage> = None;
    for storage in storages {
        if previous == Some(storage) {
            out.write_u8(COPY_BELOW)?;
            continue;
        }
        let (palette, indices) = storage;
        let bits = bits_per_entry(palette.len());
        out.write_u8((bits << 1) | 1)?;
        write_words(&mut out, indices, bits)?;
        out.write_i32::<LittleEndian>(palette.len() as i32)?;
        for &id in palette {
            out.write_i32::<LittleEndian>(id)?;
        }
        previous = Some(storage);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_valid_widths() {
        assert_eq!(bits_per_entry(1), 1);
        assert_eq!(bits_per_entry(2), 1);
        assert_eq!(bits_per_entry(3), 2);
        assert_eq!(bits_per_entry(33), 6);
        assert_eq!(bits_per_entry(65), 8);
        assert_eq!(bits_per_entry(300), 16);
    }

    #[test]
    fn subchunk_keeps_block_positions() {
        let palette = vec![
            BlockState::air(),
            BlockState::new("minecraft:stone"),
            BlockState::new("minecraft:oak_log").with_str("pillar_axis", "x"),
            BlockState::new("minecraft:water").with("liquid_depth", PropValue::Int(0)),
        ];
        let mut indices = vec![0u16; SECTION_VOLUME];
        indices[1] = 1; // x=1
        indices[16] = 2; // z=1
        indices[256] = 3; // y=1
        let bytes = encode_subchunk(-2, &palette, &indices, 18_100_737).unwrap();
        assert_eq!(&bytes[..4], &[9, 1, (-2i8) as u8, 2 << 1]);

        let (decoded_palette, decoded) = decode_subchunk(&bytes).unwrap();
        assert_eq!(decoded_palette, palette);
        assert_eq!(decoded, indices);
    }

    #[test]
    fn xzy_order_on_disk() {
        let palette = vec![BlockState::air(), BlockState::new("minecraft:stone")];
        let mut indices = vec![0u16; SECTION_VOLUME];
        // YZX 下标 256 即 (x=0, y=1, z=0)，磁盘上是 XZY 下标 1
        indices[256] = 1;
        let bytes = encode_subchunk(0, &palette, &indices, 0).unwrap();
        let first_word = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(first_word, 0b10);
    }

    #[test]
    fn truncated_subchunk_is_an_error() {
        let palette = vec![BlockState::air(), BlockState::new("minecraft:stone")];
        let bytes = encode_subchunk(0, &palette, &vec![1; SECTION_VOLUME], 0).unwrap();
        assert!(decode_subchunk(&bytes[..100]).is_err());
        assert!(decode_subchunk(&[7, 1]).is_err());
    }

    #[test]
    fn data3d_collapses_repeated_storages() {
        let heights: Vec<i16> = (0..256).map(|i| (i % 70) as i16).collect();
        let plains = (vec![1], vec![0u16; SECTION_VOLUME]);
        let mut mixed = (vec![1, 4], vec![0u16; SECTION_VOLUME]);
        mixed.1[4095] = 1;
        let storages = vec![plains.clone(), plains.clone(), mixed.clone(), plains];
        let bytes = encode_data3d(&heights, &storages).unwrap();
        assert_eq!(bytes[512 + 1 + 512 + 4 + 4], COPY_BELOW);

        let (h, s) = decode_data3d(&bytes).unwrap();
        assert_eq!(h, heights);
        assert_eq!(s, storages);
    }

    #[test]
    fn uniform_biome_storage_reads_single_id() {
        let mut bytes = vec![0u8; 512];
        bytes.push(0);
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.push(COPY_BELOW);
        let (_, storages) = decode_data3d(&bytes).unwrap();
        assert_eq!(storages.len(), 2);
        assert_eq!(storages[1].0, vec![7]);
    }
}
