//! MCA 区域文件解析与写入

use anyhow::{bail, Context, Result};
use fastnbt::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::model::{RegionPos, REGION_CHUNKS};
use crate::nbt;

/// 扇区大小（字节）
pub const SECTOR_SIZE: usize = 4096;

/// 单个区块在区域文件内最多占用的扇区数，超出时写入外部 .mcc 文件
const MAX_SECTORS: usize = 255;

const COMPRESSION_GZIP: u8 = 1;
const COMPRESSION_ZLIB: u8 = 2;
const COMPRESSION_NONE: u8 = 3;
const EXTERNAL_FLAG: u8 = 128;

static REGION_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^r\.(-?\d+)\.(-?\d+)\.mca$").ok());

/// 解析 MCA 文件名，返回 (rx, rz)
pub fn parse_mca_filename(filename: &str) -> Option<(i32, i32)> {
    let re = REGION_NAME.as_ref()?;
    let caps = re.captures(filename)?;
    let rx = caps.get(1)?.as_str().parse().ok()?;
    let rz = caps.get(2)?.as_str().parse().ok()?;
    Some((rx, rz))
}

pub fn region_filename(pos: RegionPos) -> String {
    format!("r.{}.{}.mca", pos.x, pos.z)
}

fn external_filename(chunk_x: i32, chunk_z: i32) -> String {
    format!("c.{}.{}.mcc", chunk_x, chunk_z)
}

fn location(header: &[u8], index: usize) -> (usize, usize) {
    let offset = u32::from_be_bytes([0, header[index * 4], header[index * 4 + 1], header[index * 4 + 2]])
        as usize;
    let sector_count = header[index * 4 + 3] as usize;
    (offset, sector_count)
}

/// 只读取偏移表，列出存在的区块下标
pub fn list_chunks(path: &Path) -> Result<Vec<usize>> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut header = Vec::with_capacity(SECTOR_SIZE);
    Read::by_ref(&mut file)
        .take(SECTOR_SIZE as u64)
        .read_to_end(&mut header)?;
    if header.len() < SECTOR_SIZE {
        return Ok(vec![]);
    }
    Ok((0..REGION_CHUNKS)
        .filter(|&i| {
            let (offset, count) = location(&header, i);
            offset >= 2 && count > 0
        })
        .collect())
}

/// 已载入内存的区域文件，按需解码单个区块
pub struct RegionFile {
    path: PathBuf,
    pos: RegionPos,
    data: Vec<u8>,
}

impl RegionFile {
    pub fn open(path: &Path, pos: RegionPos) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            pos,
            data,
        })
    }

    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    /// 解码下标处的区块；不存在返回 None，数据损坏返回错误
    pub fn read_chunk(&self, index: usize) -> Result<Option<Value>> {
        let data = &self.data;
        if data.len() < SECTOR_SIZE * 2 {
            return Ok(None);
        }
        let (offset, sector_count) = location(data, index);
        if offset == 0 || sector_count == 0 {
            return Ok(None);
        }

        let chunk_offset = offset * SECTOR_SIZE;
        if chunk_offset + 5 > data.len() {
            bail!("Chunk data starts past the end of the region file");
        }

        let length = u32::from_be_bytes([
            data[chunk_offset],
            data[chunk_offset + 1],
            data[chunk_offset + 2],
            data[chunk_offset + 3],
        ]) as usize;
        let compression = data[chunk_offset + 4];

        let external;
        let compressed: &[u8] = if compression & EXTERNAL_FLAG != 0 {
            let chunk = self.pos.chunk_at(index);
            let mcc = self
                .path
                .with_file_name(external_filename(chunk.x, chunk.z));
            external = fs::read(&mcc).with_context(|| format!("Missing external chunk {}", mcc.display()))?;
            &external
        } else {
            if length == 0 || chunk_offset + 4 + length > data.len() {
                bail!("Chunk data is truncated ({} bytes declared)", length);
            }
            &data[chunk_offset + 5..chunk_offset + 4 + length]
        };

        let nbt_data = match compression & !EXTERNAL_FLAG {
            COMPRESSION_GZIP => {
                let mut decoder = flate2::read::GzDecoder::new(compressed);
                let mut decompressed = Vec::new();
                decoder.read_to_end(&mut decompressed)?;
                decompressed
            }
            COMPRESSION_ZLIB => {
                let mut decoder = flate2::read::ZlibDecoder::new(compressed);
                let mut decompressed = Vec::new();
                decoder.read_to_end(&mut decompressed)?;
                decompressed
            }
            COMPRESSION_NONE => compressed.to_vec(),
            other => bail!("Unknown chunk compression {}", other),
        };

        nbt::from_bytes(&nbt_data).map(Some)
    }
}

/// 将区块写入 MCA 文件：zlib 压缩、时间戳清零、按偏移表顺序排列
pub fn write_mca(
    path: &Path,
    pos: RegionPos,
    chunks: &[(usize, Value)],
    compression: flate2::Compression,
) -> Result<()> {
    if chunks.is_empty() {
        return Ok(());
    }

    let mut ordered: Vec<&(usize, Value)> = chunks.iter().collect();
    ordered.sort_by_key(|(index, _)| *index);

    let mut locations = vec![0u8; SECTOR_SIZE];
    let timestamps = vec![0u8; SECTOR_SIZE];
    let mut chunk_sectors: Vec<Vec<u8>> = Vec::new();
    let mut current_sector = 2u32;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    for (index, value) in ordered {
        let nbt_data = nbt::to_bytes(value)?;

        // Zlib 压缩
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), compression);
        encoder.write_all(&nbt_data)?;
        let compressed = encoder.finish()?;

        let mut chunk_length = compressed.len() + 5;
        let mut sector_count = chunk_length.div_ceil(SECTOR_SIZE);

        // 构建 chunk 数据
        let mut chunk_data = Vec::with_capacity(sector_count * SECTOR_SIZE);
        if sector_count > MAX_SECTORS {
            let chunk = pos.chunk_at(*index);
            fs::write(dir.join(external_filename(chunk.x, chunk.z)), &compressed)?;
            chunk_data.extend_from_slice(&1u32.to_be_bytes());
            chunk_data.push(COMPRESSION_ZLIB | EXTERNAL_FLAG);
            chunk_length = 5;
            sector_count = 1;
        } else {
            chunk_data.extend_from_slice(&((compressed.len() + 1) as u32).to_be_bytes());
            chunk_data.push(COMPRESSION_ZLIB);
            chunk_data.extend_from_slice(&compressed);
        }
        debug_assert!(chunk_length <= sector_count * SECTOR_SIZE);
        chunk_data.resize(sector_count * SECTOR_SIZE, 0);

        // 写入位置表
        let idx = index * 4;
        let offset_bytes = current_sector.to_be_bytes();
        locations[idx] = offset_bytes[1];
        locations[idx + 1] = offset_bytes[2];
        locations[idx + 2] = offset_bytes[3];
        locations[idx + 3] = sector_count as u8;

        chunk_sectors.push(chunk_data);
        current_sector += sector_count as u32;
    }

    // 写入文件
    let mut file = File::create(path)?;
    file.write_all(&locations)?;
    file.write_all(&timestamps)?;
    for sector in chunk_sectors {
        file.write_all(&sector)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_chunk(marker: i32) -> Value {
        let mut map = HashMap::new();
        map.insert("DataVersion".to_string(), Value::Int(4189));
        map.insert("marker".to_string(), Value::Int(marker));
        Value::Compound(map)
    }

    #[test]
    fn parses_region_names() {
        assert_eq!(parse_mca_filename("r.-1.2.mca"), Some((-1, 2)));
        assert_eq!(parse_mca_filename("r.0.0.mcr"), None);
        assert_eq!(parse_mca_filename("c.0.0.mcc"), None);
    }

    #[test]
    fn written_chunks_read_back_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let pos = RegionPos { x: -1, z: 0 };
        let path = dir.path().join(region_filename(pos));
        let chunks = vec![(33, sample_chunk(2)), (0, sample_chunk(1))];
        write_mca(&path, pos, &chunks, flate2::Compression::default()).unwrap();

        assert_eq!(list_chunks(&path).unwrap(), vec![0, 33]);
        let region = RegionFile::open(&path, pos).unwrap();
        assert_eq!(region.read_chunk(33).unwrap(), Some(sample_chunk(2)));
        assert_eq!(region.read_chunk(1).unwrap(), None);
    }

    #[test]
    fn truncated_chunk_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let pos = RegionPos { x: 0, z: 0 };
        let path = dir.path().join(region_filename(pos));
        write_mca(&path, pos, &[(0, sample_chunk(1))], flate2::Compression::default()).unwrap();
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(SECTOR_SIZE * 2 + 10);
        fs::write(&path, bytes).unwrap();

        let region = RegionFile::open(&path, pos).unwrap();
        assert!(region.read_chunk(0).is_err());
    }

    #[test]
    fn output_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let pos = RegionPos { x: 0, z: 0 };
        let a = dir.path().join("a.mca");
        let b = dir.path().join("b.mca");
        write_mca(&a, pos, &[(5, sample_chunk(1)), (2, sample_chunk(3))], flate2::Compression::default()).unwrap();
        write_mca(&b, pos, &[(2, sample_chunk(3)), (5, sample_chunk(1))], flate2::Compression::default()).unwrap();
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }
}
