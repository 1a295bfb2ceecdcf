//! 小端 NBT 编解码（Bedrock 使用）
//!
//! 与 Java 的大端 NBT 结构相同，只是所有数值和长度前缀都是小端。
//! 复用 `fastnbt::Value` 作为内存表示，写出时复合标签按键排序。

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fastnbt::Value;
use std::io::{Cursor, Read, Write};

use crate::nbt::{self, Compound};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// 嵌套深度上限，防止损坏数据导致栈溢出
const MAX_DEPTH: usize = 512;

fn tag_id(value: &Value) -> u8 {
    match value {
        Value::Byte(_) => TAG_BYTE,
        Value::Short(_) => TAG_SHORT,
        Value::Int(_) => TAG_INT,
        Value::Long(_) => TAG_LONG,
        Value::Float(_) => TAG_FLOAT,
        Value::Double(_) => TAG_DOUBLE,
        Value::ByteArray(_) => TAG_BYTE_ARRAY,
        Value::String(_) => TAG_STRING,
        Value::List(_) => TAG_LIST,
        Value::Compound(_) => TAG_COMPOUND,
        Value::IntArray(_) => TAG_INT_ARRAY,
        Value::LongArray(_) => TAG_LONG_ARRAY,
    }
}

// ============== 读取 ==============

/// 从流中读取一个根复合标签（名称被丢弃）
pub fn read_root<R: Read>(reader: &mut R) -> Result<Compound> {
    let tag = reader.read_u8().context("Unexpected end of NBT data")?;
    if tag != TAG_COMPOUND {
        bail!("Root tag is {} instead of a compound", tag);
    }
    read_string(reader)?;
    read_compound(reader, 0)
}

/// 解析整段字节中的单个根复合标签
pub fn from_bytes(data: &[u8]) -> Result<Compound> {
    read_root(&mut Cursor::new(data))
}

/// 解析连续存放的多个根复合标签，直到数据结束
pub fn read_all(data: &[u8]) -> Result<Vec<Compound>> {
    let mut cursor = Cursor::new(data);
    let mut out = Vec::new();
    while (cursor.position() as usize) < data.len() {
        out.push(read_root(&mut cursor)?);
    }
    Ok(out)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u16::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    // Bedrock 偶尔写入非法 UTF-8，按有损方式处理
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = reader.read_i32::<LittleEndian>()?;
    if len < 0 {
        bail!("Negative NBT length {}", len);
    }
    Ok(len as usize)
}

fn read_compound<R: Read>(reader: &mut R, depth: usize) -> Result<Compound> {
    let mut map = Compound::new();
    loop {
        let child = reader.read_u8()?;
        if child == TAG_END {
            return Ok(map);
        }
        let name = read_string(reader)?;
        let value = read_payload(reader, child, depth + 1)?;
        map.insert(name, value);
    }
}

fn read_payload<R: Read>(reader: &mut R, tag: u8, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        bail!("NBT nesting too deep");
    }
    let value = match tag {
        TAG_BYTE => Value::Byte(reader.read_i8()?),
        TAG_SHORT => Value::Short(reader.read_i16::<LittleEndian>()?),
        TAG_INT => Value::Int(reader.read_i32::<LittleEndian>()?),
        TAG_LONG => Value::Long(reader.read_i64::<LittleEndian>()?),
        TAG_FLOAT => Value::Float(reader.read_f32::<LittleEndian>()?),
        TAG_DOUBLE => Value::Double(reader.read_f64::<LittleEndian>()?),
        TAG_BYTE_ARRAY => {
            let len = read_len(reader)?;
            let mut buf = Vec::new();
            reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
            if buf.len() < len {
                bail!("Byte array truncated: {} of {} byte(s)", buf.len(), len);
            }
            nbt::byte_array(buf.into_iter().map(|b| b as i8).collect())
        }
        TAG_STRING => Value::String(read_string(reader)?),
        TAG_LIST => {
            let elem = reader.read_u8()?;
            let len = read_len(reader)?;
            if elem == TAG_END && len > 0 {
                bail!("List of end tags with length {}", len);
            }
            let mut list = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                list.push(read_payload(reader, elem, depth + 1)?);
            }
            Value::List(list)
        }
        TAG_COMPOUND => Value::Compound(read_compound(reader, depth)?),
        TAG_INT_ARRAY => {
            let len = read_len(reader)?;
            let mut data = Vec::with_capacity(len.min(65536));
            for _ in 0..len {
                data.push(reader.read_i32::<LittleEndian>()?);
            }
            nbt::int_array(data)
        }
        TAG_LONG_ARRAY => {
            let len = read_len(reader)?;
            let mut data = Vec::with_capacity(len.min(65536));
            for _ in 0..len {
                data.push(reader.read_i64::<LittleEndian>()?);
            }
            nbt::long_array(data)
        }
        other => bail!("Unknown NBT tag type {}", other),
    };
    Ok(value)
}

// ============== 写出 ==============

/// 写出一个无名根复合标签
pub fn write_root<W: Write>(writer: &mut W, root: &Compound) -> Result<()> {
    writer.write_u8(TAG_COMPOUND)?;
    write_string(writer, "")?;
    write_compound(writer, root)
}

pub fn to_bytes(root: &Compound) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_root(&mut buf, root)?;
    Ok(buf)
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).context("NBT string too long")?;
    writer.write_u16::<LittleEndian>(len)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn write_compound<W: Write>(writer: &mut W, map: &Compound) -> Result<()> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        let value = &map[key];
        writer.write_u8(tag_id(value))?;
        write_string(writer, key)?;
        write_payload(writer, value)?;
    }
    writer.write_u8(TAG_END)?;
    Ok(())
}

fn write_payload<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::Byte(v) => writer.write_i8(*v)?,
        Value::Short(v) => writer.write_i16::<LittleEndian>(*v)?,
        Value::Int(v) => writer.write_i32::<LittleEndian>(*v)?,
        Value::Long(v) => writer.write_i64::<LittleEndian>(*v)?,
        Value::Float(v) => writer.write_f32::<LittleEndian>(*v)?,
        Value::Double(v) => writer.write_f64::<LittleEndian>(*v)?,
        Value::ByteArray(arr) => {
            writer.write_i32::<LittleEndian>(arr.len() as i32)?;
            for b in arr.iter() {
                writer.write_i8(*b)?;
            }
        }
        Value::String(s) => write_string(writer, s)?,
        Value::List(list) => {
            let elem = list.first().map(tag_id).unwrap_or(TAG_END);
            if list.iter().any(|v| tag_id(v) != elem) {
                bail!("NBT list mixes element types");
            }
            writer.write_u8(elem)?;
            writer.write_i32::<LittleEndian>(list.len() as i32)?;
            for item in list {
                write_payload(writer, item)?;
            }
        }
        Value::Compound(map) => write_compound(writer, map)?,
        Value::IntArray(arr) => {
            writer.write_i32::<LittleEndian>(arr.len() as i32)?;
            for v in arr.iter() {
                writer.write_i32::<LittleEndian>(*v)?;
            }
        }
        Value::LongArray(arr) => {
            writer.write_i32::<LittleEndian>(arr.len() as i32)?;
            for v in arr.iter() {
                writer.write_i64::<LittleEndian>(*v)?;
            }
        }
    }
    Ok(())
}
