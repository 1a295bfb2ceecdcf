//! NBT 辅助：确定性序列化与宽松取值

use anyhow::{Context, Result};
use fastnbt::{ByteArray, IntArray, LongArray, Value};
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

pub type Compound = HashMap<String, Value>;

/// 按键排序序列化 `Value`，使相同内容总是得到相同字节
pub struct Sorted<'a>(pub &'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Compound(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                serializer.collect_map(keys.into_iter().map(|k| (k, Sorted(&map[k]))))
            }
            Value::List(list) => serializer.collect_seq(list.iter().map(Sorted)),
            other => other.serialize(serializer),
        }
    }
}

/// 序列化为大端 NBT（Java）
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    fastnbt::to_bytes(&Sorted(value)).context("Failed to serialize NBT")
}

pub fn from_bytes(data: &[u8]) -> Result<Value> {
    fastnbt::from_bytes(data).context("Failed to parse NBT")
}

pub fn compound(value: &Value) -> Option<&Compound> {
    match value {
        Value::Compound(map) => Some(map),
        _ => None,
    }
}

pub fn into_compound(value: Value) -> Option<Compound> {
    match value {
        Value::Compound(map) => Some(map),
        _ => None,
    }
}

/// 任意整数类型按 i64 读取
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(v) => Some(*v as i64),
        Value::Short(v) => Some(*v as i64),
        Value::Int(v) => Some(*v as i64),
        Value::Long(v) => Some(*v),
        _ => None,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v as f64),
        Value::Double(v) => Some(*v),
        other => as_i64(other).map(|v| v as f64),
    }
}

pub fn get_i64(map: &Compound, key: &str) -> Option<i64> {
    map.get(key).and_then(as_i64)
}

pub fn get_i32(map: &Compound, key: &str) -> Option<i32> {
    get_i64(map, key).and_then(|v| i32::try_from(v).ok())
}

pub fn get_str<'a>(map: &'a Compound, key: &str) -> Option<&'a str> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

pub fn get_compound<'a>(map: &'a Compound, key: &str) -> Option<&'a Compound> {
    map.get(key).and_then(compound)
}

pub fn get_list<'a>(map: &'a Compound, key: &str) -> Option<&'a [Value]> {
    match map.get(key) {
        Some(Value::List(list)) => Some(list),
        _ => None,
    }
}

pub fn get_bool(map: &Compound, key: &str) -> Option<bool> {
    get_i64(map, key).map(|v| v != 0)
}

/// 读取 N 个浮点数组成的列表（坐标、旋转）
pub fn get_f64s<const N: usize>(map: &Compound, key: &str) -> Option<[f64; N]> {
    let list = get_list(map, key)?;
    if list.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, v) in out.iter_mut().zip(list) {
        *slot = as_f64(v)?;
    }
    Some(out)
}

pub fn get_byte_array(map: &Compound, key: &str) -> Option<Vec<i8>> {
    match map.get(key) {
        Some(Value::ByteArray(arr)) => Some(arr.to_vec()),
        _ => None,
    }
}

pub fn get_int_array(map: &Compound, key: &str) -> Option<Vec<i32>> {
    match map.get(key) {
        Some(Value::IntArray(arr)) => Some(arr.to_vec()),
        _ => None,
    }
}

pub fn get_long_array(map: &Compound, key: &str) -> Option<Vec<i64>> {
    match map.get(key) {
        Some(Value::LongArray(arr)) => Some(arr.to_vec()),
        _ => None,
    }
}

pub fn string(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

pub fn byte_array(data: Vec<i8>) -> Value {
    Value::ByteArray(ByteArray::new(data))
}

pub fn int_array(data: Vec<i32>) -> Value {
    Value::IntArray(IntArray::new(data))
}

pub fn long_array(data: Vec<i64>) -> Value {
    Value::LongArray(LongArray::new(data))
}

pub fn doubles(values: &[f64]) -> Value {
    Value::List(values.iter().map(|v| Value::Double(*v)).collect())
}

pub fn floats(values: &[f32]) -> Value {
    Value::List(values.iter().map(|v| Value::Float(*v)).collect())
}
