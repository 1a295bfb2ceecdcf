//! Java 区块 NBT ⇄ 区块模型

use anyhow::{bail, Result};
use fastnbt::Value;
use std::collections::BTreeMap;

use crate::model::{
    Biome, BlockEntityModel, BlockState, ChunkModel, ChunkPos, ChunkStatus, Dimension, Edition,
    EntityModel, HeightmapCache, ItemStack, NativeTags, PropValue, SectionModel, BIOME_CELLS,
    SECTION_VOLUME,
};
use crate::nbt::{self, Compound};
use crate::schema::{Schema, SchemaRegistry};

/// 区块根标签中由模型接管的字段，其余原样保留为原生字段
const MODELLED_FIELDS: &[&str] = &[
    "DataVersion",
    "xPos",
    "yPos",
    "zPos",
    "Status",
    "sections",
    "block_entities",
    "Heightmaps",
];

const ENTITY_FIELDS: &[&str] = &["id", "Pos", "Rotation"];
const BLOCK_ENTITY_FIELDS: &[&str] = &["id", "x", "y", "z", "Items"];
const ITEM_FIELDS: &[&str] = &["Slot", "id", "count", "Count"];

// ============== 紧凑整数数组 ==============

/// ceil(log2(len))，单元素调色板为 0
pub fn bits_for(len: usize) -> u32 {
    if len <= 1 {
        0
    } else {
        usize::BITS - (len - 1).leading_zeros()
    }
}

/// 方块调色板下标宽度，至少 4 位
pub fn block_bits(palette_len: usize) -> u32 {
    bits_for(palette_len).max(4)
}

/// 解包不跨 long 的定宽整数；长度不足时返回 None
pub fn unpack(data: &[i64], bits: u32, count: usize) -> Option<Vec<u16>> {
    if bits == 0 {
        return Some(vec![0; count]);
    }
    let per_long = (64 / bits) as usize;
    if data.len() < count.div_ceil(per_long) {
        return None;
    }
    let mask = (1u64 << bits) - 1;
    Some(
        (0..count)
            .map(|i| {
                let word = data[i / per_long] as u64;
                ((word >> ((i % per_long) as u32 * bits)) & mask) as u16
            })
            .collect(),
    )
}

pub fn pack(values: &[u16], bits: u32) -> Vec<i64> {
    if bits == 0 {
        return Vec::new();
    }
    let per_long = (64 / bits) as usize;
    let mask = (1u64 << bits) - 1;
    let mut out = vec![0i64; values.len().div_ceil(per_long)];
    for (i, &v) in values.iter().enumerate() {
        let shift = (i % per_long) as u32 * bits;
        out[i / per_long] = (out[i / per_long] as u64 | ((v as u64 & mask) << shift)) as i64;
    }
    out
}

// ============== 文本组件 ==============

/// 把 JSON 文本组件还原为纯文本；不是 JSON 时原样返回
pub fn text_from_component(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(obj)) => match obj.get("text") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}

pub fn component_from_text(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

/// 同一位置的实体每次转换都得到相同的 UUID
pub fn derived_uuid(dimension: Dimension, pos: ChunkPos, index: usize) -> [i32; 4] {
    [
        0x6d63_6376,
        (dimension.bedrock_id() << 24) | (index as i32 & 0x00ff_ffff),
        pos.x,
        pos.z,
    ]
}

// ============== 解码 ==============

fn leftovers(map: &Compound, modelled: &[&str]) -> Compound {
    map.iter()
        .filter(|(k, _)| !modelled.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn decode_block_state(value: &Value) -> Result<BlockState> {
    let Some(map) = nbt::compound(value) else {
        bail!("Palette entry is not a compound");
    };
    let Some(name) = nbt::get_str(map, "Name") else {
        bail!("Palette entry without Name");
    };
    let mut properties = BTreeMap::new();
    if let Some(props) = nbt::get_compound(map, "Properties") {
        for (k, v) in props {
            if let Value::String(s) = v {
                properties.insert(k.clone(), PropValue::Str(s.clone()));
            }
        }
    }
    Ok(BlockState {
        name: name.to_string(),
        properties,
    })
}

fn decode_section(map: &Compound) -> Result<Option<SectionModel>> {
    let Some(y) = nbt::get_i32(map, "Y") else {
        bail!("Section without Y");
    };
    // 只有光照的边界 section
    let Some(states) = nbt::get_compound(map, "block_states") else {
        return Ok(None);
    };

    let palette = nbt::get_list(states, "palette")
        .unwrap_or_default()
        .iter()
        .map(decode_block_state)
        .collect::<Result<Vec<_>>>()?;
    if palette.is_empty() {
        bail!("Section {} has an empty block palette", y);
    }
    let indices = match nbt::get_long_array(states, "data") {
        Some(data) if palette.len() > 1 => unpack(&data, block_bits(palette.len()), SECTION_VOLUME),
        _ => Some(vec![0; SECTION_VOLUME]),
    };
    let Some(indices) = indices else {
        bail!("Section {} block data is truncated", y);
    };

    let (biome_palette, biome_indices) = match nbt::get_compound(map, "biomes") {
        Some(biomes) => {
            let palette: Vec<Biome> = nbt::get_list(biomes, "palette")
                .unwrap_or_default()
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(Biome::Named(s.clone())),
                    _ => None,
                })
                .collect();
            let indices = match nbt::get_long_array(biomes, "data") {
                Some(data) if palette.len() > 1 => unpack(&data, bits_for(palette.len()), BIOME_CELLS),
                _ => Some(vec![0; BIOME_CELLS]),
            };
            let Some(indices) = indices else {
                bail!("Section {} biome data is truncated", y);
            };
            (palette, indices.into_iter().map(|i| i as u8).collect())
        }
        None => (Vec::new(), vec![0; BIOME_CELLS]),
    };
    let biome_palette = if biome_palette.is_empty() {
        vec![Biome::Named("minecraft:plains".to_string())]
    } else {
        biome_palette
    };

    let section = SectionModel {
        y,
        palette,
        indices,
        biome_palette,
        biome_indices,
        block_light: nbt::get_byte_array(map, "BlockLight"),
        sky_light: nbt::get_byte_array(map, "SkyLight"),
    };
    if !section.is_valid() {
        bail!("Section {} has palette indices out of range", y);
    }
    Ok(Some(section))
}

fn decode_items(map: &Compound) -> Vec<ItemStack> {
    nbt::get_list(map, "Items")
        .unwrap_or_default()
        .iter()
        .filter_map(nbt::compound)
        .filter_map(|item| {
            let id = nbt::get_str(item, "id")?.to_string();
            let count = nbt::get_i32(item, "count")
                .or_else(|| nbt::get_i32(item, "Count"))
                .unwrap_or(1);
            Some(ItemStack {
                slot: nbt::get_i64(item, "Slot").unwrap_or(0) as i8,
                id,
                count,
                native: Some(NativeTags::new(
                    Edition::Java,
                    leftovers(item, ITEM_FIELDS),
                )),
            })
        })
        .collect()
}

pub fn decode_block_entity(map: &Compound) -> Option<BlockEntityModel> {
    Some(BlockEntityModel {
        id: nbt::get_str(map, "id")?.to_string(),
        x: nbt::get_i32(map, "x")?,
        y: nbt::get_i32(map, "y")?,
        z: nbt::get_i32(map, "z")?,
        custom_name: nbt::get_str(map, "CustomName").map(text_from_component),
        items: decode_items(map),
        native: Some(NativeTags::new(
            Edition::Java,
            leftovers(map, BLOCK_ENTITY_FIELDS),
        )),
    })
}

pub fn decode_entity(map: &Compound) -> Option<EntityModel> {
    let pos = nbt::get_f64s::<3>(map, "Pos")?;
    let rotation = nbt::get_f64s::<2>(map, "Rotation").unwrap_or([0.0; 2]);
    Some(EntityModel {
        id: nbt::get_str(map, "id")?.to_string(),
        pos,
        rotation: [rotation[0] as f32, rotation[1] as f32],
        custom_name: nbt::get_str(map, "CustomName").map(text_from_component),
        native: Some(NativeTags::new(
            Edition::Java,
            leftovers(map, ENTITY_FIELDS),
        )),
    })
}

/// 解析实体区域文件中的一个区块 `{DataVersion, Position, Entities}`
pub fn decode_entity_chunk(value: &Value) -> Vec<EntityModel> {
    nbt::compound(value)
        .and_then(|map| nbt::get_list(map, "Entities"))
        .unwrap_or_default()
        .iter()
        .filter_map(nbt::compound)
        .filter_map(decode_entity)
        .collect()
}

/// 解析区块根标签；结构损坏时返回 `Corrupt` 状态的区块而不是错误
pub fn decode_chunk(value: &Value, dimension: Dimension, pos: ChunkPos, fallback: &Schema) -> ChunkModel {
    match try_decode_chunk(value, dimension, pos) {
        Ok(chunk) => chunk,
        Err(e) => ChunkModel::corrupt(dimension, pos, fallback.id, format!("{:#}", e)),
    }
}

fn try_decode_chunk(value: &Value, dimension: Dimension, pos: ChunkPos) -> Result<ChunkModel> {
    let Some(map) = nbt::compound(value) else {
        bail!("Chunk root is not a compound");
    };
    let Some(data_version) = nbt::get_i32(map, "DataVersion") else {
        bail!("Chunk has no DataVersion");
    };
    let schema = match SchemaRegistry::global().detect_java(data_version) {
        Ok(schema) => schema,
        Err(_) => bail!("Pre-1.18 chunk layout (DataVersion {})", data_version),
    };
    if map.contains_key("Level") {
        bail!("Pre-1.18 chunk layout");
    }

    let status = match nbt::get_str(map, "Status") {
        Some(raw) => {
            let bare = raw.strip_prefix("minecraft:").unwrap_or(raw);
            if bare == "full" {
                ChunkStatus::Full
            } else {
                ChunkStatus::Partial(bare.to_string())
            }
        }
        None => ChunkStatus::Partial("empty".to_string()),
    };

    let mut sections = Vec::new();
    for section in nbt::get_list(map, "sections").unwrap_or_default() {
        let Some(section) = nbt::compound(section) else {
            bail!("Section is not a compound");
        };
        if let Some(section) = decode_section(section)? {
            sections.push(section);
        }
    }

    let block_entities = nbt::get_list(map, "block_entities")
        .unwrap_or_default()
        .iter()
        .filter_map(nbt::compound)
        .filter_map(decode_block_entity)
        .collect();

    let heightmaps = nbt::get_compound(map, "Heightmaps").map(|h| HeightmapCache::Java(h.clone()));

    let mut chunk = ChunkModel::new(dimension, pos, schema.id);
    chunk.status = status;
    chunk.sections = sections;
    chunk.block_entities = block_entities;
    chunk.derived_stale = heightmaps.is_none();
    chunk.heightmaps = heightmaps;
    chunk.native = Some(NativeTags::new(
        Edition::Java,
        leftovers(map, MODELLED_FIELDS),
    ));
    chunk.fill_gaps(Biome::Named("minecraft:plains".to_string()));
    Ok(chunk)
}

// ============== 编码 ==============

fn encode_block_state(state: &BlockState) -> Value {
    let mut map = Compound::new();
    map.insert("Name".to_string(), nbt::string(&state.name));
    if !state.properties.is_empty() {
        let props = state
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), nbt::string(v.as_text())))
            .collect();
        map.insert("Properties".to_string(), Value::Compound(props));
    }
    Value::Compound(map)
}

fn encode_section(section: &SectionModel, keep_light: bool) -> Value {
    let mut states = Compound::new();
    states.insert(
        "palette".to_string(),
        Value::List(section.palette.iter().map(encode_block_state).collect()),
    );
    if section.palette.len() > 1 {
        states.insert(
            "data".to_string(),
            nbt::long_array(pack(&section.indices, block_bits(section.palette.len()))),
        );
    }

    let mut biomes = Compound::new();
    biomes.insert(
        "palette".to_string(),
        Value::List(
            section
                .biome_palette
                .iter()
                .map(|b| nbt::string(b.to_string()))
                .collect(),
        ),
    );
    if section.biome_palette.len() > 1 {
        let indices: Vec<u16> = section.biome_indices.iter().map(|&i| i as u16).collect();
        biomes.insert(
            "data".to_string(),
            nbt::long_array(pack(&indices, bits_for(section.biome_palette.len()))),
        );
    }

    let mut map = Compound::new();
    map.insert("Y".to_string(), Value::Byte(section.y as i8));
    map.insert("block_states".to_string(), Value::Compound(states));
    map.insert("biomes".to_string(), Value::Compound(biomes));
    if keep_light {
        if let Some(light) = &section.block_light {
            map.insert("BlockLight".to_string(), nbt::byte_array(light.clone()));
        }
        if let Some(light) = &section.sky_light {
            map.insert("SkyLight".to_string(), nbt::byte_array(light.clone()));
        }
    }
    Value::Compound(map)
}

fn encode_items(items: &[ItemStack], schema: &Schema) -> Value {
    Value::List(
        items
            .iter()
            .map(|item| {
                let mut map = NativeTags::for_edition(&item.native, Edition::Java)
                    .cloned()
                    .unwrap_or_default();
                map.insert("Slot".to_string(), Value::Byte(item.slot));
                map.insert("id".to_string(), nbt::string(&item.id));
                if schema.flags.int_item_count {
                    map.insert("count".to_string(), Value::Int(item.count));
                } else {
                    map.insert("Count".to_string(), Value::Byte(item.count.clamp(0, 127) as i8));
                }
                Value::Compound(map)
            })
            .collect(),
    )
}

pub fn encode_block_entity(be: &BlockEntityModel, schema: &Schema) -> Value {
    let mut map = NativeTags::for_edition(&be.native, Edition::Java)
        .cloned()
        .unwrap_or_default();
    map.insert("id".to_string(), nbt::string(&be.id));
    map.insert("x".to_string(), Value::Int(be.x));
    map.insert("y".to_string(), Value::Int(be.y));
    map.insert("z".to_string(), Value::Int(be.z));
    map.insert("keepPacked".to_string(), Value::Byte(0));
    if let Some(name) = &be.custom_name {
        map.entry("CustomName".to_string())
            .or_insert_with(|| nbt::string(component_from_text(name)));
    }
    if !be.items.is_empty() {
        map.insert("Items".to_string(), encode_items(&be.items, schema));
    }
    Value::Compound(map)
}

pub fn encode_entity(entity: &EntityModel, uuid: [i32; 4]) -> Value {
    let mut map = NativeTags::for_edition(&entity.native, Edition::Java)
        .cloned()
        .unwrap_or_default();
    map.insert("id".to_string(), nbt::string(&entity.id));
    map.insert("Pos".to_string(), nbt::doubles(&entity.pos));
    map.insert("Rotation".to_string(), nbt::floats(&entity.rotation));
    map.entry("UUID".to_string())
        .or_insert_with(|| nbt::int_array(uuid.to_vec()));
    map.entry("Motion".to_string())
        .or_insert_with(|| nbt::doubles(&[0.0, 0.0, 0.0]));
    map.entry("OnGround".to_string()).or_insert(Value::Byte(1));
    if let Some(name) = &entity.custom_name {
        map.entry("CustomName".to_string())
            .or_insert_with(|| nbt::string(component_from_text(name)));
    }
    Value::Compound(map)
}

/// 实体区域文件中的区块
pub fn encode_entity_chunk(chunk: &ChunkModel, schema: &Schema) -> Value {
    let entities = chunk
        .entities
        .iter()
        .enumerate()
        .map(|(i, e)| encode_entity(e, derived_uuid(chunk.dimension, chunk.pos, i)))
        .collect();
    let mut map = Compound::new();
    map.insert("DataVersion".to_string(), Value::Int(schema.data_version));
    map.insert("Position".to_string(), nbt::int_array(vec![chunk.pos.x, chunk.pos.z]));
    map.insert("Entities".to_string(), Value::List(entities));
    Value::Compound(map)
}

/// 按列最高方块重新计算高度图
fn compute_heightmaps(chunk: &ChunkModel) -> Compound {
    let floor = chunk.dimension.min_y();
    let height = chunk.dimension.section_range(Edition::Java).count() as i32 * 16;
    let bits = bits_for(height as usize + 1);
    let encode = |heights: Vec<i32>| {
        let values: Vec<u16> = heights.into_iter().map(|h| (h - floor) as u16).collect();
        nbt::long_array(pack(&values, bits))
    };

    let surface = chunk.surface_heights(|b| !b.is_air());
    let motion = chunk.surface_heights(|b| !b.is_air() && !b.name.ends_with("grass") && !b.name.contains("flower"));
    let no_leaves = chunk.surface_heights(|b| !b.is_air() && !b.is_leaves());

    let mut map = Compound::new();
    map.insert("WORLD_SURFACE".to_string(), encode(surface));
    map.insert("MOTION_BLOCKING".to_string(), encode(motion));
    map.insert("MOTION_BLOCKING_NO_LEAVES".to_string(), encode(no_leaves));
    map.insert(
        "OCEAN_FLOOR".to_string(),
        encode(chunk.surface_heights(|b| !b.is_air() && !b.is_liquid())),
    );
    map
}

/// 生成区块根标签；同版本族时以原生字段为底
pub fn encode_chunk(chunk: &ChunkModel, schema: &Schema) -> Value {
    let mut map = NativeTags::for_edition(&chunk.native, Edition::Java)
        .cloned()
        .unwrap_or_default();

    let status = match &chunk.status {
        ChunkStatus::Partial(raw) => raw.clone(),
        _ => "full".to_string(),
    };
    let status = if schema.flags.namespaced_status {
        format!("minecraft:{}", status)
    } else {
        status
    };
    let min_section = chunk
        .sections
        .first()
        .map(|s| s.y)
        .unwrap_or(*chunk.dimension.section_range(Edition::Java).start());

    map.insert("DataVersion".to_string(), Value::Int(schema.data_version));
    map.insert("xPos".to_string(), Value::Int(chunk.pos.x));
    map.insert("zPos".to_string(), Value::Int(chunk.pos.z));
    map.insert("yPos".to_string(), Value::Int(min_section));
    map.insert("Status".to_string(), nbt::string(status));

    let keep_light = !chunk.derived_stale;
    map.insert(
        "sections".to_string(),
        Value::List(chunk.sections.iter().map(|s| encode_section(s, keep_light)).collect()),
    );
    map.insert(
        "block_entities".to_string(),
        Value::List(
            chunk
                .block_entities
                .iter()
                .map(|be| encode_block_entity(be, schema))
                .collect(),
        ),
    );

    let heightmaps = match (&chunk.heightmaps, chunk.derived_stale) {
        (Some(HeightmapCache::Java(h)), false) => h.clone(),
        _ => compute_heightmaps(chunk),
    };
    map.insert("Heightmaps".to_string(), Value::Compound(heightmaps));

    if chunk.derived_stale {
        map.insert("isLightOn".to_string(), Value::Byte(0));
    }
    for (key, default) in [
        ("InhabitedTime", Value::Long(0)),
        ("LastUpdate", Value::Long(0)),
    ] {
        map.entry(key.to_string()).or_insert(default);
    }
    for key in ["block_ticks", "fluid_ticks", "PostProcessing"] {
        map.entry(key.to_string()).or_insert_with(|| Value::List(Vec::new()));
    }
    Value::Compound(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edition;

    fn schema() -> &'static Schema {
        SchemaRegistry::global().latest(Edition::Java)
    }

    #[test]
    fn entries_never_span_longs() {
        let values: Vec<u16> = (0..4096).map(|i| (i % 17) as u16).collect();
        let packed = pack(&values, 5);
        // 每个 long 12 个 5 位值
        assert_eq!(packed.len(), 4096usize.div_ceil(12));
        assert_eq!(unpack(&packed, 5, 4096), Some(values));
        assert_eq!(unpack(&packed[..10], 5, 4096), None);
    }

    #[test]
    fn bit_widths() {
        assert_eq!(bits_for(1), 0);
        assert_eq!(bits_for(2), 1);
        assert_eq!(bits_for(17), 5);
        assert_eq!(block_bits(2), 4);
        assert_eq!(bits_for(385), 9);
    }

    #[test]
    fn text_components() {
        assert_eq!(text_from_component(r#"{"text":"Box"}"#), "Box");
        assert_eq!(text_from_component(r#""Box""#), "Box");
        assert_eq!(text_from_component("plain"), "plain");
        assert_eq!(component_from_text("Box"), r#"{"text":"Box"}"#);
    }

    #[test]
    fn encoded_chunk_decodes_to_the_same_blocks() {
        let plains = Biome::Named("minecraft:plains".into());
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(3, -2), schema().id);
        let mut section = SectionModel::filled(-4, BlockState::air(), plains.clone());
        section.set_block(1, 2, 3, BlockState::new("minecraft:oak_log").with_str("axis", "x"));
        section.set_block(4, 0, 0, BlockState::new("minecraft:stone"));
        chunk.sections.push(section);
        chunk.sections.push(SectionModel::filled(-3, BlockState::new("minecraft:dirt"), plains));

        let value = encode_chunk(&chunk, schema());
        let decoded = decode_chunk(&value, Dimension::Overworld, chunk.pos, schema());
        assert_eq!(decoded.status, ChunkStatus::Full);
        assert_eq!(decoded.sections.len(), 2);
        assert_eq!(
            decoded.sections[0].block(1, 2, 3),
            &BlockState::new("minecraft:oak_log").with_str("axis", "x")
        );
        assert_eq!(decoded.sections[1].block(9, 9, 9).name, "minecraft:dirt");
        assert!(!decoded.derived_stale);
    }

    #[test]
    fn old_layout_is_corrupt() {
        let mut map = Compound::new();
        map.insert("DataVersion".into(), Value::Int(1343));
        let chunk = decode_chunk(&Value::Compound(map), Dimension::Overworld, ChunkPos::new(0, 0), schema());
        assert!(chunk.is_corrupt());
    }

    #[test]
    fn out_of_range_palette_index_is_corrupt() {
        let plains = Biome::Named("minecraft:plains".into());
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(0, 0), schema().id);
        let mut section = SectionModel::filled(0, BlockState::air(), plains);
        section.set_block(0, 0, 0, BlockState::new("minecraft:stone"));
        chunk.sections.push(section);
        let mut value = encode_chunk(&chunk, schema());

        // 调色板只有两项，data 却引用第 15 项
        let Value::Compound(root) = &mut value else { panic!() };
        let Some(Value::List(sections)) = root.get_mut("sections") else { panic!() };
        let Some(Value::Compound(sec)) = sections.get_mut(0) else { panic!() };
        let Some(Value::Compound(states)) = sec.get_mut("block_states") else { panic!() };
        states.insert("data".into(), nbt::long_array(pack(&[15u16; 4096], 4)));

        let decoded = decode_chunk(&value, Dimension::Overworld, ChunkPos::new(0, 0), schema());
        assert!(decoded.is_corrupt());
    }
}
