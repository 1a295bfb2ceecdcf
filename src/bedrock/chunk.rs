//! Bedrock 区块记录 ⇄ 区块模型

use anyhow::{Context, Result};
use fastnbt::Value;

use super::db::{
    actor_key, chunk_key, digp_key, subchunk_key, TAG_BLOCK_ENTITY, TAG_DATA_3D, TAG_FINALIZED_STATE,
    TAG_VERSION,
};
use super::subchunk::{decode_data3d, decode_subchunk, encode_data3d, encode_subchunk, BiomeStorage};
use crate::model::{
    Biome, BlockEntityModel, BlockState, ChunkModel, ChunkPos, ChunkStatus, Dimension, Edition,
    EntityModel, HeightmapCache, ItemStack, NativeTags, SectionModel, BIOME_CELLS, SECTION_VOLUME,
};
use crate::nbt::{self, Compound};
use crate::nbt_le;
use crate::schema::{Schema, SchemaId};

/// 已生成完毕的 FinalizedState
const FINALIZED_DONE: i32 = 2;
const DEFAULT_BIOME: i32 = 1;

const ENTITY_FIELDS: &[&str] = &["identifier", "Pos", "Rotation"];
const BLOCK_ENTITY_FIELDS: &[&str] = &["id", "x", "y", "z", "Items", "CustomName"];
const ITEM_FIELDS: &[&str] = &["Slot", "Name", "Count"];

/// 一个区块在 LevelDB 中的全部原始记录
#[derive(Debug, Default, Clone)]
pub struct ChunkRecords {
    pub finalized: Option<Vec<u8>>,
    pub data3d: Option<Vec<u8>>,
    pub subchunks: Vec<(i8, Vec<u8>)>,
    pub block_entities: Option<Vec<u8>>,
    /// 已按 LE NBT 解析的实体（actorprefix 与旧版 0x32 记录）
    pub entities: Vec<Compound>,
}

fn leftovers(map: &Compound, modelled: &[&str]) -> Compound {
    map.iter()
        .filter(|(k, _)| !modelled.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// 同一位置的实体每次转换都得到相同的 UniqueID
pub fn derived_unique_id(dimension: Dimension, pos: ChunkPos, index: usize) -> i64 {
    ((pos.x as i64 & 0xF_FFFF) << 36)
        | ((pos.z as i64 & 0xF_FFFF) << 16)
        | ((dimension.bedrock_id() as i64) << 12)
        | (index as i64 & 0xFFF)
}

// ============== 解码 ==============

fn decode_items(map: &Compound) -> Vec<ItemStack> {
    nbt::get_list(map, "Items")
        .unwrap_or_default()
        .iter()
        .filter_map(nbt::compound)
        .filter_map(|item| {
            let id = nbt::get_str(item, "Name")?.to_string();
            if id.is_empty() {
                return None;
            }
            Some(ItemStack {
                slot: nbt::get_i64(item, "Slot").unwrap_or(0) as i8,
                id,
                count: nbt::get_i32(item, "Count").unwrap_or(1),
                native: Some(NativeTags::new(Edition::Bedrock, leftovers(item, ITEM_FIELDS))),
            })
        })
        .collect()
}

fn decode_block_entity(map: &Compound) -> Option<BlockEntityModel> {
    Some(BlockEntityModel {
        id: nbt::get_str(map, "id")?.to_string(),
        x: nbt::get_i32(map, "x")?,
        y: nbt::get_i32(map, "y")?,
        z: nbt::get_i32(map, "z")?,
        custom_name: nbt::get_str(map, "CustomName").map(str::to_string),
        items: decode_items(map),
        native: Some(NativeTags::new(Edition::Bedrock, leftovers(map, BLOCK_ENTITY_FIELDS))),
    })
}

pub fn decode_entity(map: &Compound) -> Option<EntityModel> {
    let pos = nbt::get_f64s::<3>(map, "Pos")?;
    let rotation = nbt::get_f64s::<2>(map, "Rotation").unwrap_or([0.0; 2]);
    Some(EntityModel {
        id: nbt::get_str(map, "identifier")?.to_string(),
        pos,
        rotation: [rotation[0] as f32, rotation[1] as f32],
        custom_name: nbt::get_str(map, "CustomName").map(str::to_string),
        native: Some(NativeTags::new(Edition::Bedrock, leftovers(map, ENTITY_FIELDS))),
    })
}

/// 16³ 逐格生物群系取每个 4³ 单元的角点
fn section_biomes(storage: &BiomeStorage) -> (Vec<Biome>, Vec<u8>) {
    let (palette, indices) = storage;
    let mut cells = Vec::with_capacity(BIOME_CELLS);
    for cy in 0..4 {
        for cz in 0..4 {
            for cx in 0..4 {
                cells.push(indices[SectionModel::block_index(cx * 4, cy * 4, cz * 4)] as u8);
            }
        }
    }
    (palette.iter().map(|&id| Biome::Numeric(id)).collect(), cells)
}

fn decode_status(finalized: Option<&[u8]>) -> ChunkStatus {
    let value = finalized
        .filter(|raw| raw.len() >= 4)
        .map(|raw| i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
    match value {
        Some(FINALIZED_DONE) | None => ChunkStatus::Full,
        Some(other) => ChunkStatus::Partial(other.to_string()),
    }
}

pub fn decode_chunk(records: &ChunkRecords, dimension: Dimension, pos: ChunkPos, schema: SchemaId) -> ChunkModel {
    match try_decode_chunk(records, dimension, pos, schema) {
        Ok(chunk) => chunk,
        Err(e) => ChunkModel::corrupt(dimension, pos, schema, format!("{:#}", e)),
    }
}

fn try_decode_chunk(records: &ChunkRecords, dimension: Dimension, pos: ChunkPos, schema: SchemaId) -> Result<ChunkModel> {
    let plains = Biome::Numeric(DEFAULT_BIOME);
    let mut chunk = ChunkModel::new(dimension, pos, schema);
    chunk.status = decode_status(records.finalized.as_deref());

    for (y, data) in &records.subchunks {
        let (palette, indices) =
            decode_subchunk(data).with_context(|| format!("Sub-chunk {}", y))?;
        chunk.sections.push(SectionModel {
            y: *y as i32,
            palette,
            indices,
            biome_palette: vec![plains.clone()],
            biome_indices: vec![0; BIOME_CELLS],
            block_light: None,
            sky_light: None,
        });
    }
    chunk.fill_gaps(plains);

    if let Some(data) = &records.data3d {
        let (heights, storages) = decode_data3d(data).context("Data3D")?;
        let bottom = *dimension.section_range(Edition::Bedrock).start();
        for section in &mut chunk.sections {
            let Ok(index) = usize::try_from(section.y - bottom) else {
                continue;
            };
            if let Some(storage) = storages.get(index) {
                let (palette, cells) = section_biomes(storage);
                section.biome_palette = palette;
                section.biome_indices = cells;
                section.compact();
            }
        }
        chunk.heightmaps = Some(HeightmapCache::Bedrock(heights));
        chunk.derived_stale = false;
    }

    if let Some(data) = &records.block_entities {
        chunk.block_entities = nbt_le::read_all(data)
            .context("Block entities")?
            .iter()
            .filter_map(decode_block_entity)
            .collect();
    }
    chunk.entities = records.entities.iter().filter_map(decode_entity).collect();
    Ok(chunk)
}

// ============== 编码 ==============

fn numeric_storage(section: &SectionModel) -> BiomeStorage {
    let palette: Vec<i32> = section
        .biome_palette
        .iter()
        .map(|b| match b {
            Biome::Numeric(id) => *id,
            Biome::Named(_) => DEFAULT_BIOME,
        })
        .collect();
    let mut indices = vec![0u16; SECTION_VOLUME];
    for y in 0..16 {
        for z in 0..16 {
            for x in 0..16 {
                let cell = ((y / 4) * 4 + z / 4) * 4 + x / 4;
                indices[SectionModel::block_index(x, y, z)] = section.biome_indices[cell] as u16;
            }
        }
    }
    (palette, indices)
}

/// 维度内每个 section 一份存储；缺失的 section 沿用下方的存储
fn biome_storages(chunk: &ChunkModel) -> Vec<BiomeStorage> {
    let default: BiomeStorage = match chunk.sections.first() {
        Some(section) => numeric_storage(section),
        None => (vec![DEFAULT_BIOME], vec![0; SECTION_VOLUME]),
    };
    let mut storages = Vec::new();
    let mut previous = default;
    for y in chunk.dimension.section_range(Edition::Bedrock) {
        if let Some(section) = chunk.section(y) {
            previous = numeric_storage(section);
        }
        storages.push(previous.clone());
    }
    storages
}

fn heights(chunk: &ChunkModel) -> Vec<i16> {
    match (&chunk.heightmaps, chunk.derived_stale) {
        (Some(HeightmapCache::Bedrock(h)), false) => h.clone(),
        _ => {
            let floor = chunk.dimension.min_y();
            chunk
                .surface_heights(|b: &BlockState| !b.is_air())
                .into_iter()
                .map(|h| (h - floor) as i16)
                .collect()
        }
    }
}

fn encode_items(items: &[ItemStack]) -> Value {
    Value::List(
        items
            .iter()
            .map(|item| {
                let mut map = NativeTags::for_edition(&item.native, Edition::Bedrock)
                    .cloned()
                    .unwrap_or_else(|| {
                        let mut fresh = Compound::new();
                        fresh.insert("Damage".to_string(), Value::Short(0));
                        fresh.insert("WasPickedUp".to_string(), Value::Byte(0));
                        fresh
                    });
                map.insert("Slot".to_string(), Value::Byte(item.slot));
                map.insert("Name".to_string(), nbt::string(&item.id));
                map.insert("Count".to_string(), Value::Byte(item.count.clamp(0, 127) as i8));
                Value::Compound(map)
            })
            .collect(),
    )
}

fn encode_block_entity(be: &BlockEntityModel) -> Compound {
    let mut map = NativeTags::for_edition(&be.native, Edition::Bedrock)
        .cloned()
        .unwrap_or_default();
    map.insert("id".to_string(), nbt::string(&be.id));
    map.insert("x".to_string(), Value::Int(be.x));
    map.insert("y".to_string(), Value::Int(be.y));
    map.insert("z".to_string(), Value::Int(be.z));
    map.entry("isMovable".to_string()).or_insert(Value::Byte(1));
    if let Some(name) = &be.custom_name {
        map.insert("CustomName".to_string(), nbt::string(name));
    }
    if !be.items.is_empty() {
        map.insert("Items".to_string(), encode_items(&be.items));
    }
    map
}

pub fn encode_entity(entity: &EntityModel, unique_id: i64) -> Compound {
    let mut map = NativeTags::for_edition(&entity.native, Edition::Bedrock)
        .cloned()
        .unwrap_or_else(|| {
            let mut fresh = Compound::new();
            fresh.insert("Motion".to_string(), nbt::floats(&[0.0, 0.0, 0.0]));
            fresh.insert("OnGround".to_string(), Value::Byte(1));
            fresh.insert("Persistent".to_string(), Value::Byte(1));
            fresh
        });
    map.insert("identifier".to_string(), nbt::string(&entity.id));
    let pos = [entity.pos[0] as f32, entity.pos[1] as f32, entity.pos[2] as f32];
    map.insert("Pos".to_string(), nbt::floats(&pos));
    map.insert("Rotation".to_string(), nbt::floats(&entity.rotation));
    map.entry("UniqueID".to_string()).or_insert(Value::Long(unique_id));
    if let Some(name) = &entity.custom_name {
        map.insert("CustomName".to_string(), nbt::string(name));
    }
    map
}

/// 生成区块的全部 LevelDB 记录，按键排序
pub fn encode_chunk(chunk: &ChunkModel, schema: &Schema) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let (pos, dim) = (chunk.pos, chunk.dimension);
    let mut records = Vec::new();

    records.push((chunk_key(pos, dim, TAG_VERSION), vec![schema.flags.chunk_version]));

    let finalized = match &chunk.status {
        ChunkStatus::Partial(raw) => raw.parse().unwrap_or(1),
        _ => FINALIZED_DONE,
    };
    records.push((chunk_key(pos, dim, TAG_FINALIZED_STATE), finalized.to_le_bytes().to_vec()));

    records.push((
        chunk_key(pos, dim, TAG_DATA_3D),
        encode_data3d(&heights(chunk), &biome_storages(chunk))?,
    ));

    for section in chunk.sections.iter().filter(|s| !s.is_all_air()) {
        let y = section.y as i8;
        records.push((
            subchunk_key(pos, dim, y),
            encode_subchunk(y, &section.palette, &section.indices, schema.flags.block_version)?,
        ));
    }

    if !chunk.block_entities.is_empty() {
        let mut data = Vec::new();
        for be in &chunk.block_entities {
            nbt_le::write_root(&mut data, &encode_block_entity(be))?;
        }
        records.push((chunk_key(pos, dim, TAG_BLOCK_ENTITY), data));
    }

    if !chunk.entities.is_empty() {
        let mut digest = Vec::with_capacity(chunk.entities.len() * 8);
        for (i, entity) in chunk.entities.iter().enumerate() {
            let map = encode_entity(entity, derived_unique_id(dim, pos, i));
            let unique_id = nbt::get_i64(&map, "UniqueID").unwrap_or_else(|| derived_unique_id(dim, pos, i));
            digest.extend_from_slice(&unique_id.to_le_bytes());
            records.push((actor_key(unique_id), nbt_le::to_bytes(&map)?));
        }
        records.push((digp_key(pos, dim), digest));
    }

    records.sort();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::db::parse_chunk_key;
    use crate::schema::SchemaRegistry;

    fn schema() -> &'static Schema {
        SchemaRegistry::global().latest(Edition::Bedrock)
    }

    fn records_of(encoded: Vec<(Vec<u8>, Vec<u8>)>) -> ChunkRecords {
        let mut records = ChunkRecords::default();
        for (key, value) in encoded {
            if let Some(parsed) = parse_chunk_key(&key) {
                match parsed.tag {
                    TAG_FINALIZED_STATE => records.finalized = Some(value),
                    TAG_DATA_3D => records.data3d = Some(value),
                    TAG_BLOCK_ENTITY => records.block_entities = Some(value),
                    _ => {
                        if let Some(y) = parsed.subchunk {
                            records.subchunks.push((y, value));
                        }
                    }
                }
            } else if key.starts_with(b"actorprefix") {
                records.entities.push(nbt_le::from_bytes(&value).unwrap());
            }
        }
        records
    }

    #[test]
    fn encoded_chunk_reads_back() {
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(5, -9), schema().id);
        let mut section = SectionModel::filled(-4, BlockState::air(), Biome::Numeric(1));
        section.set_block(3, 0, 7, BlockState::new("minecraft:bedrock"));
        section.biome_palette.push(Biome::Numeric(2));
        section.biome_indices[63] = 1;
        chunk.sections.push(section);
        chunk.sections.push(SectionModel::filled(-3, BlockState::air(), Biome::Numeric(1)));
        let mut top = SectionModel::filled(-2, BlockState::air(), Biome::Numeric(1));
        top.set_block(0, 15, 0, BlockState::new("minecraft:stone"));
        chunk.sections.push(top);
        chunk.entities.push(EntityModel {
            id: "minecraft:cow".to_string(),
            pos: [80.5, -20.0, -140.5],
            rotation: [0.0, 0.0],
            custom_name: Some("Bessie".to_string()),
            native: None,
        });

        let records = records_of(encode_chunk(&chunk, schema()).unwrap());
        assert_eq!(records.subchunks.len(), 2);
        let decoded = decode_chunk(&records, Dimension::Overworld, chunk.pos, schema().id);

        assert_eq!(decoded.status, ChunkStatus::Full);
        assert_eq!(decoded.sections.len(), 3);
        assert_eq!(decoded.sections[0].block(3, 0, 7).name, "minecraft:bedrock");
        assert_eq!(decoded.sections[0].biome(3, 3, 3), &Biome::Numeric(2));
        assert_eq!(decoded.sections[0].biome(0, 0, 0), &Biome::Numeric(1));
        assert!(decoded.sections[1].is_all_air());
        assert_eq!(decoded.sections[2].block(0, 15, 0).name, "minecraft:stone");
        assert_eq!(decoded.entities.len(), 1);
        assert_eq!(decoded.entities[0].custom_name.as_deref(), Some("Bessie"));
        assert!(!decoded.derived_stale);
    }

    #[test]
    fn stale_heights_are_recomputed() {
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(0, 0), schema().id);
        let mut section = SectionModel::filled(0, BlockState::air(), Biome::Numeric(1));
        section.set_block(0, 4, 0, BlockState::new("minecraft:stone"));
        chunk.sections.push(section);
        chunk.heightmaps = Some(HeightmapCache::Bedrock(vec![99; 256]));
        chunk.derived_stale = true;
        let h = heights(&chunk);
        // y=4 的方块顶面在 y=5，相对 -64 为 69
        assert_eq!(h[0], 69);
        assert_eq!(h[1], 0);
    }

    #[test]
    fn unique_ids_are_stable_and_distinct() {
        let a = derived_unique_id(Dimension::Overworld, ChunkPos::new(-1, 2), 0);
        let b = derived_unique_id(Dimension::Overworld, ChunkPos::new(-1, 2), 1);
        let c = derived_unique_id(Dimension::Nether, ChunkPos::new(-1, 2), 0);
        assert_eq!(a, derived_unique_id(Dimension::Overworld, ChunkPos::new(-1, 2), 0));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn broken_subchunk_marks_chunk_corrupt() {
        let records = ChunkRecords {
            subchunks: vec![(0, vec![9, 1, 0, 8, 1, 2])],
            ..ChunkRecords::default()
        };
        let chunk = decode_chunk(&records, Dimension::Overworld, ChunkPos::new(0, 0), schema().id);
        assert!(chunk.is_corrupt());
    }
}
