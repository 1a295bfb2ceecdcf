//! 通用世界模型：两种存档格式之间的中间表示

use fastnbt::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{ConvertError, Result};
use crate::format::ChunkSource;
use crate::schema::SchemaId;

/// 每个 section 的方块数（16×16×16）
pub const SECTION_VOLUME: usize = 4096;
/// 每个 section 的生物群系格数（4×4×4）
pub const BIOME_CELLS: usize = 64;
/// 每个 region 的区块数（32×32）
pub const REGION_CHUNKS: usize = 1024;

// ============== 版本与维度 ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Edition {
    Java,
    Bedrock,
}

impl Edition {
    pub fn as_str(self) -> &'static str {
        match self {
            Edition::Java => "java",
            Edition::Bedrock => "bedrock",
        }
    }

    /// 解析平台名（"java" / "bedrock"）
    pub fn parse_platform(platform: &str) -> Result<Self> {
        match platform.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Edition::Java),
            "bedrock" => Ok(Edition::Bedrock),
            _ => Err(ConvertError::InvalidPlatform(platform.to_string())),
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Java => f.write_str("Java"),
            Edition::Bedrock => f.write_str("Bedrock"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::End];

    /// Java 存档中的维度目录（主世界为根目录）
    pub fn java_dir(self) -> &'static str {
        match self {
            Dimension::Overworld => "",
            Dimension::Nether => "DIM-1",
            Dimension::End => "DIM1",
        }
    }

    pub fn java_name(self) -> &'static str {
        match self {
            Dimension::Overworld => "minecraft:overworld",
            Dimension::Nether => "minecraft:the_nether",
            Dimension::End => "minecraft:the_end",
        }
    }

    pub fn from_java_name(name: &str) -> Option<Self> {
        Dimension::ALL.into_iter().find(|d| d.java_name() == name)
    }

    pub fn bedrock_id(self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => 1,
            Dimension::End => 2,
        }
    }

    pub fn from_bedrock_id(id: i32) -> Option<Self> {
        Dimension::ALL.into_iter().find(|d| d.bedrock_id() == id)
    }

    /// 有效的 section 纵向索引范围；下界 Java 为 y 0..256，基岩版为 y 0..128
    pub fn section_range(self, edition: Edition) -> RangeInclusive<i32> {
        match (self, edition) {
            (Dimension::Overworld, _) => -4..=19,
            (Dimension::Nether, Edition::Java) => 0..=15,
            (Dimension::Nether, Edition::Bedrock) => 0..=7,
            (Dimension::End, _) => 0..=15,
        }
    }

    /// 两个版本的底部一致
    pub fn min_y(self) -> i32 {
        *self.section_range(Edition::Java).start() * 16
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Overworld => "overworld",
            Dimension::Nether => "nether",
            Dimension::End => "end",
        })
    }
}

// ============== 坐标 ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn region(self) -> RegionPos {
        RegionPos {
            x: self.x >> 5,
            z: self.z >> 5,
        }
    }

    /// 在 region 偏移表中的下标
    pub fn local_index(self) -> usize {
        ((self.x & 31) + (self.z & 31) * 32) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn chunk_at(self, local_index: usize) -> ChunkPos {
        ChunkPos {
            x: self.x * 32 + (local_index % 32) as i32,
            z: self.z * 32 + (local_index / 32) as i32,
        }
    }
}

/// 一个 region 的引用：只记录存在的区块坐标，区块内容按需加载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRef {
    pub dimension: Dimension,
    pub pos: RegionPos,
    pub chunks: Vec<ChunkPos>,
}

/// 把区块坐标按 (维度, region) 分组，结果有序
pub fn group_regions(chunks: impl IntoIterator<Item = (Dimension, ChunkPos)>) -> Vec<RegionRef> {
    let mut grouped: BTreeMap<(Dimension, RegionPos), Vec<ChunkPos>> = BTreeMap::new();
    for (dimension, pos) in chunks {
        grouped.entry((dimension, pos.region())).or_default().push(pos);
    }
    grouped
        .into_iter()
        .map(|((dimension, pos), mut chunks)| {
            chunks.sort_by_key(|c| c.local_index());
            chunks.dedup();
            RegionRef {
                dimension,
                pos,
                chunks,
            }
        })
        .collect()
}

// ============== 方块与生物群系 ==============

/// 方块属性值：Java 全为字符串，Bedrock 的 states 有字符串、整数和字节
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropValue {
    Str(String),
    Int(i32),
    Byte(i8),
}

impl PropValue {
    /// 以文本形式比较和转换
    pub fn as_text(&self) -> String {
        match self {
            PropValue::Str(s) => s.clone(),
            PropValue::Int(v) => v.to_string(),
            PropValue::Byte(v) => v.to_string(),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// 方块状态：命名空间 ID + 属性表
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, PropValue>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        Self::new("minecraft:air")
    }

    pub fn with(mut self, key: &str, value: PropValue) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn with_str(self, key: &str, value: &str) -> Self {
        self.with(key, PropValue::Str(value.to_string()))
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    pub fn is_liquid(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:water" | "minecraft:lava" | "minecraft:flowing_water" | "minecraft:flowing_lava"
        )
    }

    pub fn is_leaves(&self) -> bool {
        self.name.ends_with("_leaves")
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", props.join(","))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    /// Java：命名空间字符串
    Named(String),
    /// Bedrock：数字 ID
    Numeric(i32),
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Biome::Named(name) => f.write_str(name),
            Biome::Numeric(id) => write!(f, "#{}", id),
        }
    }
}

// ============== Section ==============

/// 16 格高的区块切片
///
/// 方块下标顺序为 YZX：`y * 256 + z * 16 + x`；
/// 生物群系为 4×4×4，下标 `(y * 4 + z) * 4 + x`。
#[derive(Debug, Clone, PartialEq)]
pub struct SectionModel {
    pub y: i32,
    pub palette: Vec<BlockState>,
    pub indices: Vec<u16>,
    pub biome_palette: Vec<Biome>,
    pub biome_indices: Vec<u8>,
    pub block_light: Option<Vec<i8>>,
    pub sky_light: Option<Vec<i8>>,
}

impl SectionModel {
    /// 整个 section 填充同一种方块
    pub fn filled(y: i32, state: BlockState, biome: Biome) -> Self {
        Self {
            y,
            palette: vec![state],
            indices: vec![0; SECTION_VOLUME],
            biome_palette: vec![biome],
            biome_indices: vec![0; BIOME_CELLS],
            block_light: None,
            sky_light: None,
        }
    }

    pub fn block_index(x: usize, y: usize, z: usize) -> usize {
        y * 256 + z * 16 + x
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> &BlockState {
        &self.palette[self.indices[Self::block_index(x, y, z)] as usize]
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: BlockState) {
        let idx = match self.palette.iter().position(|p| *p == state) {
            Some(i) => i,
            None => {
                self.palette.push(state);
                self.palette.len() - 1
            }
        };
        self.indices[Self::block_index(x, y, z)] = idx as u16;
    }

    pub fn biome(&self, x: usize, y: usize, z: usize) -> &Biome {
        &self.biome_palette[self.biome_indices[(y * 4 + z) * 4 + x] as usize]
    }

    /// 所有下标都落在调色板内
    pub fn is_valid(&self) -> bool {
        self.indices.len() == SECTION_VOLUME
            && self.biome_indices.len() == BIOME_CELLS
            && !self.palette.is_empty()
            && !self.biome_palette.is_empty()
            && self.indices.iter().all(|&i| (i as usize) < self.palette.len())
            && self
                .biome_indices
                .iter()
                .all(|&i| (i as usize) < self.biome_palette.len())
    }

    pub fn is_all_air(&self) -> bool {
        self.indices
            .iter()
            .all(|&i| self.palette[i as usize].is_air())
    }

    /// 合并重复的调色板项并移除未使用的项，保持首次出现顺序
    pub fn compact(&mut self) {
        let (palette, indices) = compact_palette(&self.palette, &self.indices, |i| i as u16);
        self.palette = palette;
        self.indices = indices;
        let (biomes, biome_indices) =
            compact_palette(&self.biome_palette, &self.biome_indices, |i| i as u8);
        self.biome_palette = biomes;
        self.biome_indices = biome_indices;
    }
}

/// 新调色板不会比旧的长，`narrow` 不会截断
fn compact_palette<T, I>(palette: &[T], indices: &[I], narrow: fn(usize) -> I) -> (Vec<T>, Vec<I>)
where
    T: Clone + PartialEq,
    I: Copy + Into<usize>,
{
    let mut new_palette: Vec<T> = Vec::new();
    let mut remap: Vec<Option<usize>> = vec![None; palette.len()];
    let mut new_indices = Vec::with_capacity(indices.len());
    for &old in indices {
        let old: usize = old.into();
        let new = match remap[old] {
            Some(n) => n,
            None => {
                let entry = &palette[old];
                let n = match new_palette.iter().position(|p| p == entry) {
                    Some(n) => n,
                    None => {
                        new_palette.push(entry.clone());
                        new_palette.len() - 1
                    }
                };
                remap[old] = Some(n);
                n
            }
        };
        new_indices.push(narrow(new));
    }
    if new_palette.is_empty() {
        return (palette.to_vec(), indices.to_vec());
    }
    (new_palette, new_indices)
}

// ============== 实体 ==============

/// 只在同版本族输出时保留的原生字段
#[derive(Debug, Clone, PartialEq)]
pub struct NativeTags {
    pub edition: Edition,
    pub tags: HashMap<String, Value>,
}

impl NativeTags {
    pub fn new(edition: Edition, tags: HashMap<String, Value>) -> Self {
        Self { edition, tags }
    }

    /// 只有版本族一致时才返回
    pub fn for_edition(native: &Option<NativeTags>, edition: Edition) -> Option<&HashMap<String, Value>> {
        native
            .as_ref()
            .filter(|n| n.edition == edition)
            .map(|n| &n.tags)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub slot: i8,
    pub id: String,
    pub count: i32,
    pub native: Option<NativeTags>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityModel {
    pub id: String,
    pub pos: [f64; 3],
    pub rotation: [f32; 2],
    pub custom_name: Option<String>,
    pub native: Option<NativeTags>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntityModel {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub custom_name: Option<String>,
    pub items: Vec<ItemStack>,
    pub native: Option<NativeTags>,
}

// ============== 区块 ==============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Full,
    /// 未完全生成，保存原始状态值
    Partial(String),
    /// 数据损坏或截断，附带原因
    Corrupt(String),
}

/// 缓存的派生数据（高度图），按版本族保存原始形式
#[derive(Debug, Clone, PartialEq)]
pub enum HeightmapCache {
    Java(HashMap<String, Value>),
    Bedrock(Vec<i16>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkModel {
    pub dimension: Dimension,
    pub pos: ChunkPos,
    /// 区块内标识符所属的 schema
    pub schema: SchemaId,
    pub status: ChunkStatus,
    /// 纵向连续，按 y 升序
    pub sections: Vec<SectionModel>,
    pub entities: Vec<EntityModel>,
    pub block_entities: Vec<BlockEntityModel>,
    pub heightmaps: Option<HeightmapCache>,
    /// 派生数据（高度图、光照）需要重新计算
    pub derived_stale: bool,
    pub native: Option<NativeTags>,
}

impl ChunkModel {
    pub fn new(dimension: Dimension, pos: ChunkPos, schema: SchemaId) -> Self {
        Self {
            dimension,
            pos,
            schema,
            status: ChunkStatus::Full,
            sections: Vec::new(),
            entities: Vec::new(),
            block_entities: Vec::new(),
            heightmaps: None,
            derived_stale: true,
            native: None,
        }
    }

    pub fn corrupt(dimension: Dimension, pos: ChunkPos, schema: SchemaId, reason: impl Into<String>) -> Self {
        Self {
            status: ChunkStatus::Corrupt(reason.into()),
            ..Self::new(dimension, pos, schema)
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.status, ChunkStatus::Corrupt(_))
    }

    pub fn is_contiguous(&self) -> bool {
        self.sections.windows(2).all(|w| w[1].y == w[0].y + 1)
    }

    pub fn section(&self, y: i32) -> Option<&SectionModel> {
        let first = self.sections.first()?.y;
        self.sections.get(usize::try_from(y - first).ok()?)
    }

    /// 按 y 排序并用空气补齐中间缺失的 section
    pub fn fill_gaps(&mut self, biome: Biome) {
        self.sections.sort_by_key(|s| s.y);
        self.sections.dedup_by_key(|s| s.y);
        let mut filled: Vec<SectionModel> = Vec::with_capacity(self.sections.len());
        for section in self.sections.drain(..) {
            if let Some(prev) = filled.last() {
                for y in prev.y + 1..section.y {
                    filled.push(SectionModel::filled(y, BlockState::air(), biome.clone()));
                }
            }
            filled.push(section);
        }
        self.sections = filled;
    }

    /// 每列最高非空气方块之上的世界 y（下标 `z * 16 + x`），空列为维度底部
    pub fn surface_heights<F>(&self, solid: F) -> Vec<i32>
    where
        F: Fn(&BlockState) -> bool,
    {
        let floor = self.dimension.min_y();
        let mut heights = vec![floor; 256];
        for z in 0..16 {
            for x in 0..16 {
                'column: for section in self.sections.iter().rev() {
                    for y in (0..16).rev() {
                        if solid(section.block(x, y, z)) {
                            heights[z * 16 + x] = section.y * 16 + y as i32 + 1;
                            break 'column;
                        }
                    }
                }
            }
        }
        heights
    }
}

// ============== 世界 ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameRuleValue {
    Bool(bool),
    Int(i32),
}

impl fmt::Display for GameRuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameRuleValue::Bool(b) => write!(f, "{}", b),
            GameRuleValue::Int(v) => write!(f, "{}", v),
        }
    }
}

/// 与平台无关的存档元数据；游戏规则以 Java 驼峰名为键
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMetadata {
    pub level_name: String,
    pub seed: i64,
    pub spawn: [i32; 3],
    pub game_type: i32,
    pub game_rules: BTreeMap<String, GameRuleValue>,
    /// 游戏刻
    pub time: i64,
    /// Unix 毫秒
    pub last_played: i64,
    pub native: Option<NativeTags>,
}

impl Default for WorldMetadata {
    fn default() -> Self {
        Self {
            level_name: "world".to_string(),
            seed: 0,
            spawn: [0, 64, 0],
            game_type: 0,
            game_rules: BTreeMap::new(),
            time: 0,
            last_played: 0,
            native: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub dimension: Dimension,
    /// 脚底位置（Java 约定）
    pub pos: [f64; 3],
    pub rotation: [f32; 2],
    pub native: Option<NativeTags>,
}

/// 一次转换使用的世界模型，区块按 region 懒加载
pub struct WorldModel {
    pub edition: Edition,
    pub schema: SchemaId,
    pub metadata: WorldMetadata,
    pub player: Option<PlayerData>,
    pub regions: Vec<RegionRef>,
    pub(crate) source: ChunkSource,
}

impl WorldModel {
    pub(crate) fn new(
        edition: Edition,
        schema: SchemaId,
        metadata: WorldMetadata,
        player: Option<PlayerData>,
        regions: Vec<RegionRef>,
        source: ChunkSource,
    ) -> Self {
        Self {
            edition,
            schema,
            metadata,
            player,
            regions,
            source,
        }
    }

    /// 由内存中的区块构造世界（测试与夹具使用）
    pub fn in_memory(
        schema: SchemaId,
        metadata: WorldMetadata,
        player: Option<PlayerData>,
        chunks: Vec<ChunkModel>,
    ) -> Self {
        let regions = group_regions(chunks.iter().map(|c| (c.dimension, c.pos)));
        let source = ChunkSource::memory(chunks);
        Self::new(schema.edition, schema, metadata, player, regions, source)
    }

    pub fn chunk_count(&self) -> usize {
        self.regions.iter().map(|r| r.chunks.len()).sum()
    }

    /// 物化一个 region 的全部区块；损坏的区块以 `Corrupt` 状态返回
    pub fn load_region(&mut self, region: &RegionRef) -> Result<Vec<ChunkModel>> {
        self.source.load_region(region, self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_math_handles_negative_chunks() {
        let pos = ChunkPos::new(-1, -33);
        assert_eq!(pos.region(), RegionPos { x: -1, z: -2 });
        assert_eq!(pos.local_index(), 31 + 31 * 32);
        assert_eq!(pos.region().chunk_at(pos.local_index()), pos);
    }

    #[test]
    fn compact_merges_duplicates_and_drops_unused() {
        let mut section = SectionModel::filled(0, BlockState::air(), Biome::Named("minecraft:plains".into()));
        section.palette.push(BlockState::new("minecraft:stone"));
        section.palette.push(BlockState::new("minecraft:dirt"));
        section.palette.push(BlockState::new("minecraft:stone"));
        section.indices[5] = 3;
        section.compact();
        assert_eq!(section.palette, vec![BlockState::air(), BlockState::new("minecraft:stone")]);
        assert_eq!(section.indices[5], 1);
        assert!(section.is_valid());
    }

    #[test]
    fn fill_gaps_keeps_sections_contiguous() {
        let schema = crate::schema::SchemaRegistry::global().latest(Edition::Java).id;
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(0, 0), schema);
        let plains = Biome::Named("minecraft:plains".into());
        chunk.sections.push(SectionModel::filled(3, BlockState::new("minecraft:stone"), plains.clone()));
        chunk.sections.push(SectionModel::filled(0, BlockState::new("minecraft:dirt"), plains.clone()));
        chunk.fill_gaps(plains);
        assert!(chunk.is_contiguous());
        assert_eq!(chunk.sections.len(), 4);
        assert!(chunk.sections[1].is_all_air());
    }

    #[test]
    fn surface_heights_find_topmost_block() {
        let schema = crate::schema::SchemaRegistry::global().latest(Edition::Java).id;
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(0, 0), schema);
        let plains = Biome::Named("minecraft:plains".into());
        let mut section = SectionModel::filled(0, BlockState::air(), plains);
        section.set_block(2, 5, 3, BlockState::new("minecraft:stone"));
        chunk.sections.push(section);
        let heights = chunk.surface_heights(|b| !b.is_air());
        assert_eq!(heights[3 * 16 + 2], 6);
        assert_eq!(heights[0], -64);
    }
}
