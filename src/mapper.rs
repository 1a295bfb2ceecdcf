//! 按映射链改写区块与存档元数据中的标识符
//!
//! 区块在写出前逐个经过 `map_chunk`；每个不同的方块状态只计算一次。

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::config::MappingConfig;
use crate::error::Result;
use crate::model::{Biome, BlockState, ChunkModel, ChunkStatus, Edition, WorldModel};
use crate::progress::ProgressSink;
use crate::schema::cross::GAME_RULES;
use crate::schema::{MappingChain, Schema, SchemaId, SchemaRegistry};

/// 映射过程中的软性计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStats {
    /// 使用回退方块的不同方块 ID 数
    pub unmapped_blocks: usize,
    pub unmapped_biomes: usize,
    pub dropped_entities: usize,
    pub dropped_block_entities: usize,
    pub dropped_sections: usize,
}

pub struct BlockMapper {
    chain: MappingChain,
    target: &'static Schema,
    config: MappingConfig,
    blocks: HashMap<BlockState, BlockState>,
    biomes: HashMap<Biome, Biome>,
    reported: HashSet<String>,
    stats: MapStats,
}

/// Java 生成阶段中早于地物装饰的状态
const EARLY_JAVA_STATUS: &[&str] = &[
    "empty",
    "structure_starts",
    "structure_references",
    "biomes",
    "noise",
    "surface",
    "carvers",
];

/// 未完成状态在两个版本族之间的近似对应
fn translate_status(raw: &str, to: Edition) -> String {
    match to {
        Edition::Bedrock if EARLY_JAVA_STATUS.contains(&raw) => "0".to_string(),
        Edition::Bedrock => "1".to_string(),
        Edition::Java if raw == "0" => "empty".to_string(),
        Edition::Java => "features".to_string(),
    }
}

impl BlockMapper {
    pub fn new(source: SchemaId, target: &'static Schema, config: &MappingConfig) -> Result<Self> {
        let chain = SchemaRegistry::global().block_state_map(source, target.id)?;
        Ok(Self {
            chain,
            target,
            config: config.clone(),
            blocks: HashMap::new(),
            biomes: HashMap::new(),
            reported: HashSet::new(),
            stats: MapStats::default(),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.chain.is_identity()
    }

    pub fn crosses_edition(&self) -> bool {
        self.chain.crosses_edition()
    }

    pub fn stats(&self) -> &MapStats {
        &self.stats
    }

    fn fallback_block(&self) -> BlockState {
        match self.target.edition() {
            Edition::Java => BlockState::new(self.config.java_fallback_block.as_str()),
            Edition::Bedrock => BlockState::new(self.config.bedrock_fallback_block.as_str()),
        }
    }

    fn fallback_biome(&self) -> Biome {
        match self.target.edition() {
            Edition::Java => Biome::Named(self.config.java_fallback_biome.clone()),
            Edition::Bedrock => Biome::Numeric(self.config.bedrock_fallback_biome),
        }
    }

    /// 每个 (种类, ID) 只提示一次；返回是否第一次出现
    fn first_report(&mut self, kind: &str, id: &str) -> bool {
        self.reported.insert(format!("{}:{}", kind, id))
    }

    fn block(&mut self, state: &BlockState, log: &mut dyn ProgressSink) -> BlockState {
        if let Some(hit) = self.blocks.get(state) {
            return hit.clone();
        }
        let target = self.target;
        let mapped = self
            .chain
            .map_block(state)
            .filter(|s| target.knows_block(&s.name));
        let out = match mapped {
            Some(s) => s,
            None => {
                let fallback = self.fallback_block();
                if self.first_report("block", &state.name) {
                    self.stats.unmapped_blocks += 1;
                    let line = format!(
                        "No mapping for block {} in {}; substituting {}",
                        state.name, target.id, fallback.name
                    );
                    warn!("{}", line);
                    log.line(&line);
                }
                fallback
            }
        };
        self.blocks.insert(state.clone(), out.clone());
        out
    }

    fn biome(&mut self, biome: &Biome, log: &mut dyn ProgressSink) -> Biome {
        if let Some(hit) = self.biomes.get(biome) {
            return hit.clone();
        }
        let out = match self.chain.map_biome(biome) {
            Some(b) => b,
            None => {
                let fallback = self.fallback_biome();
                if self.first_report("biome", &biome.to_string()) {
                    self.stats.unmapped_biomes += 1;
                    let line = format!("No mapping for biome {}; substituting {}", biome, fallback);
                    warn!("{}", line);
                    log.line(&line);
                }
                fallback
            }
        };
        self.biomes.insert(biome.clone(), out.clone());
        out
    }

    /// 改写一个区块的全部标识符；同一 schema 时只替换目标不认识的方块
    pub fn map_chunk(&mut self, mut chunk: ChunkModel, log: &mut dyn ProgressSink) -> ChunkModel {
        if chunk.is_corrupt() {
            return chunk;
        }
        let identity = self.chain.is_identity();
        let crossing = self.chain.crosses_edition();

        if !identity {
            let range = chunk.dimension.section_range(self.target.edition());
            let before = chunk.sections.len();
            chunk.sections.retain(|s| range.contains(&s.y));
            let dropped = before - chunk.sections.len();
            if dropped > 0 {
                self.stats.dropped_sections += dropped;
                debug!(
                    "Discarded {} section(s) of chunk ({}, {}) outside {}",
                    dropped, chunk.pos.x, chunk.pos.z, chunk.dimension
                );
            }
        }

        for section in &mut chunk.sections {
            let palette = std::mem::take(&mut section.palette);
            section.palette = palette.iter().map(|s| self.block(s, &mut *log)).collect();
            if !identity {
                let biomes = std::mem::take(&mut section.biome_palette);
                section.biome_palette = biomes.iter().map(|b| self.biome(b, &mut *log)).collect();
            }
            section.compact();
        }
        if identity {
            // 世界内混有旧 DataVersion 区块时，统一归到目标 schema
            chunk.schema = self.target.id;
            return chunk;
        }

        let entities = std::mem::take(&mut chunk.entities);
        for mut entity in entities {
            match self.chain.map_entity(&entity.id) {
                Some(id) => {
                    entity.id = id;
                    if crossing {
                        entity.native = None;
                    }
                    chunk.entities.push(entity);
                }
                None => {
                    self.stats.dropped_entities += 1;
                    if self.first_report("entity", &entity.id) {
                        warn!("Entity type {} has no counterpart in {}; dropped", entity.id, self.target.id);
                    }
                }
            }
        }

        let range = chunk.dimension.section_range(self.target.edition());
        let block_entities = std::mem::take(&mut chunk.block_entities);
        for mut be in block_entities {
            let mapped = self
                .chain
                .map_block_entity(&be.id)
                .filter(|_| range.contains(&(be.y >> 4)));
            match mapped {
                Some(id) => {
                    be.id = id;
                    for item in &mut be.items {
                        item.id = self.chain.map_item(&item.id);
                        if crossing {
                            item.native = None;
                        }
                    }
                    if crossing {
                        be.native = None;
                    }
                    chunk.block_entities.push(be);
                }
                None => {
                    self.stats.dropped_block_entities += 1;
                    if self.first_report("block_entity", &be.id) {
                        warn!("Block entity {} cannot be written to {}; dropped", be.id, self.target.id);
                    }
                }
            }
        }

        if crossing {
            if let ChunkStatus::Partial(raw) = &chunk.status {
                chunk.status = ChunkStatus::Partial(translate_status(raw, self.target.edition()));
            }
            chunk.native = None;
            chunk.heightmaps = None;
        }
        chunk.schema = self.target.id;
        chunk.derived_stale = true;
        chunk
    }

    /// 改写存档级数据：跨版本族时只保留双方都有的游戏规则，丢弃原生标签
    pub fn map_metadata(&self, world: &mut WorldModel) {
        if !self.chain.crosses_edition() {
            return;
        }
        let metadata = &mut world.metadata;
        metadata.native = None;
        let before = metadata.game_rules.len();
        metadata.game_rules.retain(|name, _| GAME_RULES.contains(&name.as_str()));
        if metadata.game_rules.len() < before {
            debug!("Dropped {} game rule(s) unknown to {}", before - metadata.game_rules.len(), self.target.id);
        }
        if let Some(player) = &mut world.player {
            player.native = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChunkPos, Dimension, EntityModel, SectionModel};

    fn java_chunk(x: i32, blocks: &[&str]) -> ChunkModel {
        let java = SchemaRegistry::global().latest(Edition::Java).id;
        let mut chunk = ChunkModel::new(Dimension::Overworld, ChunkPos::new(x, 0), java);
        let mut section = SectionModel::filled(0, BlockState::air(), Biome::Named("minecraft:plains".into()));
        for (i, name) in blocks.iter().enumerate() {
            section.set_block(i, 0, 0, BlockState::new(*name));
        }
        chunk.sections.push(section);
        chunk
    }

    fn to_bedrock() -> BlockMapper {
        let registry = SchemaRegistry::global();
        BlockMapper::new(
            registry.latest(Edition::Java).id,
            registry.latest(Edition::Bedrock),
            &MappingConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn unknown_block_is_reported_once() {
        let mut mapper = to_bedrock();
        let mut lines = Vec::new();
        let mut sink = |line: &str| lines.push(line.to_string());
        for x in 0..3 {
            let chunk = java_chunk(x, &["examplemod:gizmo", "minecraft:stone", "examplemod:gizmo"]);
            let mapped = mapper.map_chunk(chunk, &mut sink);
            let names: Vec<&str> = mapped.sections[0].palette.iter().map(|s| s.name.as_str()).collect();
            assert!(!names.contains(&"examplemod:gizmo"));
            assert!(names.contains(&"minecraft:stone"));
        }
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("examplemod:gizmo"));
        assert_eq!(mapper.stats().unmapped_blocks, 1);
    }

    #[test]
    fn mapped_chunk_belongs_to_target() {
        let mut mapper = to_bedrock();
        let mut chunk = java_chunk(0, &["minecraft:stone"]);
        chunk.sections.push(SectionModel::filled(
            20,
            BlockState::new("minecraft:stone"),
            Biome::Named("minecraft:plains".into()),
        ));
        chunk.entities.push(EntityModel {
            id: "minecraft:marker".into(),
            pos: [0.5, 1.0, 0.5],
            rotation: [0.0, 0.0],
            custom_name: None,
            native: None,
        });
        chunk.entities.push(EntityModel {
            id: "minecraft:zombified_piglin".into(),
            pos: [1.5, 1.0, 1.5],
            rotation: [0.0, 0.0],
            custom_name: Some("Bob".into()),
            native: None,
        });

        let mapped = mapper.map_chunk(chunk, &mut |_: &str| {});
        assert_eq!(mapped.schema, SchemaRegistry::global().latest(Edition::Bedrock).id);
        assert!(mapped.derived_stale);
        assert_eq!(mapped.sections.len(), 1);
        assert_eq!(mapped.entities.len(), 1);
        assert_eq!(mapped.entities[0].id, "minecraft:zombie_pigman");
        assert_eq!(mapped.entities[0].custom_name.as_deref(), Some("Bob"));
        assert!(matches!(mapped.sections[0].biome_palette[0], Biome::Numeric(1)));

        let stats = mapper.stats();
        assert_eq!(stats.dropped_sections, 1);
        assert_eq!(stats.dropped_entities, 1);
    }

    #[test]
    fn identity_only_replaces_unknown_blocks() {
        let java = SchemaRegistry::global().latest(Edition::Java);
        let mut mapper = BlockMapper::new(java.id, java, &MappingConfig::default()).unwrap();
        assert!(mapper.is_identity());
        let mut chunk = java_chunk(0, &["examplemod:gizmo"]);
        chunk.derived_stale = false;
        let mapped = mapper.map_chunk(chunk, &mut |_: &str| {});
        assert!(!mapped.derived_stale);
        assert!(mapped.sections[0]
            .palette
            .iter()
            .all(|s| java.knows_block(&s.name)));
    }

    #[test]
    fn nether_height_follows_target_edition() {
        let registry = SchemaRegistry::global();
        let old = registry.resolve("1.20.1", Edition::Java).unwrap().id;
        let nether = || {
            let mut chunk = ChunkModel::new(Dimension::Nether, ChunkPos::new(0, 0), old);
            for y in Dimension::Nether.section_range(Edition::Java) {
                chunk.sections.push(SectionModel::filled(
                    y,
                    BlockState::new("minecraft:netherrack"),
                    Biome::Named("minecraft:nether_wastes".into()),
                ));
            }
            chunk
        };

        let java = registry.latest(Edition::Java);
        let mut upgrade = BlockMapper::new(old, java, &MappingConfig::default()).unwrap();
        let mapped = upgrade.map_chunk(nether(), &mut |_: &str| {});
        assert_eq!(mapped.sections.len(), 16);
        assert_eq!(upgrade.stats().dropped_sections, 0);

        let bedrock = registry.latest(Edition::Bedrock);
        let mut cross = BlockMapper::new(old, bedrock, &MappingConfig::default()).unwrap();
        let mapped = cross.map_chunk(nether(), &mut |_: &str| {});
        assert_eq!(mapped.sections.len(), 8);
        assert_eq!(cross.stats().dropped_sections, 8);
    }

    #[test]
    fn partial_status_translates_across_editions() {
        assert_eq!(translate_status("noise", Edition::Bedrock), "0");
        assert_eq!(translate_status("features", Edition::Bedrock), "1");
        assert_eq!(translate_status("0", Edition::Java), "empty");
        assert_eq!(translate_status("1", Edition::Java), "features");
    }
}
