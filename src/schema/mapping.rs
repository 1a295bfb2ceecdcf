//! 映射链：沿 schema 图逐步转换标识符

use std::collections::BTreeMap;

use super::cross::{self, PropRule};
use super::tables::{
    BEDROCK_BIOMES_INTRODUCED, BLOCKS_INTRODUCED, BLOCK_RULES, BLOCK_SUBSTITUTES,
    ENTITIES_INTRODUCED, JAVA_BIOMES_INTRODUCED,
};
use super::{SchemaId, SchemaRegistry};
use crate::model::{Biome, BlockState, Edition, PropValue};

/// 图上的一条边
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 升级到 `at` 版本
    Upgrade { edition: Edition, at: &'static str },
    /// 从 `from` 版本降到前一个版本
    Downgrade { edition: Edition, from: &'static str },
    JavaToBedrock,
    BedrockToJava,
}

impl Step {
    pub(crate) fn between(registry: &SchemaRegistry, a: SchemaId, b: SchemaId) -> Step {
        match (a.edition, b.edition) {
            (Edition::Java, Edition::Bedrock) => Step::JavaToBedrock,
            (Edition::Bedrock, Edition::Java) => Step::BedrockToJava,
            (edition, _) if b.index > a.index => Step::Upgrade {
                edition,
                at: registry.get(b).name,
            },
            (edition, _) => Step::Downgrade {
                edition,
                from: registry.get(a).name,
            },
        }
    }
}

/// 从源 schema 到目标 schema 的映射函数
#[derive(Debug, Clone)]
pub struct MappingChain {
    pub source: SchemaId,
    pub target: SchemaId,
    steps: Vec<Step>,
}

impl MappingChain {
    pub fn new(source: SchemaId, target: SchemaId, steps: Vec<Step>) -> Self {
        Self {
            source,
            target,
            steps,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn crosses_edition(&self) -> bool {
        self.source.edition != self.target.edition
    }

    /// 逐步映射方块状态；任何一步无法映射都返回 None
    pub fn map_block(&self, state: &BlockState) -> Option<BlockState> {
        let mut state = state.clone();
        for step in &self.steps {
            state = match *step {
                Step::Upgrade { edition, at } => upgrade_block(edition, at, state),
                Step::Downgrade { edition, from } => downgrade_block(edition, from, state)?,
                Step::JavaToBedrock => block_to_bedrock(&state)?,
                Step::BedrockToJava => block_to_java(&state)?,
            };
        }
        Some(state)
    }

    pub fn map_biome(&self, biome: &Biome) -> Option<Biome> {
        let mut biome = biome.clone();
        for step in &self.steps {
            biome = match (*step, biome) {
                (Step::Upgrade { .. }, b) => b,
                (Step::Downgrade { edition: Edition::Java, from }, Biome::Named(name)) => {
                    let sub = JAVA_BIOMES_INTRODUCED
                        .iter()
                        .find(|(n, at, _)| *n == name && *at == from);
                    Biome::Named(sub.map(|(_, _, to)| to.to_string()).unwrap_or(name))
                }
                (Step::Downgrade { edition: Edition::Bedrock, from }, Biome::Numeric(id)) => {
                    let sub = BEDROCK_BIOMES_INTRODUCED
                        .iter()
                        .find(|(n, at, _)| *n == id && *at == from);
                    Biome::Numeric(sub.map(|(_, _, to)| *to).unwrap_or(id))
                }
                (Step::JavaToBedrock, Biome::Named(name)) => cross::CROSS_BIOMES
                    .iter()
                    .chain(cross::JAVA_ONLY_BIOMES)
                    .find(|(n, _)| *n == name)
                    .map(|(_, id)| Biome::Numeric(*id))?,
                (Step::BedrockToJava, Biome::Numeric(id)) => cross::CROSS_BIOMES
                    .iter()
                    .find(|(_, i)| *i == id)
                    .map(|(n, _)| Biome::Named(n.to_string()))?,
                _ => return None,
            };
        }
        Some(biome)
    }

    pub fn map_entity(&self, id: &str) -> Option<String> {
        let mut id = id.to_string();
        for step in &self.steps {
            id = match *step {
                Step::Upgrade { .. } => id,
                Step::Downgrade { edition, from } => {
                    if introduced_at(ENTITIES_INTRODUCED, edition, &id) == Some(from) {
                        return None;
                    }
                    id
                }
                Step::JavaToBedrock => {
                    if cross::JAVA_ONLY_ENTITIES.contains(&id.as_str()) {
                        return None;
                    }
                    match cross::CROSS_ENTITIES.iter().find(|(j, _)| *j == id) {
                        Some((_, b)) => b.to_string(),
                        None if is_vanilla(&id) => id,
                        None => return None,
                    }
                }
                Step::BedrockToJava => {
                    if cross::BEDROCK_ONLY_ENTITIES.contains(&id.as_str()) {
                        return None;
                    }
                    match cross::CROSS_ENTITIES.iter().find(|(_, b)| *b == id) {
                        Some((j, _)) => j.to_string(),
                        None if is_vanilla(&id) => id,
                        None => return None,
                    }
                }
            };
        }
        Some(id)
    }

    pub fn map_block_entity(&self, id: &str) -> Option<String> {
        let mut id = id.to_string();
        for step in &self.steps {
            id = match *step {
                Step::Upgrade { .. } => id,
                Step::Downgrade { edition, from } => {
                    let java_id = match edition {
                        Edition::Java => Some(id.as_str()),
                        Edition::Bedrock => cross::block_entity_java_id(&id),
                    };
                    if java_id.and_then(|j| introduced_at(BLOCKS_INTRODUCED, edition, j)) == Some(from) {
                        return None;
                    }
                    id
                }
                Step::JavaToBedrock => cross::CROSS_BLOCK_ENTITIES
                    .iter()
                    .find(|(j, _)| *j == id)
                    .map(|(_, b)| b.to_string())?,
                Step::BedrockToJava => cross::block_entity_java_id(&id)?.to_string(),
            };
        }
        Some(id)
    }

    /// 物品 ID 原样携带，只处理方块物品的改名
    pub fn map_item(&self, id: &str) -> String {
        let mut id = id.to_string();
        for step in &self.steps {
            match step {
                Step::JavaToBedrock => {
                    if let Some(c) = cross::find_block_from_java(&id) {
                        id = c.bedrock.to_string();
                    }
                }
                Step::BedrockToJava => {
                    if let Some(c) = cross::find_block_from_bedrock(&id) {
                        id = c.java.to_string();
                    }
                }
                _ => {}
            }
        }
        id
    }
}

const NO_RULES: &[PropRule] = &[];

fn is_vanilla(name: &str) -> bool {
    name.starts_with("minecraft:")
}

fn introduced_at(
    table: &'static [super::tables::Introduced],
    edition: Edition,
    name: &str,
) -> Option<&'static str> {
    table
        .iter()
        .find(|i| i.name == name)
        .map(|i| i.version(edition))
}

fn upgrade_block(edition: Edition, at: &str, mut state: BlockState) -> BlockState {
    let rule = BLOCK_RULES.iter().find(|r| {
        r.edition == edition
            && r.at == at
            && r.from == state.name
            && r.when.iter().all(|(k, v)| {
                state
                    .properties
                    .get(*k)
                    .map(|p| p.as_text() == *v)
                    .unwrap_or(false)
            })
    });
    if let Some(rule) = rule {
        state.name = rule.to.to_string();
        for (k, _) in rule.when {
            state.properties.remove(*k);
        }
    }
    state
}

fn downgrade_block(edition: Edition, from: &str, mut state: BlockState) -> Option<BlockState> {
    if introduced_at(BLOCKS_INTRODUCED, edition, &state.name) == Some(from) {
        let sub = BLOCK_SUBSTITUTES.iter().find(|s| s.from == state.name)?;
        state.name = sub.to.to_string();
    }
    let rule = BLOCK_RULES
        .iter()
        .find(|r| r.edition == edition && r.at == from && r.to == state.name);
    if let Some(rule) = rule {
        state.name = rule.from.to_string();
        for (k, v) in rule.when {
            state
                .properties
                .insert(k.to_string(), PropValue::Str(v.to_string()));
        }
    }
    Some(state)
}

/// Java 字符串属性按内容猜测 Bedrock 类型
fn guess_bedrock_value(text: &str) -> PropValue {
    match text {
        "true" => PropValue::Byte(1),
        "false" => PropValue::Byte(0),
        _ => match text.parse::<i32>() {
            Ok(v) => PropValue::Int(v),
            Err(_) => PropValue::Str(text.to_string()),
        },
    }
}

fn java_text(value: &PropValue) -> String {
    match value {
        PropValue::Byte(0) => "false".to_string(),
        PropValue::Byte(_) => "true".to_string(),
        other => other.as_text(),
    }
}

fn block_to_bedrock(state: &BlockState) -> Option<BlockState> {
    if let Some((_, alias)) = cross::JAVA_ONLY_BLOCKS.iter().find(|(j, _)| *j == state.name) {
        return Some(BlockState::new(*alias));
    }
    let (name, rules): (&str, &[PropRule]) = match cross::find_block_from_java(&state.name) {
        Some(entry) => (entry.bedrock, entry.props),
        None if is_vanilla(&state.name) => (state.name.as_str(), NO_RULES),
        None => return None,
    };

    let mut properties = BTreeMap::new();
    for (key, value) in &state.properties {
        let text = value.as_text();
        let rule = rules.iter().find(|r| match r {
            PropRule::Rename { java, .. }
            | PropRule::IntRename { java, .. }
            | PropRule::BoolByte { java, .. }
            | PropRule::JavaOnly { java, .. } => java == key,
            PropRule::BedrockOnly { .. } => false,
        });
        match rule {
            Some(PropRule::Rename { bedrock, .. }) => {
                properties.insert(bedrock.to_string(), PropValue::Str(text));
            }
            Some(PropRule::IntRename { bedrock, .. }) => {
                properties.insert(bedrock.to_string(), PropValue::Int(text.parse().unwrap_or(0)));
            }
            Some(PropRule::BoolByte { bedrock, .. }) => {
                properties.insert(bedrock.to_string(), PropValue::Byte((text == "true") as i8));
            }
            Some(_) => {}
            None => {
                properties.insert(key.clone(), guess_bedrock_value(&text));
            }
        }
    }
    for rule in rules {
        if let PropRule::BedrockOnly { bedrock, default } = rule {
            properties
                .entry(bedrock.to_string())
                .or_insert_with(|| default.to_value());
        }
    }
    Some(BlockState {
        name: name.to_string(),
        properties,
    })
}

fn block_to_java(state: &BlockState) -> Option<BlockState> {
    if let Some((_, alias)) = cross::BEDROCK_ONLY_BLOCKS.iter().find(|(b, _)| *b == state.name) {
        return Some(BlockState::new(*alias));
    }
    let (name, rules): (&str, &[PropRule]) = match cross::find_block_from_bedrock(&state.name) {
        Some(entry) => (entry.java, entry.props),
        None if is_vanilla(&state.name) => (state.name.as_str(), NO_RULES),
        None => return None,
    };

    let mut properties = BTreeMap::new();
    for (key, value) in &state.properties {
        let rule = rules.iter().find(|r| match r {
            PropRule::Rename { bedrock, .. }
            | PropRule::IntRename { bedrock, .. }
            | PropRule::BoolByte { bedrock, .. }
            | PropRule::BedrockOnly { bedrock, .. } => bedrock == key,
            PropRule::JavaOnly { .. } => false,
        });
        match rule {
            Some(PropRule::Rename { java, .. })
            | Some(PropRule::IntRename { java, .. })
            | Some(PropRule::BoolByte { java, .. }) => {
                properties.insert(java.to_string(), PropValue::Str(java_text(value)));
            }
            Some(_) => {}
            None => {
                properties.insert(key.clone(), PropValue::Str(java_text(value)));
            }
        }
    }
    for rule in rules {
        if let PropRule::JavaOnly { java, default } = rule {
            properties
                .entry(java.to_string())
                .or_insert_with(|| PropValue::Str(default.to_string()));
        }
    }
    Some(BlockState {
        name: name.to_string(),
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java_latest_to_bedrock() -> MappingChain {
        let registry = SchemaRegistry::global();
        registry
            .block_state_map(registry.latest(Edition::Java).id, registry.latest(Edition::Bedrock).id)
            .unwrap()
    }

    #[test]
    fn axis_and_liquid_depth_translate() {
        let chain = java_latest_to_bedrock();
        let log = BlockState::new("minecraft:oak_log").with_str("axis", "x");
        let mapped = chain.map_block(&log).unwrap();
        assert_eq!(mapped.properties.get("pillar_axis"), Some(&PropValue::Str("x".into())));

        let water = BlockState::new("minecraft:water").with_str("level", "0");
        let mapped = chain.map_block(&water).unwrap();
        assert_eq!(mapped.properties.get("liquid_depth"), Some(&PropValue::Int(0)));
    }

    #[test]
    fn java_only_properties_are_restored_with_defaults() {
        let registry = SchemaRegistry::global();
        let back = registry
            .block_state_map(registry.latest(Edition::Bedrock).id, registry.latest(Edition::Java).id)
            .unwrap();
        let grass = BlockState::new("minecraft:grass_block");
        let mapped = back.map_block(&grass).unwrap();
        assert_eq!(mapped, BlockState::new("minecraft:grass_block").with_str("snowy", "false"));
    }

    #[test]
    fn leaves_persistence_becomes_a_byte() {
        let chain = java_latest_to_bedrock();
        let leaves = BlockState::new("minecraft:oak_leaves")
            .with_str("persistent", "true")
            .with_str("distance", "7")
            .with_str("waterlogged", "false");
        let mapped = chain.map_block(&leaves).unwrap();
        assert_eq!(mapped.properties.get("persistent_bit"), Some(&PropValue::Byte(1)));
        assert_eq!(mapped.properties.get("update_bit"), Some(&PropValue::Byte(0)));
        assert!(!mapped.properties.contains_key("distance"));
    }

    #[test]
    fn modded_blocks_have_no_mapping() {
        let chain = java_latest_to_bedrock();
        assert_eq!(chain.map_block(&BlockState::new("examplemod:glow_crystal")), None);
    }

    #[test]
    fn old_bedrock_wool_flattens_on_the_way_to_java() {
        let registry = SchemaRegistry::global();
        let chain = registry
            .block_state_map(registry.schemas(Edition::Bedrock)[0].id, registry.latest(Edition::Java).id)
            .unwrap();
        let wool = BlockState::new("minecraft:wool").with("color", PropValue::Str("lime".into()));
        assert_eq!(chain.map_block(&wool), Some(BlockState::new("minecraft:lime_wool")));
        assert_eq!(
            chain.map_biome(&Biome::Numeric(1)),
            Some(Biome::Named("minecraft:plains".into()))
        );
    }

    #[test]
    fn downgrades_substitute_newer_content() {
        let registry = SchemaRegistry::global();
        let java = registry.schemas(Edition::Java);
        let chain = registry.block_state_map(java[5].id, java[0].id).unwrap();
        assert_eq!(
            chain.map_block(&BlockState::new("minecraft:short_grass")),
            Some(BlockState::new("minecraft:grass"))
        );
        assert_eq!(
            chain.map_block(&BlockState::new("minecraft:mud")),
            Some(BlockState::new("minecraft:dirt"))
        );
        assert_eq!(chain.map_block(&BlockState::new("minecraft:crafter")), None);
        assert_eq!(chain.map_entity("minecraft:warden"), None);
        assert_eq!(
            chain.map_biome(&Biome::Named("minecraft:cherry_grove".into())),
            Some(Biome::Named("minecraft:meadow".into()))
        );
    }

    #[test]
    fn entity_and_block_entity_names_translate() {
        let chain = java_latest_to_bedrock();
        assert_eq!(chain.map_entity("minecraft:villager").as_deref(), Some("minecraft:villager_v2"));
        assert_eq!(chain.map_entity("minecraft:cow").as_deref(), Some("minecraft:cow"));
        assert_eq!(chain.map_entity("minecraft:marker"), None);
        assert_eq!(chain.map_block_entity("minecraft:chest").as_deref(), Some("Chest"));
        assert_eq!(chain.map_item("minecraft:cobweb"), "minecraft:web");
    }
}
