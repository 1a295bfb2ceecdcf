//! 版本目录与 schema 注册表
//!
//! 所有表都是静态数据，进程内首次使用时构建一次，之后只读。

pub mod catalog;
pub mod cross;
pub mod graph;
pub mod mapping;
pub mod tables;

pub use catalog::{list_target_versions, Schema, SchemaFlags, SchemaId};
pub use graph::SchemaGraph;
pub use mapping::{MappingChain, Step};

use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{ConvertError, Result};
use crate::model::Edition;
use catalog::{build_schemas, JAVA_MIN_DATA_VERSION};
use tables::{BLOCKS_INTRODUCED, BLOCK_RULES};

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::build);

/// 方块名在某个版本族中的生命周期（目录序号）
#[derive(Debug, Clone, Copy, Default)]
struct Lifecycle {
    introduced: usize,
    retired: Option<usize>,
}

pub struct SchemaRegistry {
    java: Vec<Schema>,
    bedrock: Vec<Schema>,
    graph: SchemaGraph,
    lifecycles: HashMap<(Edition, &'static str), Lifecycle>,
}

impl SchemaRegistry {
    pub fn global() -> &'static SchemaRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let java = build_schemas(Edition::Java);
        let bedrock = build_schemas(Edition::Bedrock);

        // 同版本族相邻版本：先升级边再降级边；最后是跨版本族的一对边
        let mut edges = Vec::new();
        for schemas in [&java, &bedrock] {
            for pair in schemas.windows(2) {
                edges.push((pair[0].id, pair[1].id));
                edges.push((pair[1].id, pair[0].id));
            }
        }
        if let (Some(j), Some(b)) = (java.last(), bedrock.last()) {
            edges.push((j.id, b.id));
            edges.push((b.id, j.id));
        }

        let index_of = |edition: Edition, name: &str| {
            let list = match edition {
                Edition::Java => &java,
                Edition::Bedrock => &bedrock,
            };
            list.iter().position(|s| s.name == name)
        };

        let mut lifecycles: HashMap<(Edition, &'static str), Lifecycle> = HashMap::new();
        for intro in BLOCKS_INTRODUCED {
            for edition in [Edition::Java, Edition::Bedrock] {
                if let Some(idx) = index_of(edition, intro.version(edition)) {
                    lifecycles.entry((edition, intro.name)).or_default().introduced = idx;
                }
            }
        }
        for rule in BLOCK_RULES {
            let Some(idx) = index_of(rule.edition, rule.at) else {
                continue;
            };
            if rule.from != rule.to {
                lifecycles.entry((rule.edition, rule.to)).or_default().introduced = idx;
                let kept = BLOCK_RULES
                    .iter()
                    .any(|r| r.edition == rule.edition && r.from == rule.from && r.to == r.from);
                if !kept {
                    lifecycles.entry((rule.edition, rule.from)).or_default().retired = Some(idx);
                }
            }
        }

        Self {
            java,
            bedrock,
            graph: SchemaGraph::new(edges),
            lifecycles,
        }
    }

    /// 平台目录，旧 → 新
    pub fn schemas(&self, edition: Edition) -> &[Schema] {
        match edition {
            Edition::Java => &self.java,
            Edition::Bedrock => &self.bedrock,
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn get(&self, id: SchemaId) -> &Schema {
        &self.schemas(id.edition)[id.index]
    }

    pub fn latest(&self, edition: Edition) -> &Schema {
        let list = self.schemas(edition);
        &list[list.len() - 1]
    }

    /// 按版本号查找目标 schema
    pub fn resolve(&self, token: &str, edition: Edition) -> Result<&Schema> {
        let token = token.trim();
        self.schemas(edition)
            .iter()
            .find(|s| s.name == token)
            .ok_or_else(|| ConvertError::UnknownVersion {
                edition,
                version: token.to_string(),
            })
    }

    /// 未指定版本时取最新
    pub fn target(&self, token: Option<&str>, edition: Edition) -> Result<&Schema> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => self.resolve(t, edition),
            None => Ok(self.latest(edition)),
        }
    }

    /// 由 Java DataVersion 判断 schema：取不晚于它的最新目录版本
    pub fn detect_java(&self, data_version: i32) -> Result<&Schema> {
        if data_version < JAVA_MIN_DATA_VERSION {
            return Err(ConvertError::unsupported(
                Edition::Java,
                format!("DataVersion {}", data_version),
            ));
        }
        let latest = self.latest(Edition::Java);
        if data_version > latest.data_version {
            warn!(
                "DataVersion {} is newer than {}; treating it as {}",
                data_version, latest.name, latest.name
            );
            return Ok(latest);
        }
        Ok(self
            .java
            .iter()
            .rev()
            .find(|s| s.data_version <= data_version)
            .unwrap_or(&self.java[0]))
    }

    /// 由 Bedrock lastOpenedWithVersion 判断 schema
    pub fn detect_bedrock(&self, version: [i32; 3]) -> Result<&Schema> {
        let detected = format!("{}.{}.{}", version[0], version[1], version[2]);
        let found = self.bedrock.iter().rev().find(|s| s.version <= version);
        match found {
            Some(schema) => {
                let latest = self.latest(Edition::Bedrock);
                if version > latest.version {
                    warn!("Bedrock {} is newer than {}; treating it as {}", detected, latest.name, latest.name);
                }
                Ok(schema)
            }
            None => Err(ConvertError::unsupported(Edition::Bedrock, detected)),
        }
    }

    /// 源 schema 到目标 schema 的映射链（最短路径）
    pub fn block_state_map(&self, source: SchemaId, target: SchemaId) -> Result<MappingChain> {
        let path = self
            .graph
            .shortest_path(source, target)
            .ok_or_else(|| ConvertError::NoMappingPath {
                from: source.to_string(),
                to: target.to_string(),
            })?;
        let steps: Vec<Step> = path
            .windows(2)
            .map(|w| Step::between(self, w[0], w[1]))
            .collect();
        debug!("Mapping {} -> {} in {} step(s)", source, target, steps.len());
        Ok(MappingChain::new(source, target, steps))
    }

    fn knows_block(&self, id: SchemaId, name: &str) -> bool {
        if !name.starts_with("minecraft:") {
            return false;
        }
        match self.lifecycles.get(&(id.edition, name)) {
            Some(life) => life.introduced <= id.index && life.retired.map_or(true, |r| id.index < r),
            None => true,
        }
    }
}

impl Schema {
    /// 该版本是否认识这个方块名（写出前的一致性检查）
    pub fn knows_block(&self, name: &str) -> bool {
        SchemaRegistry::global().knows_block(self.id, name)
    }

    pub fn is_latest(&self) -> bool {
        SchemaRegistry::global().latest(self.edition()).id == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_newest_first_and_unique() {
        for platform in ["java", "bedrock", " Java "] {
            let list = list_target_versions(platform).unwrap();
            assert!(!list.is_empty());
            let mut dedup = list.clone();
            dedup.dedup();
            assert_eq!(dedup, list);
        }
        let java = list_target_versions("java").unwrap();
        assert_eq!(java.first().map(String::as_str), Some("1.21.4"));
        assert_eq!(java.last().map(String::as_str), Some("1.18.2"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(matches!(
            list_target_versions("pocket"),
            Err(ConvertError::InvalidPlatform(p)) if p == "pocket"
        ));
    }

    #[test]
    fn resolve_and_detect() {
        let registry = SchemaRegistry::global();
        assert_eq!(registry.resolve("1.20.4", Edition::Java).unwrap().data_version, 3700);
        assert!(matches!(
            registry.resolve("1.12", Edition::Java),
            Err(ConvertError::UnknownVersion { .. })
        ));
        assert_eq!(registry.detect_java(3465).unwrap().name, "1.20.1");
        assert_eq!(registry.detect_java(3500).unwrap().name, "1.20.1");
        assert_eq!(registry.detect_java(2860).unwrap().name, "1.18.2");
        assert_eq!(registry.detect_java(9999).unwrap().name, "1.21.4");
        assert!(matches!(
            registry.detect_java(1343),
            Err(ConvertError::UnsupportedSchema { .. })
        ));
        assert_eq!(registry.detect_bedrock([1, 21, 20]).unwrap().name, "1.21.0");
        assert_eq!(registry.detect_bedrock([1, 26, 0]).unwrap().name, "1.21.50");
        assert!(matches!(
            registry.detect_bedrock([1, 16, 100]),
            Err(ConvertError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn cross_edition_path_uses_the_bridge() {
        let registry = SchemaRegistry::global();
        let java_old = registry.schemas(Edition::Java)[0].id;
        let bedrock_old = registry.schemas(Edition::Bedrock)[0].id;
        let chain = registry.block_state_map(java_old, bedrock_old).unwrap();
        // 5 次升级 + 跨版本族 + 5 次降级
        assert_eq!(chain.steps().len(), 11);
        assert!(chain.steps().contains(&Step::JavaToBedrock));
        assert!(registry.block_state_map(java_old, java_old).unwrap().is_identity());
    }

    #[test]
    fn known_blocks_follow_lifecycles() {
        let registry = SchemaRegistry::global();
        let java = registry.schemas(Edition::Java);
        assert!(java[5].knows_block("minecraft:short_grass"));
        assert!(!java[5].knows_block("minecraft:grass"));
        assert!(java[0].knows_block("minecraft:grass"));
        assert!(!java[0].knows_block("minecraft:mud"));
        assert!(!java[5].knows_block("examplemod:glow_crystal"));

        let bedrock = registry.schemas(Edition::Bedrock);
        assert!(bedrock[0].knows_block("minecraft:wool"));
        assert!(!bedrock[5].knows_block("minecraft:wool"));
        assert!(bedrock[5].knows_block("minecraft:stone"));
    }
}
