//! 同一版本族内的版本差异表
//!
//! 规则按升级方向书写（旧 → 新），降级时反向应用。

use crate::model::{Edition, PropValue};

/// 静态表中的属性字面量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropLit {
    Str(&'static str),
    Int(i32),
    Byte(i8),
}

impl PropLit {
    pub fn to_value(self) -> PropValue {
        match self {
            PropLit::Str(s) => PropValue::Str(s.to_string()),
            PropLit::Int(v) => PropValue::Int(v),
            PropLit::Byte(v) => PropValue::Byte(v),
        }
    }

    pub fn matches(self, value: &PropValue) -> bool {
        self.to_value().as_text() == value.as_text()
    }
}

/// 升级到 `at` 版本时生效的方块改名/扁平化规则
///
/// 升级时移除 `when` 中的属性；降级时把它们加回去。
#[derive(Debug, Clone, Copy)]
pub struct BlockRule {
    pub edition: Edition,
    pub at: &'static str,
    pub from: &'static str,
    /// 所有条件都满足时才匹配
    pub when: &'static [(&'static str, &'static str)],
    pub to: &'static str,
}

/// 仅降级方向的替换：目标版本中不存在的新方块换成最接近的旧方块
#[derive(Debug, Clone, Copy)]
pub struct Substitute {
    pub from: &'static str,
    pub to: &'static str,
}

/// 新增内容及其首次出现的版本（Java / Bedrock）
#[derive(Debug, Clone, Copy)]
pub struct Introduced {
    pub name: &'static str,
    pub java: &'static str,
    pub bedrock: &'static str,
}

impl Introduced {
    pub fn version(&self, edition: Edition) -> &'static str {
        match edition {
            Edition::Java => self.java,
            Edition::Bedrock => self.bedrock,
        }
    }
}

const fn java(at: &'static str, from: &'static str, to: &'static str) -> BlockRule {
    BlockRule {
        edition: Edition::Java,
        at,
        from,
        when: &[],
        to,
    }
}

const fn flatten(
    at: &'static str,
    from: &'static str,
    when: &'static [(&'static str, &'static str)],
    to: &'static str,
) -> BlockRule {
    BlockRule {
        edition: Edition::Bedrock,
        at,
        from,
        when,
        to,
    }
}

pub const BLOCK_RULES: &[BlockRule] = &[
    java("1.20.4", "minecraft:grass", "minecraft:short_grass"),
    // 羊毛与地毯
    flatten("1.19.80", "minecraft:wool", &[("color", "white")], "minecraft:white_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "orange")], "minecraft:orange_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "magenta")], "minecraft:magenta_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "light_blue")], "minecraft:light_blue_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "yellow")], "minecraft:yellow_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "lime")], "minecraft:lime_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "pink")], "minecraft:pink_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "gray")], "minecraft:gray_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "silver")], "minecraft:light_gray_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "cyan")], "minecraft:cyan_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "purple")], "minecraft:purple_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "blue")], "minecraft:blue_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "brown")], "minecraft:brown_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "green")], "minecraft:green_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "red")], "minecraft:red_wool"),
    flatten("1.19.80", "minecraft:wool", &[("color", "black")], "minecraft:black_wool"),
    flatten("1.19.80", "minecraft:carpet", &[("color", "white")], "minecraft:white_carpet"),
    flatten("1.19.80", "minecraft:carpet", &[("color", "red")], "minecraft:red_carpet"),
    flatten("1.19.80", "minecraft:carpet", &[("color", "black")], "minecraft:black_carpet"),
    // 原木
    flatten("1.20.0", "minecraft:log", &[("old_log_type", "oak")], "minecraft:oak_log"),
    flatten("1.20.0", "minecraft:log", &[("old_log_type", "spruce")], "minecraft:spruce_log"),
    flatten("1.20.0", "minecraft:log", &[("old_log_type", "birch")], "minecraft:birch_log"),
    flatten("1.20.0", "minecraft:log", &[("old_log_type", "jungle")], "minecraft:jungle_log"),
    flatten("1.20.0", "minecraft:log2", &[("new_log_type", "acacia")], "minecraft:acacia_log"),
    flatten("1.20.0", "minecraft:log2", &[("new_log_type", "dark_oak")], "minecraft:dark_oak_log"),
    // 木板、石头、草方块
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "oak")], "minecraft:oak_planks"),
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "spruce")], "minecraft:spruce_planks"),
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "birch")], "minecraft:birch_planks"),
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "jungle")], "minecraft:jungle_planks"),
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "acacia")], "minecraft:acacia_planks"),
    flatten("1.20.80", "minecraft:planks", &[("wood_type", "dark_oak")], "minecraft:dark_oak_planks"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "stone")], "minecraft:stone"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "granite")], "minecraft:granite"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "granite_smooth")], "minecraft:polished_granite"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "diorite")], "minecraft:diorite"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "diorite_smooth")], "minecraft:polished_diorite"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "andesite")], "minecraft:andesite"),
    flatten("1.20.80", "minecraft:stone", &[("stone_type", "andesite_smooth")], "minecraft:polished_andesite"),
    flatten("1.20.80", "minecraft:grass", &[], "minecraft:grass_block"),
    // 草丛
    flatten("1.21.0", "minecraft:tallgrass", &[("tall_grass_type", "default")], "minecraft:short_grass"),
    flatten("1.21.0", "minecraft:tallgrass", &[("tall_grass_type", "tall")], "minecraft:short_grass"),
    flatten("1.21.0", "minecraft:tallgrass", &[("tall_grass_type", "fern")], "minecraft:fern"),
];

/// 各版本新增的方块（首次出现的目录版本）
pub const BLOCKS_INTRODUCED: &[Introduced] = &[
    Introduced { name: "minecraft:mud", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:packed_mud", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:mud_bricks", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:mangrove_log", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:mangrove_planks", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:mangrove_leaves", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:mangrove_roots", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:sculk", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:sculk_vein", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:sculk_catalyst", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:sculk_shrieker", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:reinforced_deepslate", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:cherry_log", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:cherry_planks", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:cherry_leaves", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:cherry_stairs", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:pink_petals", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:bamboo_block", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:bamboo_planks", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:decorated_pot", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:suspicious_sand", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:suspicious_gravel", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:torchflower", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:pitcher_plant", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:tuff_bricks", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:polished_tuff", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:chiseled_tuff", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:copper_bulb", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:crafter", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:trial_spawner", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:vault", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:heavy_core", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:pale_oak_log", java: "1.21.4", bedrock: "1.21.50" },
    Introduced { name: "minecraft:pale_oak_planks", java: "1.21.4", bedrock: "1.21.50" },
    Introduced { name: "minecraft:pale_oak_leaves", java: "1.21.4", bedrock: "1.21.50" },
    Introduced { name: "minecraft:pale_moss_block", java: "1.21.4", bedrock: "1.21.50" },
    Introduced { name: "minecraft:creaking_heart", java: "1.21.4", bedrock: "1.21.50" },
    Introduced { name: "minecraft:resin_block", java: "1.21.4", bedrock: "1.21.50" },
];

/// 降级到不认识该方块的版本时使用的替代
pub const BLOCK_SUBSTITUTES: &[Substitute] = &[
    Substitute { from: "minecraft:mud", to: "minecraft:dirt" },
    Substitute { from: "minecraft:packed_mud", to: "minecraft:dirt" },
    Substitute { from: "minecraft:mud_bricks", to: "minecraft:bricks" },
    Substitute { from: "minecraft:mangrove_log", to: "minecraft:jungle_log" },
    Substitute { from: "minecraft:mangrove_planks", to: "minecraft:jungle_planks" },
    Substitute { from: "minecraft:mangrove_leaves", to: "minecraft:jungle_leaves" },
    Substitute { from: "minecraft:sculk", to: "minecraft:deepslate" },
    Substitute { from: "minecraft:reinforced_deepslate", to: "minecraft:deepslate" },
    Substitute { from: "minecraft:cherry_log", to: "minecraft:birch_log" },
    Substitute { from: "minecraft:cherry_planks", to: "minecraft:birch_planks" },
    Substitute { from: "minecraft:cherry_leaves", to: "minecraft:birch_leaves" },
    Substitute { from: "minecraft:cherry_stairs", to: "minecraft:birch_stairs" },
    Substitute { from: "minecraft:bamboo_planks", to: "minecraft:jungle_planks" },
    Substitute { from: "minecraft:suspicious_sand", to: "minecraft:sand" },
    Substitute { from: "minecraft:suspicious_gravel", to: "minecraft:gravel" },
    Substitute { from: "minecraft:tuff_bricks", to: "minecraft:tuff" },
    Substitute { from: "minecraft:polished_tuff", to: "minecraft:tuff" },
    Substitute { from: "minecraft:chiseled_tuff", to: "minecraft:tuff" },
    Substitute { from: "minecraft:pale_oak_log", to: "minecraft:dark_oak_log" },
    Substitute { from: "minecraft:pale_oak_planks", to: "minecraft:dark_oak_planks" },
    Substitute { from: "minecraft:pale_oak_leaves", to: "minecraft:dark_oak_leaves" },
    Substitute { from: "minecraft:pale_moss_block", to: "minecraft:moss_block" },
];

pub const ENTITIES_INTRODUCED: &[Introduced] = &[
    Introduced { name: "minecraft:allay", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:frog", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:tadpole", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:warden", java: "1.19.4", bedrock: "1.19.80" },
    Introduced { name: "minecraft:camel", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:sniffer", java: "1.20.1", bedrock: "1.20.0" },
    Introduced { name: "minecraft:armadillo", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:breeze", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:bogged", java: "1.21.1", bedrock: "1.21.0" },
    Introduced { name: "minecraft:creaking", java: "1.21.4", bedrock: "1.21.50" },
];

/// Java 生物群系的新增与降级替代（新名称, 首次出现版本, 替代）
pub const JAVA_BIOMES_INTRODUCED: &[(&str, &str, &str)] = &[
    ("minecraft:deep_dark", "1.19.4", "minecraft:dripstone_caves"),
    ("minecraft:mangrove_swamp", "1.19.4", "minecraft:swamp"),
    ("minecraft:cherry_grove", "1.20.1", "minecraft:meadow"),
    ("minecraft:pale_garden", "1.21.4", "minecraft:dark_forest"),
];

/// Bedrock 生物群系的新增与降级替代（新 ID, 首次出现版本, 替代 ID）
pub const BEDROCK_BIOMES_INTRODUCED: &[(i32, &str, i32)] = &[
    (190, "1.19.80", 188),
    (191, "1.19.80", 6),
    (192, "1.20.0", 186),
    (193, "1.21.50", 29),
];
