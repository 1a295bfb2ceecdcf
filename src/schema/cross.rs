//! Java ⇄ Bedrock 对照表（最新版本之间）

use super::tables::PropLit;

/// 单个属性的跨版本族转换
#[derive(Debug, Clone, Copy)]
pub enum PropRule {
    /// 同值改名（字符串）
    Rename { java: &'static str, bedrock: &'static str },
    /// Java 字符串数字 ⇄ Bedrock int
    IntRename { java: &'static str, bedrock: &'static str },
    /// Java "true"/"false" ⇄ Bedrock byte
    BoolByte { java: &'static str, bedrock: &'static str },
    /// 仅 Java 有，转回 Java 时补默认值
    JavaOnly { java: &'static str, default: &'static str },
    /// 仅 Bedrock 有，转到 Bedrock 时补默认值
    BedrockOnly { bedrock: &'static str, default: PropLit },
}

#[derive(Debug, Clone, Copy)]
pub struct CrossBlock {
    pub java: &'static str,
    pub bedrock: &'static str,
    pub props: &'static [PropRule],
}

const AXIS: &[PropRule] = &[PropRule::Rename { java: "axis", bedrock: "pillar_axis" }];
const LIQUID: &[PropRule] = &[PropRule::IntRename { java: "level", bedrock: "liquid_depth" }];
const LEAVES: &[PropRule] = &[
    PropRule::BoolByte { java: "persistent", bedrock: "persistent_bit" },
    PropRule::JavaOnly { java: "distance", default: "7" },
    PropRule::JavaOnly { java: "waterlogged", default: "false" },
    PropRule::BedrockOnly { bedrock: "update_bit", default: PropLit::Byte(0) },
];
const SNOWY: &[PropRule] = &[PropRule::JavaOnly { java: "snowy", default: "false" }];
const FACING: &[PropRule] = &[PropRule::Rename {
    java: "facing",
    bedrock: "minecraft:cardinal_direction",
}];
const SLAB: &[PropRule] = &[
    PropRule::Rename { java: "type", bedrock: "minecraft:vertical_half" },
    PropRule::JavaOnly { java: "waterlogged", default: "false" },
];
const LIT: &[PropRule] = &[
    PropRule::Rename { java: "facing", bedrock: "minecraft:cardinal_direction" },
    PropRule::JavaOnly { java: "lit", default: "false" },
];
const SNOW_LAYER: &[PropRule] = &[
    PropRule::JavaOnly { java: "layers", default: "1" },
    PropRule::BedrockOnly { bedrock: "height", default: PropLit::Int(0) },
    PropRule::BedrockOnly { bedrock: "covered_bit", default: PropLit::Byte(0) },
];

/// 双向对照；同名且属性一致的方块不必列出
pub const CROSS_BLOCKS: &[CrossBlock] = &[
    CrossBlock { java: "minecraft:water", bedrock: "minecraft:water", props: LIQUID },
    CrossBlock { java: "minecraft:lava", bedrock: "minecraft:lava", props: LIQUID },
    CrossBlock { java: "minecraft:grass_block", bedrock: "minecraft:grass_block", props: SNOWY },
    CrossBlock { java: "minecraft:podzol", bedrock: "minecraft:podzol", props: SNOWY },
    CrossBlock { java: "minecraft:mycelium", bedrock: "minecraft:mycelium", props: SNOWY },
    CrossBlock { java: "minecraft:oak_log", bedrock: "minecraft:oak_log", props: AXIS },
    CrossBlock { java: "minecraft:spruce_log", bedrock: "minecraft:spruce_log", props: AXIS },
    CrossBlock { java: "minecraft:birch_log", bedrock: "minecraft:birch_log", props: AXIS },
    CrossBlock { java: "minecraft:jungle_log", bedrock: "minecraft:jungle_log", props: AXIS },
    CrossBlock { java: "minecraft:acacia_log", bedrock: "minecraft:acacia_log", props: AXIS },
    CrossBlock { java: "minecraft:dark_oak_log", bedrock: "minecraft:dark_oak_log", props: AXIS },
    CrossBlock { java: "minecraft:mangrove_log", bedrock: "minecraft:mangrove_log", props: AXIS },
    CrossBlock { java: "minecraft:cherry_log", bedrock: "minecraft:cherry_log", props: AXIS },
    CrossBlock { java: "minecraft:pale_oak_log", bedrock: "minecraft:pale_oak_log", props: AXIS },
    CrossBlock { java: "minecraft:basalt", bedrock: "minecraft:basalt", props: AXIS },
    CrossBlock { java: "minecraft:bone_block", bedrock: "minecraft:bone_block", props: AXIS },
    CrossBlock { java: "minecraft:hay_block", bedrock: "minecraft:hay_block", props: AXIS },
    CrossBlock { java: "minecraft:oak_leaves", bedrock: "minecraft:oak_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:spruce_leaves", bedrock: "minecraft:spruce_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:birch_leaves", bedrock: "minecraft:birch_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:jungle_leaves", bedrock: "minecraft:jungle_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:acacia_leaves", bedrock: "minecraft:acacia_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:dark_oak_leaves", bedrock: "minecraft:dark_oak_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:cherry_leaves", bedrock: "minecraft:cherry_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:pale_oak_leaves", bedrock: "minecraft:pale_oak_leaves", props: LEAVES },
    CrossBlock { java: "minecraft:furnace", bedrock: "minecraft:furnace", props: LIT },
    CrossBlock { java: "minecraft:smoker", bedrock: "minecraft:smoker", props: LIT },
    CrossBlock { java: "minecraft:blast_furnace", bedrock: "minecraft:blast_furnace", props: LIT },
    CrossBlock { java: "minecraft:chest", bedrock: "minecraft:chest", props: FACING },
    CrossBlock { java: "minecraft:barrel", bedrock: "minecraft:barrel", props: &[] },
    CrossBlock { java: "minecraft:carved_pumpkin", bedrock: "minecraft:carved_pumpkin", props: FACING },
    CrossBlock { java: "minecraft:stone_slab", bedrock: "minecraft:normal_stone_slab", props: SLAB },
    CrossBlock { java: "minecraft:oak_slab", bedrock: "minecraft:oak_slab", props: SLAB },
    CrossBlock { java: "minecraft:snow", bedrock: "minecraft:snow_layer", props: SNOW_LAYER },
    CrossBlock { java: "minecraft:snow_block", bedrock: "minecraft:snow", props: &[] },
    CrossBlock { java: "minecraft:note_block", bedrock: "minecraft:noteblock", props: &[] },
    CrossBlock { java: "minecraft:lily_pad", bedrock: "minecraft:waterlily", props: &[] },
    CrossBlock { java: "minecraft:cobweb", bedrock: "minecraft:web", props: &[] },
    CrossBlock { java: "minecraft:dirt_path", bedrock: "minecraft:grass_path", props: &[] },
    CrossBlock { java: "minecraft:magma_block", bedrock: "minecraft:magma", props: &[] },
    CrossBlock { java: "minecraft:spawner", bedrock: "minecraft:mob_spawner", props: &[] },
    CrossBlock { java: "minecraft:terracotta", bedrock: "minecraft:hardened_clay", props: &[] },
    CrossBlock { java: "minecraft:slime_block", bedrock: "minecraft:slime", props: &[] },
    CrossBlock { java: "minecraft:melon", bedrock: "minecraft:melon_block", props: &[] },
    CrossBlock { java: "minecraft:end_stone_bricks", bedrock: "minecraft:end_bricks", props: &[] },
    CrossBlock { java: "minecraft:red_nether_bricks", bedrock: "minecraft:red_nether_brick", props: &[] },
    CrossBlock { java: "minecraft:sugar_cane", bedrock: "minecraft:reeds", props: &[] },
    CrossBlock { java: "minecraft:powered_rail", bedrock: "minecraft:golden_rail", props: &[] },
    CrossBlock { java: "minecraft:nether_portal", bedrock: "minecraft:portal", props: &[] },
    CrossBlock { java: "minecraft:bricks", bedrock: "minecraft:brick_block", props: &[] },
];

/// 单向别名：Java 特有方块在 Bedrock 中的对应
pub const JAVA_ONLY_BLOCKS: &[(&str, &str)] = &[
    ("minecraft:cave_air", "minecraft:air"),
    ("minecraft:void_air", "minecraft:air"),
    ("minecraft:moving_piston", "minecraft:air"),
];

/// 单向别名：Bedrock 特有方块在 Java 中的对应
pub const BEDROCK_ONLY_BLOCKS: &[(&str, &str)] = &[
    ("minecraft:flowing_water", "minecraft:water"),
    ("minecraft:flowing_lava", "minecraft:lava"),
    ("minecraft:info_update", "minecraft:air"),
    ("minecraft:info_update2", "minecraft:air"),
    ("minecraft:reserved6", "minecraft:air"),
    ("minecraft:unknown", "minecraft:stone"),
];

/// 生物群系：Java 名称 ⇄ Bedrock 数字 ID
pub const CROSS_BIOMES: &[(&str, i32)] = &[
    ("minecraft:ocean", 0),
    ("minecraft:plains", 1),
    ("minecraft:desert", 2),
    ("minecraft:windswept_hills", 3),
    ("minecraft:forest", 4),
    ("minecraft:taiga", 5),
    ("minecraft:swamp", 6),
    ("minecraft:river", 7),
    ("minecraft:nether_wastes", 8),
    ("minecraft:the_end", 9),
    ("minecraft:frozen_river", 11),
    ("minecraft:snowy_plains", 12),
    ("minecraft:mushroom_fields", 14),
    ("minecraft:beach", 16),
    ("minecraft:jungle", 21),
    ("minecraft:sparse_jungle", 23),
    ("minecraft:deep_ocean", 24),
    ("minecraft:stony_shore", 25),
    ("minecraft:snowy_beach", 26),
    ("minecraft:birch_forest", 27),
    ("minecraft:dark_forest", 29),
    ("minecraft:snowy_taiga", 30),
    ("minecraft:old_growth_pine_taiga", 32),
    ("minecraft:windswept_forest", 34),
    ("minecraft:savanna", 35),
    ("minecraft:savanna_plateau", 36),
    ("minecraft:badlands", 37),
    ("minecraft:wooded_badlands", 38),
    ("minecraft:warm_ocean", 40),
    ("minecraft:lukewarm_ocean", 42),
    ("minecraft:deep_lukewarm_ocean", 43),
    ("minecraft:cold_ocean", 44),
    ("minecraft:deep_cold_ocean", 45),
    ("minecraft:frozen_ocean", 46),
    ("minecraft:deep_frozen_ocean", 47),
    ("minecraft:bamboo_jungle", 48),
    ("minecraft:sunflower_plains", 129),
    ("minecraft:windswept_gravelly_hills", 131),
    ("minecraft:flower_forest", 132),
    ("minecraft:ice_spikes", 140),
    ("minecraft:old_growth_birch_forest", 155),
    ("minecraft:old_growth_spruce_taiga", 160),
    ("minecraft:windswept_savanna", 163),
    ("minecraft:eroded_badlands", 165),
    ("minecraft:soul_sand_valley", 178),
    ("minecraft:crimson_forest", 179),
    ("minecraft:warped_forest", 180),
    ("minecraft:basalt_deltas", 181),
    ("minecraft:jagged_peaks", 182),
    ("minecraft:frozen_peaks", 183),
    ("minecraft:snowy_slopes", 184),
    ("minecraft:grove", 185),
    ("minecraft:meadow", 186),
    ("minecraft:lush_caves", 187),
    ("minecraft:dripstone_caves", 188),
    ("minecraft:stony_peaks", 189),
    ("minecraft:deep_dark", 190),
    ("minecraft:mangrove_swamp", 191),
    ("minecraft:cherry_grove", 192),
    ("minecraft:pale_garden", 193),
];

/// Java 中只有末地的细分群系，Bedrock 统一为 the_end
pub const JAVA_ONLY_BIOMES: &[(&str, i32)] = &[
    ("minecraft:small_end_islands", 9),
    ("minecraft:end_midlands", 9),
    ("minecraft:end_highlands", 9),
    ("minecraft:end_barrens", 9),
];

/// 实体类型改名（Java, Bedrock）；未列出的 minecraft: 实体同名
pub const CROSS_ENTITIES: &[(&str, &str)] = &[
    ("minecraft:zombified_piglin", "minecraft:zombie_pigman"),
    ("minecraft:evoker", "minecraft:evocation_illager"),
    ("minecraft:experience_orb", "minecraft:xp_orb"),
    ("minecraft:villager", "minecraft:villager_v2"),
    ("minecraft:zombie_villager", "minecraft:zombie_villager_v2"),
    ("minecraft:mooshroom", "minecraft:mooshroom"),
    ("minecraft:snow_golem", "minecraft:snow_golem"),
    ("minecraft:tnt", "minecraft:tnt"),
    ("minecraft:end_crystal", "minecraft:ender_crystal"),
    ("minecraft:potion", "minecraft:splash_potion"),
    ("minecraft:firework_rocket", "minecraft:fireworks_rocket"),
    ("minecraft:eye_of_ender", "minecraft:eye_of_ender_signal"),
    ("minecraft:leash_knot", "minecraft:leash_knot"),
];

/// 另一版本族中没有对应物的实体
pub const JAVA_ONLY_ENTITIES: &[&str] = &[
    "minecraft:marker",
    "minecraft:interaction",
    "minecraft:block_display",
    "minecraft:item_display",
    "minecraft:text_display",
    "minecraft:item_frame",
    "minecraft:glow_item_frame",
    "minecraft:spectral_arrow",
    "minecraft:illusioner",
    "minecraft:giant",
];

pub const BEDROCK_ONLY_ENTITIES: &[&str] = &[
    "minecraft:npc",
    "minecraft:agent",
    "minecraft:tripod_camera",
    "minecraft:balloon",
    "minecraft:ice_bomb",
    "minecraft:chalkboard",
];

/// 方块实体 ID：Java 命名空间 ID ⇄ Bedrock 类名
pub const CROSS_BLOCK_ENTITIES: &[(&str, &str)] = &[
    ("minecraft:chest", "Chest"),
    ("minecraft:trapped_chest", "Chest"),
    ("minecraft:furnace", "Furnace"),
    ("minecraft:blast_furnace", "BlastFurnace"),
    ("minecraft:smoker", "Smoker"),
    ("minecraft:sign", "Sign"),
    ("minecraft:hanging_sign", "HangingSign"),
    ("minecraft:barrel", "Barrel"),
    ("minecraft:hopper", "Hopper"),
    ("minecraft:dispenser", "Dispenser"),
    ("minecraft:dropper", "Dropper"),
    ("minecraft:shulker_box", "ShulkerBox"),
    ("minecraft:bed", "Bed"),
    ("minecraft:banner", "Banner"),
    ("minecraft:beacon", "Beacon"),
    ("minecraft:brewing_stand", "BrewingStand"),
    ("minecraft:enchanting_table", "EnchantTable"),
    ("minecraft:ender_chest", "EnderChest"),
    ("minecraft:jukebox", "Jukebox"),
    ("minecraft:lectern", "Lectern"),
    ("minecraft:mob_spawner", "MobSpawner"),
    ("minecraft:skull", "Skull"),
    ("minecraft:campfire", "Campfire"),
    ("minecraft:bell", "Bell"),
    ("minecraft:beehive", "Beehive"),
    ("minecraft:comparator", "Comparator"),
    ("minecraft:daylight_detector", "DaylightDetector"),
    ("minecraft:end_gateway", "EndGateway"),
    ("minecraft:command_block", "CommandBlock"),
    ("minecraft:structure_block", "StructureBlock"),
    ("minecraft:conduit", "Conduit"),
    ("minecraft:chiseled_bookshelf", "ChiseledBookshelf"),
    ("minecraft:decorated_pot", "DecoratedPot"),
    ("minecraft:brushable_block", "BrushableBlock"),
    ("minecraft:sculk_sensor", "SculkSensor"),
    ("minecraft:sculk_catalyst", "SculkCatalyst"),
    ("minecraft:sculk_shrieker", "SculkShrieker"),
    ("minecraft:crafter", "Crafter"),
    ("minecraft:trial_spawner", "TrialSpawner"),
    ("minecraft:vault", "Vault"),
];

/// 已知的 Java 游戏规则（驼峰名）；Bedrock 使用全小写
pub const GAME_RULES: &[&str] = &[
    "commandBlockOutput",
    "doDaylightCycle",
    "doEntityDrops",
    "doFireTick",
    "doImmediateRespawn",
    "doInsomnia",
    "doMobLoot",
    "doMobSpawning",
    "doTileDrops",
    "doWeatherCycle",
    "drowningDamage",
    "fallDamage",
    "fireDamage",
    "freezeDamage",
    "keepInventory",
    "maxCommandChainLength",
    "mobGriefing",
    "naturalRegeneration",
    "playersSleepingPercentage",
    "randomTickSpeed",
    "sendCommandFeedback",
    "showDeathMessages",
    "spawnRadius",
    "tntExplodes",
];

pub fn find_block_from_java(name: &str) -> Option<&'static CrossBlock> {
    CROSS_BLOCKS.iter().find(|c| c.java == name)
}

pub fn find_block_from_bedrock(name: &str) -> Option<&'static CrossBlock> {
    CROSS_BLOCKS.iter().find(|c| c.bedrock == name)
}

/// Java 方块实体 ID 对应的方块名（用于判断方块实体是否在目标版本中存在）
pub fn block_entity_java_id(bedrock: &str) -> Option<&'static str> {
    CROSS_BLOCK_ENTITIES
        .iter()
        .find(|(_, b)| *b == bedrock)
        .map(|(j, _)| *j)
}
