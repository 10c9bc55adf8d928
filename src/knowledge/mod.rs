//! Craft/smelt/source knowledge base
//!
//! Static world knowledge the analyzer consults: how items are crafted, what
//! ore smelts into what, which block an item is gathered from, and what burns
//! as furnace fuel. Ships with a standard table and can be replaced wholesale
//! from a TOML pack.

pub mod tools;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to parse knowledge pack: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid knowledge pack: {0}")]
    Invalid(String),
}

/// A crafting recipe: ingredient quantities for one batch, and how many
/// output items a batch yields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub ingredients: BTreeMap<String, u32>,

    #[serde(default = "default_output_count")]
    pub output_count: u32,
}

fn default_output_count() -> u32 {
    1
}

impl Recipe {
    /// Number of batches needed to yield at least `needed` items
    pub fn batches_for(&self, needed: u32) -> u32 {
        needed.div_ceil(self.output_count.max(1))
    }
}

/// World knowledge consulted during requirement analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBase {
    /// Items that burn as furnace fuel, in preference order
    fuels: Vec<String>,

    /// Item crafted and placed as an overflow container
    container_item: String,

    /// Item -> crafting recipe
    recipes: BTreeMap<String, Recipe>,

    /// Smeltable output item -> furnace input (ore or raw block)
    smelting: BTreeMap<String, String>,

    /// Gatherable item -> the world block it drops from
    sources: BTreeMap<String, String>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::standard()
    }
}

impl KnowledgeBase {
    /// The built-in standard table
    pub fn standard() -> Self {
        let mut recipes = BTreeMap::new();
        let mut recipe = |item: &str, output_count: u32, ingredients: &[(&str, u32)]| {
            recipes.insert(
                item.to_string(),
                Recipe {
                    ingredients: ingredients
                        .iter()
                        .map(|(name, count)| (name.to_string(), *count))
                        .collect(),
                    output_count,
                },
            );
        };

        recipe("oak_planks", 4, &[("oak_log", 1)]);
        recipe("stick", 4, &[("oak_planks", 2)]);
        recipe("crafting_table", 1, &[("oak_planks", 4)]);
        recipe("wooden_pickaxe", 1, &[("oak_planks", 3), ("stick", 2)]);
        recipe("stone_pickaxe", 1, &[("cobblestone", 3), ("stick", 2)]);
        recipe("iron_pickaxe", 1, &[("iron_ingot", 3), ("stick", 2)]);
        recipe("furnace", 1, &[("cobblestone", 8)]);
        recipe("chest", 1, &[("oak_planks", 8)]);
        recipe("torch", 4, &[("coal", 1), ("stick", 1)]);
        // Mutually derivable pair; the analyzer's visited set breaks the loop.
        recipe("gold_ingot", 1, &[("gold_nugget", 9)]);
        recipe("gold_nugget", 9, &[("gold_ingot", 1)]);

        let smelting = [
            ("iron_ingot", "iron_ore"),
            ("gold_ingot", "gold_ore"),
            ("charcoal", "oak_log"),
            ("glass", "sand"),
        ]
        .into_iter()
        .map(|(out, input)| (out.to_string(), input.to_string()))
        .collect();

        let sources = [
            ("cobblestone", "stone"),
            ("stone", "stone"),
            ("oak_log", "oak_log"),
            ("sand", "sand"),
            ("coal", "coal_ore"),
            ("iron_ore", "iron_ore"),
            ("gold_ore", "gold_ore"),
            ("diamond", "diamond_ore"),
            ("obsidian", "obsidian"),
            ("string", "cobweb"),
        ]
        .into_iter()
        .map(|(item, block)| (item.to_string(), block.to_string()))
        .collect();

        let fuels = ["coal", "charcoal", "oak_planks", "oak_log"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            fuels,
            container_item: "chest".to_string(),
            recipes,
            smelting,
            sources,
        }
    }

    /// Loads a replacement knowledge pack from TOML
    pub fn from_toml_str(raw: &str) -> Result<Self, KnowledgeError> {
        let kb: KnowledgeBase = toml::from_str(raw)?;
        if kb.container_item.is_empty() {
            return Err(KnowledgeError::Invalid(
                "container_item must not be empty".to_string(),
            ));
        }
        Ok(kb)
    }

    pub fn recipe(&self, item: &str) -> Option<&Recipe> {
        self.recipes.get(item)
    }

    /// The furnace input that smelts into `output`, if any
    pub fn smelt_input(&self, output: &str) -> Option<&str> {
        self.smelting.get(output).map(String::as_str)
    }

    /// The world block `item` is gathered from, if any
    pub fn source_block(&self, item: &str) -> Option<&str> {
        self.sources.get(item).map(String::as_str)
    }

    pub fn is_fuel(&self, item: &str) -> bool {
        self.fuels.iter().any(|f| f == item)
    }

    /// The fuel to go collect when none is held
    pub fn primary_fuel(&self) -> &str {
        self.fuels.first().map(String::as_str).unwrap_or("coal")
    }

    /// The first fuel item present in `inventory`, if any
    pub fn held_fuel<'a>(&'a self, inventory: &HashMap<String, u32>) -> Option<&'a str> {
        self.fuels
            .iter()
            .find(|fuel| inventory.get(*fuel).copied().unwrap_or(0) > 0)
            .map(String::as_str)
    }

    pub fn container_item(&self) -> &str {
        &self.container_item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_pickaxe_chain() {
        let kb = KnowledgeBase::standard();

        let pick = kb.recipe("stone_pickaxe").unwrap();
        assert_eq!(pick.ingredients.get("cobblestone"), Some(&3));
        assert_eq!(pick.ingredients.get("stick"), Some(&2));
        assert_eq!(pick.output_count, 1);

        let sticks = kb.recipe("stick").unwrap();
        assert_eq!(sticks.output_count, 4);
        assert!(kb.recipe("oak_planks").is_some());
    }

    #[test]
    fn batches_round_up() {
        let kb = KnowledgeBase::standard();
        let sticks = kb.recipe("stick").unwrap();

        assert_eq!(sticks.batches_for(1), 1);
        assert_eq!(sticks.batches_for(4), 1);
        assert_eq!(sticks.batches_for(5), 2);
    }

    #[test]
    fn smelting_and_sources() {
        let kb = KnowledgeBase::standard();

        assert_eq!(kb.smelt_input("iron_ingot"), Some("iron_ore"));
        assert_eq!(kb.smelt_input("stick"), None);
        assert_eq!(kb.source_block("cobblestone"), Some("stone"));
        assert_eq!(kb.source_block("iron_ingot"), None);
    }

    #[test]
    fn fuel_lookup() {
        let kb = KnowledgeBase::standard();

        assert!(kb.is_fuel("coal"));
        assert!(!kb.is_fuel("cobblestone"));
        assert_eq!(kb.primary_fuel(), "coal");

        let empty = HashMap::new();
        assert_eq!(kb.held_fuel(&empty), None);

        let stocked = HashMap::from([("oak_planks".to_string(), 12u32)]);
        assert_eq!(kb.held_fuel(&stocked), Some("oak_planks"));
    }

    #[test]
    fn toml_pack_roundtrip() {
        let kb = KnowledgeBase::standard();
        let raw = toml::to_string(&kb).unwrap();
        let parsed = KnowledgeBase::from_toml_str(&raw).unwrap();

        assert_eq!(kb, parsed);
    }

    #[test]
    fn toml_pack_partial() {
        let raw = r#"
            fuels = ["peat"]

            [recipes.plank]
            output_count = 2
            [recipes.plank.ingredients]
            log = 1
        "#;

        let kb = KnowledgeBase::from_toml_str(raw).unwrap();
        assert_eq!(kb.primary_fuel(), "peat");
        assert_eq!(kb.recipe("plank").unwrap().output_count, 2);
        assert!(kb.recipe("stick").is_none());
    }
}
