//! Tool feasibility model
//!
//! Pure functions answering "can the current tool set break this target" and
//! "what is the cheapest tool that would". Targets map to a tool family and a
//! minimum tier through a static hierarchy table; tools are classified by
//! name against a fixed tier vocabulary. Targets with no table entry are
//! assumed performable bare-handed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tool families. A tool only satisfies requirements of its own family,
/// regardless of tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    Cutting,
    Digging,
    Breaking,
    Shearing,
}

impl ToolFamily {
    /// The noun used in tool item names for this family
    pub fn tool_noun(&self) -> &'static str {
        match self {
            ToolFamily::Cutting => "axe",
            ToolFamily::Digging => "shovel",
            ToolFamily::Breaking => "pickaxe",
            ToolFamily::Shearing => "shears",
        }
    }
}

impl fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolFamily::Cutting => "cutting",
            ToolFamily::Digging => "digging",
            ToolFamily::Breaking => "breaking",
            ToolFamily::Shearing => "shearing",
        };
        write!(f, "{}", name)
    }
}

/// Ordered tier vocabulary; index is the tier. Tier 0 is base, tier 4 top.
const TIER_NAMES: [&str; 5] = ["wooden", "stone", "iron", "diamond", "netherite"];

/// Target block -> (family, minimum tier). Targets absent from this table
/// are performable without any tool.
const HIERARCHY: &[(&str, ToolFamily, u8)] = &[
    ("coal_ore", ToolFamily::Breaking, 0),
    ("iron_ore", ToolFamily::Breaking, 1),
    ("copper_ore", ToolFamily::Breaking, 1),
    ("lapis_ore", ToolFamily::Breaking, 1),
    ("gold_ore", ToolFamily::Breaking, 2),
    ("diamond_ore", ToolFamily::Breaking, 2),
    ("redstone_ore", ToolFamily::Breaking, 2),
    ("emerald_ore", ToolFamily::Breaking, 2),
    ("obsidian", ToolFamily::Breaking, 3),
    ("ancient_debris", ToolFamily::Breaking, 3),
    ("cobweb", ToolFamily::Shearing, 0),
    ("vine", ToolFamily::Shearing, 0),
    ("snow", ToolFamily::Digging, 0),
    ("clay", ToolFamily::Digging, 0),
];

/// What a target demands of the tool set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRequirement {
    pub family: ToolFamily,
    pub tier: u8,
}

/// An upgrade the tool set needs before a target becomes feasible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSuggestion {
    pub target: String,
    pub required_tool: String,
    pub reason: String,
}

/// Looks up the hierarchy entry for a target
pub fn requirement_for(target: &str) -> Option<ToolRequirement> {
    HIERARCHY
        .iter()
        .find(|(name, _, _)| *name == target)
        .map(|(_, family, tier)| ToolRequirement {
            family: *family,
            tier: *tier,
        })
}

/// Classifies a tool item name into (family, tier), or None for non-tools
pub fn classify_tool(name: &str) -> Option<(ToolFamily, u8)> {
    if name == "shears" {
        return Some((ToolFamily::Shearing, 0));
    }

    // `_pickaxe` must be checked before the `_axe` suffix it contains.
    let family = if name.ends_with("_pickaxe") {
        ToolFamily::Breaking
    } else if name.ends_with("_shovel") {
        ToolFamily::Digging
    } else if name.ends_with("_axe") {
        ToolFamily::Cutting
    } else {
        return None;
    };

    let tier = if name.starts_with("golden_") {
        // Gold tools break fast and mine low; ranked with the base tier.
        0
    } else {
        TIER_NAMES
            .iter()
            .position(|tier_name| name.starts_with(&format!("{}_", tier_name)))? as u8
    };

    Some((family, tier))
}

/// The best owned tier per family, derived from inventory item names
fn owned_tiers(inventory: &HashMap<String, u32>) -> HashMap<ToolFamily, u8> {
    let mut best: HashMap<ToolFamily, u8> = HashMap::new();
    for (item, count) in inventory {
        if *count == 0 {
            continue;
        }
        if let Some((family, tier)) = classify_tool(item) {
            let entry = best.entry(family).or_insert(tier);
            if tier > *entry {
                *entry = tier;
            }
        }
    }
    best
}

/// Returns true if the owned tool set can perform an action on `target`
pub fn can_perform(target: &str, inventory: &HashMap<String, u32>) -> bool {
    match requirement_for(target) {
        // Unknown blocks are assumed performable.
        None => true,
        Some(req) => owned_tiers(inventory)
            .get(&req.family)
            .is_some_and(|tier| *tier >= req.tier),
    }
}

/// The cheapest tool (by tier) that satisfies `target`, or None when no tool
/// is required at all
pub fn minimal_required_tool(target: &str) -> Option<String> {
    let req = requirement_for(target)?;
    Some(tool_name(req))
}

fn tool_name(req: ToolRequirement) -> String {
    match req.family {
        ToolFamily::Shearing => "shears".to_string(),
        family => format!(
            "{}_{}",
            TIER_NAMES[req.tier.min(4) as usize],
            family.tool_noun()
        ),
    }
}

/// For each infeasible target, the minimum upgrade that would unlock it.
/// Never suggests a higher tier than required.
pub fn suggest_upgrades<'a, I>(
    targets: I,
    inventory: &HashMap<String, u32>,
) -> Vec<UpgradeSuggestion>
where
    I: IntoIterator<Item = &'a str>,
{
    let owned = owned_tiers(inventory);
    let mut suggestions = Vec::new();

    for target in targets {
        let Some(req) = requirement_for(target) else {
            continue;
        };
        let satisfied = owned
            .get(&req.family)
            .is_some_and(|tier| *tier >= req.tier);
        if satisfied {
            continue;
        }

        let required_tool = tool_name(req);
        let reason = match owned.get(&req.family) {
            Some(tier) => format!(
                "{} needs a {} tool of tier {}, best owned is tier {}",
                target, req.family, req.tier, tier
            ),
            None => format!("{} needs a {} tool of tier {}, none owned", target, req.family, req.tier),
        };

        suggestions.push(UpgradeSuggestion {
            target: target.to_string(),
            required_tool,
            reason,
        });
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(items: &[(&str, u32)]) -> HashMap<String, u32> {
        items
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect()
    }

    #[test]
    fn classify_tool_families_and_tiers() {
        assert_eq!(
            classify_tool("stone_pickaxe"),
            Some((ToolFamily::Breaking, 1))
        );
        assert_eq!(classify_tool("diamond_axe"), Some((ToolFamily::Cutting, 3)));
        assert_eq!(
            classify_tool("netherite_shovel"),
            Some((ToolFamily::Digging, 4))
        );
        assert_eq!(classify_tool("shears"), Some((ToolFamily::Shearing, 0)));
        assert_eq!(classify_tool("golden_pickaxe"), Some((ToolFamily::Breaking, 0)));
        assert_eq!(classify_tool("cobblestone"), None);
        assert_eq!(classify_tool("pickaxe"), None); // no tier prefix
    }

    #[test]
    fn unknown_targets_are_performable() {
        let empty = HashMap::new();
        assert!(can_perform("stone", &empty));
        assert!(can_perform("oak_log", &empty));
    }

    #[test]
    fn gating_requires_matching_family_and_tier() {
        let none = HashMap::new();
        assert!(!can_perform("iron_ore", &none));

        // Right family, right tier.
        assert!(can_perform("iron_ore", &inventory(&[("stone_pickaxe", 1)])));

        // Right family, tier too low.
        assert!(!can_perform("iron_ore", &inventory(&[("wooden_pickaxe", 1)])));

        // Higher tier of the wrong family does not satisfy.
        assert!(!can_perform("iron_ore", &inventory(&[("diamond_axe", 1)])));

        // Zero-count tools are not owned.
        assert!(!can_perform("iron_ore", &inventory(&[("stone_pickaxe", 0)])));
    }

    #[test]
    fn minimal_tool_is_never_higher_tier() {
        assert_eq!(
            minimal_required_tool("iron_ore").as_deref(),
            Some("stone_pickaxe")
        );
        assert_eq!(
            minimal_required_tool("coal_ore").as_deref(),
            Some("wooden_pickaxe")
        );
        assert_eq!(
            minimal_required_tool("obsidian").as_deref(),
            Some("diamond_pickaxe")
        );
        assert_eq!(minimal_required_tool("cobweb").as_deref(), Some("shears"));
        assert_eq!(minimal_required_tool("stone"), None);
    }

    #[test]
    fn suggest_upgrades_names_exactly_the_minimum() {
        let none = HashMap::new();
        let suggestions = suggest_upgrades(["iron_ore"], &none);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].target, "iron_ore");
        assert_eq!(suggestions[0].required_tool, "stone_pickaxe");
    }

    #[test]
    fn suggest_upgrades_skips_feasible_targets() {
        let kit = inventory(&[("diamond_pickaxe", 1)]);
        let suggestions = suggest_upgrades(["iron_ore", "obsidian", "cobweb"], &kit);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].target, "cobweb");
        assert_eq!(suggestions[0].required_tool, "shears");
    }

    #[test]
    fn suggest_upgrades_ignores_unknown_targets() {
        let none = HashMap::new();
        assert!(suggest_upgrades(["stone", "dirt"], &none).is_empty());
    }
}
