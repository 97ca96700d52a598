//! Top-level configuration loading and cross-file validation.
//!
//! Each of the three config shapes (map/robots/shelves) validates its own
//! file in isolation in its owning crate; this module adds the referential
//! checks that only make sense once all three are loaded together, and
//! surfaces every problem found instead of failing on the first.

use fleet_map::{MapConfig, WarehouseMap};
use fleet_robots::{RobotRegistry, RobotsConfig};
use fleet_shelves::{ShelfRegistry, ShelvesConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("map config: {0}")]
    Map(#[from] fleet_map::MapConfigError),
    #[error("map build: {0}")]
    MapBuild(#[from] fleet_core::FleetError),
    #[error("robots config: {0}")]
    Robots(#[from] fleet_robots::RobotsConfigError),
    #[error("shelves config: {0}")]
    Shelves(#[from] fleet_shelves::ShelvesConfigError),
    #[error("configuration is inconsistent:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
}

pub struct AppConfigPaths {
    pub map_path: String,
    pub robots_path: String,
    pub shelves_path: String,
}

pub struct LoadedConfig {
    pub map: WarehouseMap,
    pub robots: RobotRegistry,
    pub shelves: ShelfRegistry,
}

/// Loads the three config files, builds their registries, and cross-validates
/// referential integrity between them (robot home nodes, shelf/workstation
/// nodes all resolve on the map; item names unique across shelves) before
/// handing back ready-to-use registries.
pub fn load_and_validate(paths: &AppConfigPaths) -> Result<LoadedConfig, AppConfigError> {
    let map_config = MapConfig::from_file(&paths.map_path)?;
    let map = map_config.build_map()?;

    let robots_config = RobotsConfig::from_file(&paths.robots_path)?;
    let shelves_config = ShelvesConfig::from_file(&paths.shelves_path)?;

    let mut problems = Vec::new();
    validate_robots(&robots_config, &map, &mut problems);
    validate_shelves(&shelves_config, &map, &mut problems);
    validate_unique_items(&shelves_config, &mut problems);

    if !problems.is_empty() {
        return Err(AppConfigError::Validation(problems));
    }

    let robots = robots_config.build_registry();
    let shelves = shelves_config.build_registry();

    Ok(LoadedConfig { map, robots, shelves })
}

fn validate_robots(config: &RobotsConfig, map: &WarehouseMap, problems: &mut Vec<String>) {
    for (id, entry) in &config.robots {
        if !map.is_valid(fleet_core::NodeId::from(entry.home_node)) {
            problems.push(format!("robot {id} has home_node {} not present on the map", entry.home_node));
        }
    }
}

fn validate_shelves(config: &ShelvesConfig, map: &WarehouseMap, problems: &mut Vec<String>) {
    for node_str in config.shelves.keys() {
        match node_str.parse::<u32>() {
            Ok(node_id) if map.is_valid(fleet_core::NodeId::from(node_id)) => {}
            Ok(node_id) => problems.push(format!("shelf home_node {node_id} not present on the map")),
            Err(_) => problems.push(format!("shelf key '{node_str}' is not a valid node id")),
        }
    }
    for node_str in config.workstations.keys() {
        match node_str.parse::<u32>() {
            Ok(node_id) if map.is_valid(fleet_core::NodeId::from(node_id)) => {}
            Ok(node_id) => problems.push(format!("workstation node {node_id} not present on the map")),
            Err(_) => problems.push(format!("workstation key '{node_str}' is not a valid node id")),
        }
    }
}

fn validate_unique_items(config: &ShelvesConfig, problems: &mut Vec<String>) {
    let mut seen = std::collections::HashMap::new();
    for (node_str, shelf) in &config.shelves {
        for item in &shelf.items {
            if let Some(existing) = seen.insert(item.clone(), node_str.clone()) {
                problems.push(format!("item '{item}' appears on both shelf {existing} and shelf {node_str}"));
            }
        }
    }
}
