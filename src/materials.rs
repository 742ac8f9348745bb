//! Static block material catalog
//!
//! Materials are pure data: density drives mass, friction/restitution drive
//! contact behavior, `spawn_weight` drives the weighted material draw at
//! block generation. The catalog is validated once at startup; a malformed
//! entry is a fatal configuration error, not a runtime fallback.

use serde::{Deserialize, Serialize};

/// Physical properties of one block material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub name: &'static str,
    /// Mass per unit volume (> 0)
    pub density: f32,
    /// Contact friction coefficient, in [0, 1]
    pub friction: f32,
    /// Contact bounciness, in [0, 1]
    pub restitution: f32,
    /// Extra mass factor on top of density (1.0 = none)
    pub mass_multiplier: f32,
    /// Relative weight in the spawn draw (0 = never spawned)
    pub spawn_weight: u32,
}

/// Catalog index of the material used for the immovable base slab.
pub const BASE_MATERIAL: usize = 3; // steel

const MATERIALS: &[Material] = &[
    Material {
        name: "wood",
        density: 0.6,
        friction: 0.8,
        restitution: 0.3,
        mass_multiplier: 1.0,
        spawn_weight: 4,
    },
    Material {
        name: "ice",
        density: 0.9,
        friction: 0.05,
        restitution: 0.1,
        mass_multiplier: 1.0,
        spawn_weight: 2,
    },
    Material {
        name: "rubber",
        density: 1.1,
        friction: 1.0,
        restitution: 0.9,
        mass_multiplier: 1.0,
        spawn_weight: 2,
    },
    Material {
        name: "steel",
        density: 7.8,
        friction: 0.6,
        restitution: 0.4,
        mass_multiplier: 1.25,
        spawn_weight: 1,
    },
    Material {
        name: "glass",
        density: 2.5,
        friction: 0.3,
        restitution: 0.2,
        mass_multiplier: 1.0,
        spawn_weight: 2,
    },
    Material {
        name: "foam",
        density: 0.2,
        friction: 0.9,
        restitution: 0.6,
        mass_multiplier: 0.8,
        spawn_weight: 2,
    },
];

/// The static material table
#[derive(Debug, Clone)]
pub struct MaterialCatalog {
    materials: &'static [Material],
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self {
            materials: MATERIALS,
        }
    }

    /// Check catalog invariants. Run once at startup; failures are fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.materials.is_empty(), "material catalog is empty");
        for m in self.materials {
            anyhow::ensure!(m.density > 0.0, "material '{}': density must be > 0", m.name);
            anyhow::ensure!(
                (0.0..=1.0).contains(&m.friction),
                "material '{}': friction out of [0, 1]",
                m.name
            );
            anyhow::ensure!(
                (0.0..=1.0).contains(&m.restitution),
                "material '{}': restitution out of [0, 1]",
                m.name
            );
            anyhow::ensure!(
                m.mass_multiplier > 0.0,
                "material '{}': mass multiplier must be > 0",
                m.name
            );
        }
        anyhow::ensure!(
            self.materials.iter().any(|m| m.spawn_weight > 0),
            "no material has a nonzero spawn weight"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn by_name(&self, name: &str) -> Option<(usize, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn spawn_weights(&self) -> Vec<u32> {
        self.materials.iter().map(|m| m.spawn_weight).collect()
    }

    /// Contact properties for an unordered material pair: geometric-mean
    /// friction and restitution, so one slippery surface dominates.
    pub fn pair_properties(&self, a: usize, b: usize) -> (f32, f32) {
        let (ma, mb) = (self.get(a), self.get(b));
        (
            (ma.friction * mb.friction).sqrt(),
            (ma.restitution * mb.restitution).sqrt(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_validates() {
        MaterialCatalog::new().validate().unwrap();
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = MaterialCatalog::new();
        let (_, wood) = catalog.by_name("wood").unwrap();
        assert!((wood.density - 0.6).abs() < 1e-6);
        assert!(catalog.by_name("plutonium").is_none());
    }

    #[test]
    fn test_base_material_exists() {
        let catalog = MaterialCatalog::new();
        assert!(BASE_MATERIAL < catalog.len());
    }

    #[test]
    fn test_pair_properties_symmetric() {
        let catalog = MaterialCatalog::new();
        let (i, _) = catalog.by_name("ice").unwrap();
        let (r, _) = catalog.by_name("rubber").unwrap();
        assert_eq!(catalog.pair_properties(i, r), catalog.pair_properties(r, i));
        // Ice against anything stays slippery
        let (f, _) = catalog.pair_properties(i, r);
        assert!(f < 0.3);
    }
}
