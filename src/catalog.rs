//! Chemical tank catalog and the code normalizer built on it.
//!
//! The catalog is loaded once at start-up and shared read-only. Sheets name
//! chemicals loosely ("สารละลายโซดาไฟ", "NaOH 50%"), so every raw code goes
//! through [`ChemicalCatalog::resolve`] before it reaches the tank ledger.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankSpec {
    pub code: String,
    pub description: String,
    /// kg per litre
    pub density: f64,
    #[serde(default)]
    pub capacity_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub pattern: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalCatalog {
    pub tanks: Vec<TankSpec>,
    /// Checked in order; the first pattern found inside the raw code wins.
    #[serde(default)]
    pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Canonical(&'a TankSpec),
    Unknown,
}

impl<'a> Resolution<'a> {
    pub fn tank(self) -> Option<&'a TankSpec> {
        match self {
            Resolution::Canonical(tank) => Some(tank),
            Resolution::Unknown => None,
        }
    }
}

impl ChemicalCatalog {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Catalog {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let catalog: ChemicalCatalog = serde_json::from_str(&raw).map_err(|e| ConfigError::Catalog {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        catalog.validate().map_err(|reason| ConfigError::Catalog {
            path: path.display().to_string(),
            reason,
        })?;
        Ok(catalog)
    }

    /// Every alias must point at a known tank and codes must be unique.
    pub fn validate(&self) -> Result<(), String> {
        for (i, tank) in self.tanks.iter().enumerate() {
            if tank.code.trim().is_empty() {
                return Err(format!("tank #{} has an empty code", i + 1));
            }
            if self.tanks[..i].iter().any(|t| t.code == tank.code) {
                return Err(format!("duplicate tank code {}", tank.code));
            }
        }
        for alias in &self.aliases {
            if alias.pattern.trim().is_empty() {
                return Err(format!("empty alias pattern for {}", alias.code));
            }
            if self.tank(&alias.code).is_none() {
                return Err(format!("alias {:?} points at unknown code {}", alias.pattern, alias.code));
            }
        }
        Ok(())
    }

    pub fn tank(&self, code: &str) -> Option<&TankSpec> {
        self.tanks.iter().find(|t| t.code == code)
    }

    /// Exact code first, then the first alias contained in the raw text
    /// (case-insensitive, table order, not longest match).
    pub fn resolve(&self, raw_code: &str) -> Resolution<'_> {
        let raw = raw_code.trim();
        if raw.is_empty() {
            return Resolution::Unknown;
        }
        if let Some(tank) = self.tank(raw) {
            return Resolution::Canonical(tank);
        }

        let haystack = raw.to_lowercase();
        self.aliases
            .iter()
            .find(|alias| haystack.contains(&alias.pattern.to_lowercase()))
            .and_then(|alias| self.tank(&alias.code))
            .map_or(Resolution::Unknown, Resolution::Canonical)
    }

    pub fn density(&self, code: &str) -> Option<f64> {
        self.tank(code).map(|t| t.density)
    }
}

/// Litres for a mass in kg. A zero, negative or missing density gives 0.
pub fn volume_litres(qty_kg: f64, density: Option<f64>) -> f64 {
    match density {
        Some(d) if d.is_finite() && d > 0.0 => qty_kg / d,
        _ => 0.0,
    }
}

impl Default for ChemicalCatalog {
    fn default() -> Self {
        let tank = |code: &str, description: &str, density: f64, capacity_kg: f64| TankSpec {
            code: code.to_string(),
            description: description.to_string(),
            density,
            capacity_kg: Some(capacity_kg),
        };
        let alias = |pattern: &str, code: &str| Alias {
            pattern: pattern.to_string(),
            code: code.to_string(),
        };

        ChemicalCatalog {
            tanks: vec![
                tank("T11-2005A", "Sodium hydroxide 50%", 1.52, 30_000.0),
                tank("T11-2005B", "Sulfuric acid 98%", 1.84, 25_000.0),
                tank("T11-2006", "Hydrochloric acid 35%", 1.18, 20_000.0),
                tank("T11-2007", "Sodium hypochlorite 10%", 1.20, 15_000.0),
                tank("T11-2008", "Ferric chloride 40%", 1.42, 18_000.0),
            ],
            aliases: vec![
                alias("โซดาไฟ", "T11-2005A"),
                alias("caustic", "T11-2005A"),
                alias("NaOH", "T11-2005A"),
                alias("กรดซัลฟูริก", "T11-2005B"),
                alias("sulfuric", "T11-2005B"),
                alias("H2SO4", "T11-2005B"),
                alias("กรดเกลือ", "T11-2006"),
                alias("hydrochloric", "T11-2006"),
                alias("HCl", "T11-2006"),
                alias("คลอรีน", "T11-2007"),
                alias("hypochlorite", "T11-2007"),
                alias("NaOCl", "T11-2007"),
                alias("เฟอร์ริก", "T11-2008"),
                alias("ferric", "T11-2008"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_code_resolves_to_itself() {
        let catalog = ChemicalCatalog::default();
        let tank = catalog.resolve("T11-2005A").tank().unwrap();
        assert_eq!(tank.code, "T11-2005A");
        assert_eq!(catalog.resolve("  T11-2006 ").tank().unwrap().code, "T11-2006");
    }

    #[test]
    fn alias_substring_resolves_to_mapped_code() {
        let catalog = ChemicalCatalog::default();
        assert_eq!(catalog.resolve("สารละลายโซดาไฟ").tank().unwrap().code, "T11-2005A");
        assert_eq!(catalog.resolve("Caustic Soda 50%").tank().unwrap().code, "T11-2005A");
        assert_eq!(catalog.resolve("naocl 10%").tank().unwrap().code, "T11-2007");
    }

    #[test]
    fn unknown_code_is_reported_as_unknown() {
        let catalog = ChemicalCatalog::default();
        assert_eq!(catalog.resolve("unknown-xyz"), Resolution::Unknown);
        assert_eq!(catalog.resolve(""), Resolution::Unknown);
    }

    #[test]
    fn alias_table_order_breaks_ties() {
        let catalog = ChemicalCatalog {
            tanks: vec![
                TankSpec { code: "A".into(), description: String::new(), density: 1.0, capacity_kg: None },
                TankSpec { code: "B".into(), description: String::new(), density: 1.0, capacity_kg: None },
            ],
            aliases: vec![
                Alias { pattern: "acid".into(), code: "B".into() },
                Alias { pattern: "sulfuric acid".into(), code: "A".into() },
            ],
        };
        // the longer pattern also matches, but "acid" comes first
        assert_eq!(catalog.resolve("dilute sulfuric acid").tank().unwrap().code, "B");
    }

    #[test]
    fn volume_ignores_bad_density() {
        assert!((volume_litres(152.0, Some(1.52)) - 100.0).abs() < 1e-9);
        assert_eq!(volume_litres(100.0, Some(0.0)), 0.0);
        assert_eq!(volume_litres(100.0, None), 0.0);
        assert_eq!(volume_litres(100.0, Some(f64::NAN)), 0.0);
    }

    #[test]
    fn default_catalog_is_valid() {
        assert!(ChemicalCatalog::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_dangling_alias() {
        let mut catalog = ChemicalCatalog::default();
        catalog.aliases.push(Alias { pattern: "x".into(), code: "NOPE".into() });
        assert!(catalog.validate().is_err());
    }
}
