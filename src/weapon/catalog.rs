//! Static weapon and projectile profiles. Each projectile names the folder its
//! range tables live in.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectileProfile {
    pub name: &'static str,
    pub table_folder: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeaponProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub kind: &'static str,
    pub projectiles: &'static [ProjectileProfile],
}

pub static DEFAULT_WEAPON_CATALOG: &[WeaponProfile] = &[
    WeaponProfile {
        key: "mortar_82",
        name: "82mm mortar",
        kind: "Mortar",
        projectiles: &[
            ProjectileProfile {
                name: "HE-832",
                table_folder: "tables",
            },
            ProjectileProfile {
                name: "Smoke",
                table_folder: "tables",
            },
        ],
    },
    WeaponProfile {
        key: "howitzer_122",
        name: "122mm howitzer",
        kind: "Gun",
        projectiles: &[
            ProjectileProfile {
                name: "HE-462",
                table_folder: "tables",
            },
            ProjectileProfile {
                name: "Rocket-assisted",
                table_folder: "tables",
            },
        ],
    },
    WeaponProfile {
        key: "grenade_launcher",
        name: "Automatic grenade launcher",
        kind: "Grenade launcher",
        projectiles: &[ProjectileProfile {
            name: "VOG",
            table_folder: "tables",
        }],
    },
];

/// Look up a profile by key (case-insensitive).
pub fn find_profile(key: &str) -> Option<&'static WeaponProfile> {
    let key = key.trim();
    DEFAULT_WEAPON_CATALOG
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_has_projectiles() {
        for p in DEFAULT_WEAPON_CATALOG {
            assert!(!p.projectiles.is_empty(), "{} has no projectiles", p.key);
        }
    }

    #[test]
    fn find_profile_ignores_case() {
        assert_eq!(find_profile(" Mortar_82 ").map(|p| p.kind), Some("Mortar"));
        assert!(find_profile("trebuchet").is_none());
    }
}
