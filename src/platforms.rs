//! Catalog platform folder names, their ROM extensions and folder aliases.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct PlatformInfo {
    /// Folder name as used by the catalog.
    pub name: &'static str,
    /// Lowercase, without the leading dot.
    pub extensions: &'static [&'static str],
    /// Lowercase folder names that also mean this platform.
    pub aliases: &'static [&'static str],
}

const PLATFORMS: &[PlatformInfo] = &[
    PlatformInfo {
        name: "Nintendo - Nintendo Entertainment System",
        extensions: &["nes", "unf", "unif"],
        aliases: &["nes", "famicom", "fc"],
    },
    PlatformInfo {
        name: "Nintendo - Family Computer Disk System",
        extensions: &["fds"],
        aliases: &["fds", "famicom disk system"],
    },
    PlatformInfo {
        name: "Nintendo - Super Nintendo Entertainment System",
        extensions: &["sfc", "smc", "swc", "fig"],
        aliases: &["snes", "super nintendo", "super famicom", "sfc"],
    },
    PlatformInfo {
        name: "Nintendo - Game Boy",
        extensions: &["gb"],
        aliases: &["gb", "gameboy", "game boy"],
    },
    PlatformInfo {
        name: "Nintendo - Game Boy Color",
        extensions: &["gbc"],
        aliases: &["gbc", "gameboy color", "game boy color"],
    },
    PlatformInfo {
        name: "Nintendo - Game Boy Advance",
        extensions: &["gba"],
        aliases: &["gba", "gameboy advance", "game boy advance"],
    },
    PlatformInfo {
        name: "Nintendo - Virtual Boy",
        extensions: &["vb", "vboy"],
        aliases: &["vb", "virtualboy", "virtual boy"],
    },
    PlatformInfo {
        name: "Nintendo - Nintendo 64",
        extensions: &["z64", "n64", "v64"],
        aliases: &["n64", "nintendo 64"],
    },
    PlatformInfo {
        name: "Nintendo - Nintendo DS",
        extensions: &["nds"],
        aliases: &["nds", "ds"],
    },
    PlatformInfo {
        name: "Nintendo - Pokemon Mini",
        extensions: &["min"],
        aliases: &["pokemini", "pokemon mini"],
    },
    PlatformInfo {
        name: "Sega - SG-1000",
        extensions: &["sg"],
        aliases: &["sg1000", "sg-1000"],
    },
    PlatformInfo {
        name: "Sega - Master System - Mark III",
        extensions: &["sms"],
        aliases: &["sms", "mastersystem", "master system"],
    },
    PlatformInfo {
        name: "Sega - Game Gear",
        extensions: &["gg"],
        aliases: &["gg", "gamegear", "game gear"],
    },
    PlatformInfo {
        name: "Sega - Mega Drive - Genesis",
        extensions: &["md", "gen", "smd"],
        aliases: &["md", "genesis", "megadrive", "mega drive"],
    },
    PlatformInfo {
        name: "Sega - 32X",
        extensions: &["32x"],
        aliases: &["32x", "sega32x"],
    },
    PlatformInfo {
        name: "Sega - Mega-CD - Sega CD",
        extensions: &["cue", "chd", "iso"],
        aliases: &["segacd", "sega cd", "megacd", "mega-cd"],
    },
    PlatformInfo {
        name: "Sega - Saturn",
        extensions: &["cue", "chd", "iso"],
        aliases: &["saturn"],
    },
    PlatformInfo {
        name: "Sega - Dreamcast",
        extensions: &["cdi", "gdi", "chd"],
        aliases: &["dreamcast", "dc"],
    },
    PlatformInfo {
        name: "Sony - PlayStation",
        extensions: &["cue", "chd", "pbp", "m3u"],
        aliases: &["psx", "ps1", "playstation"],
    },
    PlatformInfo {
        name: "Sony - PlayStation Portable",
        extensions: &["iso", "cso", "pbp"],
        aliases: &["psp"],
    },
    PlatformInfo {
        name: "SNK - Neo Geo Pocket",
        extensions: &["ngp"],
        aliases: &["ngp", "neo geo pocket"],
    },
    PlatformInfo {
        name: "SNK - Neo Geo Pocket Color",
        extensions: &["ngc", "npc"],
        aliases: &["ngpc", "neo geo pocket color"],
    },
    PlatformInfo {
        name: "NEC - PC Engine - TurboGrafx 16",
        extensions: &["pce"],
        aliases: &["pce", "pcengine", "pc engine", "tg16", "turbografx16"],
    },
    PlatformInfo {
        name: "NEC - PC Engine SuperGrafx",
        extensions: &["sgx"],
        aliases: &["sgx", "supergrafx"],
    },
    PlatformInfo {
        name: "Atari - 2600",
        extensions: &["a26"],
        aliases: &["atari2600", "a2600", "2600"],
    },
    PlatformInfo {
        name: "Atari - 5200",
        extensions: &["a52"],
        aliases: &["atari5200", "a5200", "5200"],
    },
    PlatformInfo {
        name: "Atari - 7800",
        extensions: &["a78"],
        aliases: &["atari7800", "a7800", "7800"],
    },
    PlatformInfo {
        name: "Atari - Lynx",
        extensions: &["lnx"],
        aliases: &["lynx", "atarilynx"],
    },
    PlatformInfo {
        name: "GCE - Vectrex",
        extensions: &["vec"],
        aliases: &["vectrex"],
    },
    PlatformInfo {
        name: "Commodore - 64",
        extensions: &["d64", "t64", "prg"],
        aliases: &["c64", "commodore 64"],
    },
    PlatformInfo {
        name: "Commodore - Amiga",
        extensions: &["adf", "ipf"],
        aliases: &["amiga"],
    },
];

struct PlatformTables {
    by_folder: HashMap<String, &'static PlatformInfo>,
    by_extension: HashMap<&'static str, Vec<&'static str>>,
}

static PLATFORM_TABLES: OnceLock<PlatformTables> = OnceLock::new();

fn platform_tables() -> &'static PlatformTables {
    PLATFORM_TABLES.get_or_init(|| {
        let mut by_folder = HashMap::new();
        let mut by_extension: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for info in PLATFORMS {
            by_folder.insert(info.name.to_ascii_lowercase(), info);
            for alias in info.aliases {
                by_folder.entry(alias.to_string()).or_insert(info);
            }
            for extension in info.extensions {
                by_extension.entry(*extension).or_default().push(info.name);
            }
        }
        PlatformTables {
            by_folder,
            by_extension,
        }
    })
}

#[cfg(test)]
fn all_platforms() -> &'static [PlatformInfo] {
    PLATFORMS
}

/// Matches a folder name against catalog names first, then aliases. Case-insensitive.
pub fn resolve_platform(folder_name: &str) -> Option<&'static str> {
    let key = folder_name.trim().to_ascii_lowercase();
    if key.is_empty() {
        return None;
    }
    platform_tables().by_folder.get(&key).map(|info| info.name)
}

/// The only platform using `extension`, or `None` when it is unknown or shared.
pub fn platform_for_extension(extension: &str) -> Option<&'static str> {
    let key = extension.trim_start_matches('.').to_ascii_lowercase();
    match platform_tables().by_extension.get(key.as_str())?.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

pub fn extensions_for(platform: &str) -> &'static [&'static str] {
    PLATFORMS
        .iter()
        .find(|info| info.name == platform)
        .map(|info| info.extensions)
        .unwrap_or(&[])
}
