//! Clamp collision lint
//!
//! The renderer uploads an image once, with the wrap mode of the first
//! stage that loads it. An image used by both a `map` and a `clampMap`
//! stage therefore renders wrong in one of the two shaders.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MAP_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+map\s+(.*\.jpg|.*\.tga|.*\.jpeg)").expect("map directive pattern is valid")
});

static CLAMP_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"clampmap\s+(.*\.jpg|.*\.tga|.*\.jpeg)").expect("clampmap directive pattern is valid")
});

/// An image loaded with both wrap modes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClampCollision {
    /// Lowercased image path
    pub texture: String,
    /// Script using it with `map`
    pub map_script: String,
    /// Script using it with `clampMap`
    pub clamp_script: String,
}

fn captures(pattern: &Regex, text: &str, script: &str, into: &mut BTreeSet<(String, String)>) {
    for caps in pattern.captures_iter(text) {
        if let Some(texture) = caps.get(1) {
            into.insert((texture.as_str().to_string(), script.to_string()));
        }
    }
}

/// Find images used by both `map` and `clampMap` stages.
///
/// `scripts` yields `(script name, script text)` pairs. Matching is done on
/// the lowercased text. Every (map usage, clamp usage) pair of the same
/// image is reported, so an image used in several scripts yields several
/// collisions.
pub fn find_clamp_collisions<I, N, S>(scripts: I) -> Vec<ClampCollision>
where
    I: IntoIterator<Item = (N, S)>,
    N: AsRef<str>,
    S: AsRef<str>,
{
    let mut mapped = BTreeSet::new();
    let mut clamped = BTreeSet::new();

    for (name, source) in scripts {
        let text = source.as_ref().to_lowercase();
        captures(&MAP_DIRECTIVE, &text, name.as_ref(), &mut mapped);
        captures(&CLAMP_DIRECTIVE, &text, name.as_ref(), &mut clamped);
    }

    let mut collisions = Vec::new();
    for (texture, map_script) in &mapped {
        for (clamp_texture, clamp_script) in &clamped {
            if texture == clamp_texture {
                collisions.push(ClampCollision {
                    texture: texture.clone(),
                    map_script: map_script.clone(),
                    clamp_script: clamp_script.clone(),
                });
            }
        }
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_collision_across_scripts() {
        let base = "textures/a\n{\n\t{\n\t\tmap textures/Shared/glow.TGA\n\t}\n}\n";
        let sfx = "textures/b\n{\n\t{\n\t\tclampMap textures/shared/glow.tga\n\t}\n}\n";

        let collisions = find_clamp_collisions([("base.shader", base), ("sfx.shader", sfx)]);
        assert_eq!(
            collisions,
            vec![ClampCollision {
                texture: "textures/shared/glow.tga".into(),
                map_script: "base.shader".into(),
                clamp_script: "sfx.shader".into(),
            }]
        );
    }

    #[test]
    fn test_clampmap_alone_is_not_a_map_usage() {
        let only_clamp = "x\n{\n{\nclampmap textures/c.jpg\n}\n}\n";
        assert!(find_clamp_collisions([("a.shader", only_clamp)]).is_empty());
    }

    #[test]
    fn test_distinct_images_do_not_collide() {
        let source = "x\n{\n{\n map textures/one.jpg\n}\n{\nclampmap textures/two.jpg\n}\n}\n";
        assert!(find_clamp_collisions([("a.shader", source)]).is_empty());
    }
}
