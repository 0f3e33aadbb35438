use crate::error::Result;
use crate::model::Rect;
use crate::sprite_atlas::SpriteAtlas;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::Path;

/// Outcome of one packer allocation, keyed by the caller's name for the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub key: String,
    pub rect: Option<Rect>,
}

/// Serialize placements as a JSON array.
///
/// Failed allocations are written as `{"x": -1, "y": -1}` so consumers that only check for
/// negative coordinates keep working.
pub fn to_json_placements(placements: &[Placement]) -> Value {
    let items: Vec<Value> = placements
        .iter()
        .map(|p| match p.rect {
            Some(r) => json!({"key": p.key, "x": r.x, "y": r.y, "w": r.w, "h": r.h}),
            None => json!({"key": p.key, "x": -1, "y": -1}),
        })
        .collect();
    Value::Array(items)
}

/// Sprite index in the usual map-style format:
/// `{ "<id>": { "x", "y", "width", "height", "pixelRatio" } }` with pixel coordinates of the
/// image interior.
pub fn to_sprite_json(atlas: &SpriteAtlas) -> Value {
    let mut out = Map::new();
    let pad = atlas.config().padding;
    for id in atlas.ids() {
        let (Some(slot), Some(pos)) = (atlas.slot(id), atlas.get_position(id)) else {
            continue;
        };
        let w = slot.w - 2 * pad;
        let h = slot.h - 2 * pad;
        out.insert(
            id.to_string(),
            json!({
                "x": slot.x + pad,
                "y": slot.y + pad,
                "width": w,
                "height": h,
                "pixelRatio": w as f32 / pos.size[0],
            }),
        );
    }
    Value::Object(out)
}

/// Pretty-print `value` to `path`.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
