// Synthetic terrain for CLI runs.
//
// A square map of side `2 * radius + 1` with rock below a flat surface and
// the anchor at its centre. `--water-except DIR` floods the four levels of
// rock under the surface on every approach except `DIR`, leaving a dry 5×5
// pocket around the anchor so the planner has somewhere to start.

use delver_plan::terrain::{Liquid, LiquidKind};
use delver_plan::{Direction, TileCoord, VoxelTerrain};

/// Depth of the flooded band under the surface.
const FLOOD_LEVELS: i32 = 4;
/// Half-width of the dry pocket around the anchor.
const DRY_POCKET: i32 = 2;

pub fn build_terrain(radius: i32, depth: i32, surface: i32, water_except: Option<Direction>) -> VoxelTerrain {
    let side = 2 * radius + 1;
    let mut terrain = VoxelTerrain::with_surface(side, side, depth, surface);
    if let Some(keep) = water_except {
        flood_approaches(&mut terrain, radius, surface, keep);
    }
    terrain
}

pub fn anchor(radius: i32, surface: i32) -> TileCoord {
    TileCoord::new(radius, radius, surface)
}

/// The compass direction a horizontal offset mostly points in. Diagonals
/// resolve to north/south.
fn approach(dx: i32, dy: i32) -> Direction {
    if dx.abs() > dy.abs() {
        if dx > 0 { Direction::East } else { Direction::West }
    } else if dy < 0 {
        Direction::North
    } else {
        Direction::South
    }
}

fn flood_approaches(terrain: &mut VoxelTerrain, radius: i32, surface: i32, keep: Direction) {
    let water = Liquid {
        level: 7,
        kind: LiquidKind::Water,
    };
    let side = 2 * radius + 1;
    for z in (surface - FLOOD_LEVELS).max(0)..surface {
        for y in 0..side {
            for x in 0..side {
                let (dx, dy) = (x - radius, y - radius);
                if dx.abs().max(dy.abs()) <= DRY_POCKET || approach(dx, dy) == keep {
                    continue;
                }
                terrain.set_liquid(TileCoord::new(x, y, z), Some(water));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_plan::TerrainQuery;

    #[test]
    fn approach_splits_on_dominant_axis() {
        assert_eq!(approach(5, 1), Direction::East);
        assert_eq!(approach(-5, 4), Direction::West);
        assert_eq!(approach(3, -3), Direction::North);
        assert_eq!(approach(0, 7), Direction::South);
    }

    #[test]
    fn flooding_spares_the_kept_side_and_pocket() {
        let terrain = build_terrain(10, 20, 15, Some(Direction::East));
        let a = anchor(10, 15);
        assert!(terrain.tile_liquid(a.offset(0, 0, -1)).is_none());
        assert!(terrain.tile_liquid(a.offset(8, 0, -2)).is_none());
        assert!(terrain.tile_liquid(a.offset(-8, 0, -2)).is_some());
        assert!(terrain.tile_liquid(a.offset(0, -8, -4)).is_some());
        assert!(terrain.tile_liquid(a.offset(0, -8, -5)).is_none());
        assert!(terrain.tile_liquid(a.offset(0, -8, 0)).is_none());
    }
}
